pub mod attendance;
pub mod dashboard;
pub mod shifts;
pub mod users;
