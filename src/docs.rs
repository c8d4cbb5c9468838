use crate::api::attendance::{
    AttendanceListResponse, CheckInRequest, CheckOutRequest, CreateAttendanceRequest,
    MarkLeaveRequest,
};
use crate::api::dashboard::DashboardResponse;
use crate::api::users::{CreateUserRequest, UserListResponse};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::leave::LeaveType;
use crate::model::role::Role;
use crate::model::shift::Shift;
use crate::model::user::User;
use crate::models::{LoginReqDto, RegisterReqDto};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Tracker API",
        version = "1.0.0",
        description = r#"
## Attendance Tracker

Daily check-in and check-out for employees, with derived work hours,
overtime and day status.

### Key Features
- **Attendance**
  - Check in and out for today, mark leave ranges, browse and correct records
- **Users**
  - Self-registration, admin-managed accounts
- **Dashboard**
  - Today's present and absent counts and the attendance rate

### Day status
A day with exactly 4 work hours reads as **Half-day**; fewer than 4 hours reads
as **Absent** unless the day is **On Leave**. Overtime is anything beyond 8 hours.

### Security
Endpoints under `/api` require a **JWT Bearer** token from `/auth/login`.
Employees only see and change their own attendance; admins manage everyone.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::mark_leave,
        crate::api::attendance::list_attendance,
        crate::api::attendance::get_attendance,
        crate::api::attendance::create_attendance,
        crate::api::attendance::update_attendance,
        crate::api::attendance::delete_attendance,

        crate::api::users::list_users,
        crate::api::users::get_user,
        crate::api::users::create_user,
        crate::api::users::update_user,
        crate::api::users::delete_user,

        crate::api::shifts::list_shifts,
        crate::api::dashboard::dashboard
    ),
    components(
        schemas(
            RegisterReqDto,
            LoginReqDto,
            CheckInRequest,
            CheckOutRequest,
            MarkLeaveRequest,
            CreateAttendanceRequest,
            AttendanceRecord,
            AttendanceListResponse,
            AttendanceStatus,
            LeaveType,
            Role,
            User,
            UserListResponse,
            CreateUserRequest,
            Shift,
            DashboardResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and login"),
        (name = "Attendance", description = "Check-in, check-out, leave and attendance records"),
        (name = "Users", description = "User management"),
        (name = "Shifts", description = "Work shifts"),
        (name = "Dashboard", description = "Daily attendance summary"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
