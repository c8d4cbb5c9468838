use sqlx::{MySqlPool, mysql::MySqlPoolOptions};
use tracing::info;

pub async fn init_db(database_url: &str, max_connections: u32) -> Result<MySqlPool, sqlx::Error> {
    let pool = MySqlPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied");

    Ok(pool)
}

/// Duplicate entry on a unique key (MySQL errno 1062).
///
/// SQLSTATE 23000 alone is not enough: MySQL also reports foreign-key failures with it.
pub fn is_duplicate_key(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Row references a user or shift that does not exist (MySQL errno 1452).
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}


#[cfg(test)]
mod tests {
    use super::test_support::{duplicate_key_error, foreign_key_error};
    use super::*;

    #[test]
    fn foreign_key_failures_are_not_duplicates() {
        assert!(is_duplicate_key(&duplicate_key_error()));
        assert!(!is_foreign_key_violation(&duplicate_key_error()));

        assert!(is_foreign_key_violation(&foreign_key_error()));
        assert!(!is_duplicate_key(&foreign_key_error()));

        assert!(!is_duplicate_key(&sqlx::Error::PoolTimedOut));
    }
}
