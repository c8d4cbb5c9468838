use super::store::{AttendanceStore, CheckOutWrite, LeaveWrite, StoreError, StoreResult};
use crate::{
    db::is_duplicate_key,
    model::attendance::{AttendanceDay, AttendanceDayRow, AttendanceStatus},
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::MySqlPool;
use tracing::debug;

pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn get(&self, user_id: u64, date: NaiveDate) -> StoreResult<Option<AttendanceDay>> {
        let row = sqlx::query_as::<_, AttendanceDayRow>(
            r#"
            SELECT attendance_id, user_id, date, check_in_time, check_out_time,
                   work_hours, overtime_hours, status, shift_id
            FROM attendance_records
            WHERE user_id = ? AND date = ?
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let status = row.status.clone();
            AttendanceDay::try_from(row).map_err(|_| StoreError::InvalidStatus(status))
        })
        .transpose()
    }

    async fn insert_check_in(
        &self,
        user_id: u64,
        date: NaiveDate,
        at: NaiveDateTime,
        shift_id: u64,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_records (user_id, date, check_in_time, status, shift_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(at)
        .bind(AttendanceStatus::Present.as_ref())
        .bind(shift_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            // UNIQUE(user_id, date): someone else created the row first
            Err(e) if is_duplicate_key(&e) => {
                debug!(user_id, %date, "Check-in insert lost to an existing row");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn fill_check_in(
        &self,
        user_id: u64,
        date: NaiveDate,
        at: NaiveDateTime,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE attendance_records
            SET check_in_time = ?, status = ?
            WHERE user_id = ?
            AND date = ?
            AND check_in_time IS NULL
            "#,
        )
        .bind(at)
        .bind(AttendanceStatus::Present.as_ref())
        .bind(user_id)
        .bind(date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn complete_check_out(
        &self,
        user_id: u64,
        date: NaiveDate,
        write: &CheckOutWrite,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE attendance_records
            SET check_out_time = ?, work_hours = ?, overtime_hours = ?, status = ?
            WHERE user_id = ?
            AND date = ?
            AND check_in_time = ?
            AND check_out_time IS NULL
            "#,
        )
        .bind(write.check_out)
        .bind(write.work_hours)
        .bind(write.overtime_hours)
        .bind(write.status.as_ref())
        .bind(user_id)
        .bind(date)
        .bind(write.expected_check_in)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_leave(&self, leave: &LeaveWrite) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        for date in &leave.dates {
            sqlx::query(
                r#"
                INSERT INTO attendance_records (user_id, date, status, leave_type, remarks)
                VALUES (?, ?, ?, ?, ?)
                ON DUPLICATE KEY UPDATE
                    status = VALUES(status),
                    leave_type = VALUES(leave_type),
                    remarks = VALUES(remarks)
                "#,
            )
            .bind(leave.user_id)
            .bind(date)
            .bind(AttendanceStatus::OnLeave.as_ref())
            .bind(leave.leave_type.as_ref())
            .bind(leave.remarks.as_deref())
            .execute(&mut *tx)
            .await?;
        }

        // dropping an uncommitted transaction rolls it back
        tx.commit().await?;
        Ok(())
    }
}
