//! In-process [`AttendanceStore`] used by unit and handler tests.

use super::store::{AttendanceStore, CheckOutWrite, LeaveWrite, StoreResult};
use crate::model::attendance::{AttendanceDay, AttendanceStatus};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

#[derive(Default)]
pub struct MemoryAttendanceStore {
    rows: Mutex<HashMap<(u64, NaiveDate), AttendanceDay>>,
    next_id: AtomicU64,
}

impl MemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row as an admin would, bypassing check-in rules.
    pub fn put(&self, day: AttendanceDay) {
        self.rows
            .lock()
            .unwrap()
            .insert((day.user_id, day.date), day);
    }

    pub fn row(&self, user_id: u64, date: NaiveDate) -> Option<AttendanceDay> {
        self.rows.lock().unwrap().get(&(user_id, date)).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

pub fn empty_day(user_id: u64, date: NaiveDate) -> AttendanceDay {
    AttendanceDay {
        id: 0,
        user_id,
        date,
        check_in: None,
        check_out: None,
        work_hours: None,
        overtime_hours: None,
        status: AttendanceStatus::Absent,
        shift_id: None,
    }
}

#[async_trait]
impl AttendanceStore for MemoryAttendanceStore {
    async fn get(&self, user_id: u64, date: NaiveDate) -> StoreResult<Option<AttendanceDay>> {
        Ok(self.row(user_id, date))
    }

    async fn insert_check_in(
        &self,
        user_id: u64,
        date: NaiveDate,
        at: NaiveDateTime,
        shift_id: u64,
    ) -> StoreResult<bool> {
        let id = self.next_id();
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&(user_id, date)) {
            return Ok(false);
        }
        rows.insert(
            (user_id, date),
            AttendanceDay {
                id,
                check_in: Some(at),
                status: AttendanceStatus::Present,
                shift_id: Some(shift_id),
                ..empty_day(user_id, date)
            },
        );
        Ok(true)
    }

    async fn fill_check_in(
        &self,
        user_id: u64,
        date: NaiveDate,
        at: NaiveDateTime,
    ) -> StoreResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&(user_id, date)) {
            Some(day) if day.check_in.is_none() => {
                day.check_in = Some(at);
                day.status = AttendanceStatus::Present;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete_check_out(
        &self,
        user_id: u64,
        date: NaiveDate,
        write: &CheckOutWrite,
    ) -> StoreResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&(user_id, date)) {
            Some(day)
                if day.check_in == Some(write.expected_check_in) && day.check_out.is_none() =>
            {
                day.check_out = Some(write.check_out);
                day.work_hours = Some(write.work_hours);
                day.overtime_hours = Some(write.overtime_hours);
                day.status = write.status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_leave(&self, leave: &LeaveWrite) -> StoreResult<()> {
        let ids: Vec<u64> = leave.dates.iter().map(|_| self.next_id()).collect();
        let mut rows = self.rows.lock().unwrap();
        for (date, id) in leave.dates.iter().zip(ids) {
            rows.entry((leave.user_id, *date))
                .or_insert_with(|| AttendanceDay {
                    id,
                    ..empty_day(leave.user_id, *date)
                })
                .status = AttendanceStatus::OnLeave;
        }
        Ok(())
    }
}
