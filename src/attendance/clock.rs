use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SubsecRound};
use mockable::Clock;

/// One reading of the clock, split into the attendance day and the stored time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalStamp {
    pub date: NaiveDate,
    /// Whole-second precision, as stored in `DATETIME` columns.
    pub at: NaiveDateTime,
}

impl LocalStamp {
    pub fn from_instant(now: DateTime<FixedOffset>) -> Self {
        let at = now.naive_local().trunc_subsecs(0);
        Self { date: at.date(), at }
    }
}

/// Reads UTC from the injected clock and reports it in the configured offset.
#[derive(Clone)]
pub struct OfficeClock {
    clock: Arc<dyn Clock + Send + Sync>,
    offset: FixedOffset,
}

impl OfficeClock {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>, offset: FixedOffset) -> Self {
        Self { clock, offset }
    }

    pub fn system(offset: FixedOffset) -> Self {
        Self::new(Arc::new(mockable::DefaultClock), offset)
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.utc().with_timezone(&self.offset)
    }

    pub fn stamp(&self) -> LocalStamp {
        LocalStamp::from_instant(self.now())
    }

    pub fn today(&self) -> NaiveDate {
        self.stamp().date
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mockable::MockClock;

    fn ict() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    #[test]
    fn local_day_follows_configured_offset() {
        // 2026-03-01 20:30 UTC is already 2026-03-02 03:30 in UTC+7.
        let mut mock = MockClock::new();
        mock.expect_utc()
            .returning(|| Utc.with_ymd_and_hms(2026, 3, 1, 20, 30, 0).unwrap());
        let clock = OfficeClock::new(Arc::new(mock), ict());

        let stamp = clock.stamp();
        assert_eq!(stamp.date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(
            stamp.at,
            NaiveDate::from_ymd_opt(2026, 3, 2)
                .unwrap()
                .and_hms_opt(3, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn stamp_reads_the_clock_once_across_midnight() {
        // 16:59:59.9 UTC is 23:59:59.9 local; the next read is already tomorrow.
        let before = Utc.with_ymd_and_hms(2026, 3, 2, 16, 59, 59).unwrap()
            + chrono::Duration::milliseconds(900);
        let after = Utc.with_ymd_and_hms(2026, 3, 2, 17, 0, 0).unwrap();
        let mut reads = 0;
        let mut mock = MockClock::new();
        mock.expect_utc().returning(move || {
            reads += 1;
            if reads == 1 { before } else { after }
        });
        let clock = OfficeClock::new(Arc::new(mock), ict());

        let stamp = clock.stamp();
        assert_eq!(stamp.date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(stamp.at.date(), stamp.date);
        assert_eq!(stamp.at.time(), chrono::NaiveTime::from_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn system_clock_reports_in_its_offset() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let clock = OfficeClock::system(offset);
        assert_eq!(clock.now().offset().local_minus_utc(), -5 * 3600);
    }
}
