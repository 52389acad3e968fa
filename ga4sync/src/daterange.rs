//! Inclusive calendar date ranges.

use chrono::NaiveDate;

use crate::bail;
use crate::error::{ErrorKind, SyncResult};

/// An inclusive, day-stepped sequence of calendar dates.
///
/// Iteration is pure calendar arithmetic on [`NaiveDate`], so daylight saving
/// transitions can neither skip nor duplicate a day.
#[derive(Debug, Clone)]
pub struct DateRange {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

/// Builds the inclusive range of dates from `start` to `end`.
///
/// Returns an [`ErrorKind::InvalidData`] error when `end` precedes `start`;
/// an inverted range is a caller bug, not an empty window.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> SyncResult<DateRange> {
    if end < start {
        bail!(
            ErrorKind::InvalidData,
            "Invalid date range",
            format!("end date {end} precedes start date {start}")
        );
    }

    Ok(DateRange {
        next: Some(start),
        end,
    })
}

impl Iterator for DateRange {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;

        self.next = if current < self.end {
            current.succ_opt()
        } else {
            None
        };

        Some(current)
    }
}
