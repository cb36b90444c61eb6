//! Working-day calendar: weekends and a holiday set are non-working.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Tolerance applied before rounding so `1.0000000001` still counts as one day.
const DAY_EPSILON: f64 = 1e-9;

/// How a fractional duration becomes a whole number of working days.
///
/// Stepping only moves whole days, so the fractional remainder of a duration
/// is resolved here before the landing date is computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationRounding {
    /// Any started day occupies the whole day (0.5 -> 1).
    #[default]
    Up,
    /// Drop the remainder (1.5 -> 1, 0.5 -> 0).
    Down,
    /// Half rounds away from zero (0.5 -> 1, 1.4 -> 1).
    Nearest,
}

impl DurationRounding {
    /// Whole working days for a duration. Negative and non-finite values are 0.
    pub fn whole_days(self, days: f64) -> u64 {
        if !days.is_finite() || days <= 0.0 {
            return 0;
        }
        let rounded = match self {
            DurationRounding::Up => (days - DAY_EPSILON).ceil(),
            DurationRounding::Down => (days + DAY_EPSILON).floor(),
            DurationRounding::Nearest => days.round(),
        };
        rounded.max(0.0) as u64
    }
}

/// A reference date plus an immutable holiday set.
#[derive(Clone, Debug)]
pub struct WorkingCalendar {
    reference_date: NaiveDate,
    holidays: FxHashSet<NaiveDate>,
    rounding: DurationRounding,
}

impl WorkingCalendar {
    pub fn new(reference_date: NaiveDate, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            reference_date,
            holidays: holidays.into_iter().collect(),
            rounding: DurationRounding::default(),
        }
    }

    /// Replace the fractional-duration policy.
    pub fn with_rounding(mut self, rounding: DurationRounding) -> Self {
        self.rounding = rounding;
        self
    }

    /// Scheduling start date.
    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    pub fn rounding(&self) -> DurationRounding {
        self.rounding
    }

    /// False on Saturday, Sunday and any listed holiday.
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// Advance `days` working days past `start`.
    ///
    /// The start day itself is never counted, even when it is a working day.
    pub fn add_working_days(&self, start: NaiveDate, days: f64) -> NaiveDate {
        self.step(start, self.rounding.whole_days(days), true)
    }

    /// Step back `days` working days before `end`. Mirror of [`Self::add_working_days`].
    pub fn subtract_working_days(&self, end: NaiveDate, days: f64) -> NaiveDate {
        self.step(end, self.rounding.whole_days(days), false)
    }

    /// Signed working-day distance from `from` to `to`.
    ///
    /// Counts working days in `(from, to]` when `to` is later, and the negated
    /// count of working days in `(to, from]` when it is earlier.
    pub fn working_days_between(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        let (lo, hi, sign) = if to >= from {
            (from, to, 1)
        } else {
            (to, from, -1)
        };
        let mut count = 0i64;
        let mut current = lo;
        while current < hi {
            match current.checked_add_days(Days::new(1)) {
                Some(next) => current = next,
                None => break,
            }
            if self.is_working_day(current) {
                count += 1;
            }
        }
        sign * count
    }

    fn step(&self, from: NaiveDate, count: u64, forward: bool) -> NaiveDate {
        let mut current = from;
        let mut counted = 0u64;
        while counted < count {
            let next = if forward {
                current.checked_add_days(Days::new(1))
            } else {
                current.checked_sub_days(Days::new(1))
            };
            // Calendar bounds reached; the calendar never fails.
            let Some(next) = next else {
                return current;
            };
            current = next;
            if self.is_working_day(current) {
                counted += 1;
            }
        }
        current
    }
}
