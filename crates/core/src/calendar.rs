//! Period calendar: date range + frequency -> ordered period boundaries.
//!
//! Pure functions with no state. Calendar periods (months, quarters) are
//! aligned to the calendar; week-based periods are anchored at the
//! template's start date so that a later generation request with a
//! different window never phase-shifts an existing rotation.

use std::fmt;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::template::{Frequency, ObligationTemplate};

// ---------------------------------------------------------------------------
// Period key
// ---------------------------------------------------------------------------

/// Canonical identifier of a scheduling period.
///
/// - monthly: `2024-03`
/// - quarterly: `2024-Q1`
/// - weekly / biweekly: ISO week of the block start, `2024-W10`
///
/// Keys of the same cadence sort chronologically as plain strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodKey(String);

impl PeriodKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeriodKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// One scheduling period with inclusive boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub key: PeriodKey,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// ---------------------------------------------------------------------------
// Cadence
// ---------------------------------------------------------------------------

/// A frequency, its multiplier, and the date its phase is counted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub frequency: Frequency,
    pub interval: u32,
    pub anchor: NaiveDate,
}

impl Cadence {
    pub fn new(frequency: Frequency, interval: u32, anchor: NaiveDate) -> Result<Self, CoreError> {
        if interval == 0 {
            return Err(CoreError::InvalidConstraint(
                "interval must be a positive integer".to_string(),
            ));
        }
        Ok(Self {
            frequency,
            interval,
            anchor,
        })
    }

    /// The cadence a template generates on.
    pub fn of(template: &ObligationTemplate) -> Result<Self, CoreError> {
        Self::new(template.frequency, template.interval, template.start_date)
    }

    /// All periods overlapping `[start, end]`, in chronological order.
    pub fn periods(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Period>, CoreError> {
        if start > end {
            return Err(CoreError::InvalidRange { start, end });
        }
        match self.frequency {
            Frequency::Weekly | Frequency::Biweekly => self.week_periods(start, end),
            Frequency::Monthly => self.month_periods(start, end, 1, month_key),
            Frequency::Quarterly => self.month_periods(start, end, 3, quarter_key),
        }
    }

    /// The period immediately before `period` in this cadence, or `None` if
    /// it would end before the anchor.
    pub fn preceding(&self, period: &Period) -> Result<Option<Period>, CoreError> {
        let Some(day_before) = period.start.pred_opt() else {
            return Ok(None);
        };
        if day_before < self.anchor {
            return Ok(None);
        }
        Ok(self.periods(day_before, day_before)?.into_iter().next())
    }

    /// Length of one week-based block in days.
    fn block_days(&self) -> u64 {
        let base = match self.frequency {
            Frequency::Biweekly => 14,
            _ => 7,
        };
        base * u64::from(self.interval)
    }

    fn week_periods(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Period>, CoreError> {
        if end < self.anchor {
            return Ok(Vec::new());
        }
        let block = self.block_days();
        let first_block = if start <= self.anchor {
            0
        } else {
            (start - self.anchor).num_days() as u64 / block
        };

        let mut periods = Vec::new();
        let mut block_start = add_days(self.anchor, first_block * block)?;
        while block_start <= end {
            let next = add_days(block_start, block)?;
            let block_end = next.pred_opt().ok_or_else(out_of_range)?;
            periods.push(Period {
                key: week_key(block_start),
                start: block_start,
                end: block_end,
            });
            block_start = next;
        }
        Ok(periods)
    }

    /// Month-aligned periods. `unit` is the number of calendar months per
    /// base step (1 for months, 3 for quarters).
    fn month_periods(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        unit: i32,
        key_fn: fn(NaiveDate) -> PeriodKey,
    ) -> Result<Vec<Period>, CoreError> {
        let step = unit * self.interval as i32;
        let anchor_idx = unit_index(self.anchor, unit);
        let start_idx = unit_index(start, unit);
        let end_idx = unit_index(end, unit);

        // Back up to the beginning of the period that contains `start`.
        let offset = (start_idx - anchor_idx).rem_euclid(self.interval as i32);
        let mut idx = start_idx - offset;

        let mut periods = Vec::new();
        while idx <= end_idx {
            let first_month = idx * unit;
            let period_start = first_of_month(first_month)?;
            let period_end = first_of_month(first_month + step)?
                .pred_opt()
                .ok_or_else(out_of_range)?;
            periods.push(Period {
                key: key_fn(period_start),
                start: period_start,
                end: period_end,
            });
            idx += self.interval as i32;
        }
        Ok(periods)
    }
}

/// Convert `[start, end]` + frequency into ordered periods whose phase is
/// counted from `anchor` (the template's start date).
pub fn periods(
    start: NaiveDate,
    end: NaiveDate,
    frequency: Frequency,
    interval: u32,
    anchor: NaiveDate,
) -> Result<Vec<Period>, CoreError> {
    Cadence::new(frequency, interval, anchor)?.periods(start, end)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn out_of_range() -> CoreError {
    CoreError::Internal("date arithmetic out of supported range".to_string())
}

fn add_days(date: NaiveDate, days: u64) -> Result<NaiveDate, CoreError> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(out_of_range)
}

/// Months (unit=1) or quarters (unit=3) since year 0.
fn unit_index(date: NaiveDate, unit: i32) -> i32 {
    (date.year() * 12 + date.month0() as i32) / unit
}

/// First day of the month `months` months after January of year 0.
fn first_of_month(months: i32) -> Result<NaiveDate, CoreError> {
    let year = months.div_euclid(12);
    let month = months.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(out_of_range)
}

fn month_key(date: NaiveDate) -> PeriodKey {
    PeriodKey(format!("{:04}-{:02}", date.year(), date.month()))
}

fn quarter_key(date: NaiveDate) -> PeriodKey {
    PeriodKey(format!("{:04}-Q{}", date.year(), date.month0() / 3 + 1))
}

fn week_key(date: NaiveDate) -> PeriodKey {
    let week = date.iso_week();
    PeriodKey(format!("{:04}-W{:02}", week.year(), week.week()))
}
