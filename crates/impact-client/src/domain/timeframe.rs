//! Calculation timeframe parameter.
//!
//! The service expects `timeframe=YYYY-MM-DD/YYYY-MM-DD`, a half-open range.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::value::ParamValue;
use crate::error::TimeframeError;

/// A half-open date range `[from, to)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timeframe {
    from: NaiveDate,
    to: NaiveDate,
}

impl Timeframe {
    /// Create a timeframe, rejecting empty or inverted ranges
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, TimeframeError> {
        if from >= to {
            return Err(TimeframeError::Inverted {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(Self { from, to })
    }

    /// The calendar year `year`
    pub fn year(year: i32) -> Result<Self, TimeframeError> {
        let from = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(TimeframeError::YearOutOfRange(year))?;
        let to = NaiveDate::from_ymd_opt(year + 1, 1, 1).ok_or(TimeframeError::YearOutOfRange(year))?;
        Self::new(from, to)
    }

    /// The year containing `date`
    pub fn containing(date: NaiveDate) -> Result<Self, TimeframeError> {
        Self::year(date.year())
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    /// Number of days covered
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.from.format("%Y-%m-%d"), self.to.format("%Y-%m-%d"))
    }
}

impl From<Timeframe> for ParamValue {
    fn from(tf: Timeframe) -> Self {
        ParamValue::Text(tf.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year() {
        let tf = Timeframe::year(2009).unwrap();
        assert_eq!(tf.to_string(), "2009-01-01/2010-01-01");
        assert_eq!(tf.days(), 365);
        assert_eq!(ParamValue::from(tf), ParamValue::from("2009-01-01/2010-01-01"));
    }

    #[test]
    fn test_leap_year_days() {
        assert_eq!(Timeframe::year(2008).unwrap().days(), 366);
    }

    #[test]
    fn test_inverted_rejected() {
        let a = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2009, 1, 1).unwrap();
        assert!(matches!(Timeframe::new(a, b), Err(TimeframeError::Inverted { .. })));
        assert!(Timeframe::new(a, a).is_err());
    }

    #[test]
    fn test_containing() {
        let d = NaiveDate::from_ymd_opt(2011, 9, 29).unwrap();
        assert_eq!(Timeframe::containing(d).unwrap(), Timeframe::year(2011).unwrap());
    }
}
