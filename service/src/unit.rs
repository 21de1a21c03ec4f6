use serde::{Deserialize, Serialize};
use std::fmt;

const MINUTE: f64 = 60.0;
const HOUR: f64 = 3_600.0;
const DAY: f64 = 86_400.0;
const WEEK: f64 = DAY * 7.0;
const MONTH: f64 = DAY * 30.0;
const YEAR: f64 = DAY * 365.0;

/// Granularity of the x axis. `Number` means the x column is not a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Number,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Unit {
    pub const ALL: [Unit; 8] = [
        Unit::Number,
        Unit::Second,
        Unit::Minute,
        Unit::Hour,
        Unit::Day,
        Unit::Week,
        Unit::Month,
        Unit::Year,
    ];

    pub fn seconds(self) -> f64 {
        match self {
            Unit::Number | Unit::Second => 1.0,
            Unit::Minute => MINUTE,
            Unit::Hour => HOUR,
            Unit::Day => DAY,
            Unit::Week => WEEK,
            Unit::Month => MONTH,
            Unit::Year => YEAR,
        }
    }

    /// Largest unit not exceeding `seconds`.
    pub fn from_seconds(seconds: f64) -> Self {
        if seconds >= YEAR {
            Unit::Year
        } else if seconds >= MONTH {
            Unit::Month
        } else if seconds >= WEEK {
            Unit::Week
        } else if seconds >= DAY {
            Unit::Day
        } else if seconds >= HOUR {
            Unit::Hour
        } else if seconds >= MINUTE {
            Unit::Minute
        } else if seconds >= 1.0 {
            Unit::Second
        } else {
            Unit::Number
        }
    }

    pub fn is_time(self) -> bool {
        self != Unit::Number
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::Number => "number",
            Unit::Second => "second",
            Unit::Minute => "minute",
            Unit::Hour => "hour",
            Unit::Day => "day",
            Unit::Week => "week",
            Unit::Month => "month",
            Unit::Year => "year",
        };
        write!(f, "{s}")
    }
}
