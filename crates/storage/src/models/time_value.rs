use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;
use thiserror::Error;

const MILLIS_PER_SECOND: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;

/// Longest accepted leading component ("999999" hours is already absurd).
const MAX_LEADING_DIGITS: usize = 6;
const MAX_FRACTION_DIGITS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("Malformed time: '{0}'")]
    MalformedTime(String),
}

/// An elapsed stage or cumulative time, stored as whole milliseconds.
///
/// Accepted text forms are `S[.F]`, `M:SS[.F]` and `H:MM:SS[.F]`, where
/// every component after the first has exactly two digits and is below 60,
/// and the fraction has one to three digits. The canonical rendering is
/// `M:SS.f` below one hour and `H:MM:SS.f` above, with trailing zeros of the
/// fraction trimmed down to a single digit.
///
/// ```
/// use storage::models::TimeValue;
///
/// let time = TimeValue::parse("1:02:10.30").unwrap();
/// assert_eq!(time.to_string(), "1:02:10.3");
/// assert!(TimeValue::parse("3:45.7").unwrap() < time);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeValue {
    millis: u64,
}

impl TimeValue {
    pub const ZERO: TimeValue = TimeValue { millis: 0 };

    pub const fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    pub const fn as_millis(&self) -> u64 {
        self.millis
    }

    pub fn saturating_sub(self, other: TimeValue) -> TimeValue {
        TimeValue::from_millis(self.millis.saturating_sub(other.millis))
    }

    /// Parse elapsed-time text. Never guesses: anything outside the grammar
    /// is a `MalformedTime`.
    pub fn parse(text: &str) -> Result<Self, TimeParseError> {
        let malformed = || TimeParseError::MalformedTime(text.to_string());
        let trimmed = text.trim();

        let (clock, fraction) = match trimmed.split_once('.') {
            Some((clock, fraction)) => (clock, Some(fraction)),
            None => (trimmed, None),
        };

        let mut components = clock.split(':');
        let leading = components.next().unwrap_or_default();
        if leading.is_empty() || leading.len() > MAX_LEADING_DIGITS || !all_digits(leading) {
            return Err(malformed());
        }
        let mut seconds: u64 = leading.parse().map_err(|_| malformed())?;

        let mut trailing_components = 0;
        for component in components {
            trailing_components += 1;
            if trailing_components > 2 || component.len() != 2 || !all_digits(component) {
                return Err(malformed());
            }
            let value: u64 = component.parse().map_err(|_| malformed())?;
            if value >= 60 {
                return Err(malformed());
            }
            seconds = seconds * 60 + value;
        }

        let fraction_millis = match fraction {
            None => 0,
            Some(digits) => {
                if digits.is_empty() || digits.len() > MAX_FRACTION_DIGITS || !all_digits(digits) {
                    return Err(malformed());
                }
                let value: u64 = digits.parse().map_err(|_| malformed())?;
                value * 10u64.pow((MAX_FRACTION_DIGITS - digits.len()) as u32)
            }
        };

        Ok(Self::from_millis(seconds * MILLIS_PER_SECOND + fraction_millis))
    }

    fn fraction_digits(&self) -> String {
        let digits = format!("{:03}", self.millis % MILLIS_PER_SECOND);
        let trimmed = digits.trim_end_matches('0');
        if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

fn all_digits(text: &str) -> bool {
    text.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.millis / MILLIS_PER_HOUR;
        let minutes = (self.millis % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
        let seconds = (self.millis % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
        let fraction = self.fraction_digits();

        if hours > 0 {
            write!(f, "{hours}:{minutes:02}:{seconds:02}.{fraction}")
        } else {
            write!(f, "{minutes}:{seconds:02}.{fraction}")
        }
    }
}

impl FromStr for TimeValue {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Add for TimeValue {
    type Output = TimeValue;

    fn add(self, rhs: TimeValue) -> TimeValue {
        TimeValue::from_millis(self.millis + rhs.millis)
    }
}

impl AddAssign for TimeValue {
    fn add_assign(&mut self, rhs: TimeValue) {
        self.millis += rhs.millis;
    }
}

impl Serialize for TimeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        TimeValue::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Distance to the leader of a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gap {
    Leader,
    Behind(TimeValue),
}

impl Gap {
    /// Gap for a 1-based position, given the leader's time.
    pub fn for_position(position: u32, leader: TimeValue, time: TimeValue) -> Self {
        if position == 1 {
            Gap::Leader
        } else {
            Gap::Behind(time.saturating_sub(leader))
        }
    }

    pub fn duration(&self) -> TimeValue {
        match self {
            Gap::Leader => TimeValue::ZERO,
            Gap::Behind(gap) => *gap,
        }
    }
}

impl fmt::Display for Gap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gap::Leader => f.write_str("-"),
            Gap::Behind(gap) if gap.millis < MILLIS_PER_MINUTE => write!(
                f,
                "+{}.{}s",
                gap.millis / MILLIS_PER_SECOND,
                gap.fraction_digits()
            ),
            Gap::Behind(gap) => write!(f, "+{gap}"),
        }
    }
}

impl Serialize for Gap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Gap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        if text == "-" {
            return Ok(Gap::Leader);
        }
        let body = text
            .strip_prefix('+')
            .ok_or_else(|| serde::de::Error::custom(format!("gap '{text}' must start with '+'")))?;
        let body = body.strip_suffix('s').unwrap_or(body);
        TimeValue::parse(body)
            .map(Gap::Behind)
            .map_err(serde::de::Error::custom)
    }
}
