use crate::error::CoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The side a trade was taken on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// The multiplier applied to `(exit - entry) * size` to get a signed P/L.
    pub fn sign(&self) -> Decimal {
        match self {
            Direction::Long => Decimal::ONE,
            Direction::Short => Decimal::NEGATIVE_ONE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LONG" => Ok(Direction::Long),
            "SHORT" => Ok(Direction::Short),
            _ => Err(CoreError::UnknownVariant {
                kind: "direction",
                value: s.to_string(),
            }),
        }
    }
}

/// The label a user attached to a trade.
///
/// This is stored as-is and is never derived from the sign of the trade's
/// profit/loss; the two are allowed to disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Win,
    Loss,
    BreakEven,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Win => "WIN",
            Outcome::Loss => "LOSS",
            Outcome::BreakEven => "BREAKEVEN",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace(['-', '_', ' '], "").as_str() {
            "WIN" => Ok(Outcome::Win),
            "LOSS" => Ok(Outcome::Loss),
            "BREAKEVEN" => Ok(Outcome::BreakEven),
            _ => Err(CoreError::UnknownVariant {
                kind: "outcome",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_case_insensitively() {
        assert_eq!("long".parse::<Direction>().unwrap(), Direction::Long);
        assert_eq!(" Short ".parse::<Direction>().unwrap(), Direction::Short);
        assert_eq!("break_even".parse::<Outcome>().unwrap(), Outcome::BreakEven);
        assert_eq!("BREAKEVEN".parse::<Outcome>().unwrap(), Outcome::BreakEven);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn serializes_as_uppercase_labels() {
        assert_eq!(serde_json::to_string(&Outcome::BreakEven).unwrap(), "\"BREAKEVEN\"");
        assert_eq!(serde_json::to_string(&Direction::Short).unwrap(), "\"SHORT\"");
        let parsed: Outcome = serde_json::from_str("\"WIN\"").unwrap();
        assert_eq!(parsed, Outcome::Win);
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for outcome in [Outcome::Win, Outcome::Loss, Outcome::BreakEven] {
            assert_eq!(outcome.to_string().parse::<Outcome>().unwrap(), outcome);
        }
    }
}
