// 🏷️ Segmentation - fixed CLV thresholds
// value = margin - acquisition cost, bucketed into Low / Mid / High.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// THRESHOLDS
// ============================================================================

/// Values strictly above this are `Mid` (or `High`)
pub const MID_THRESHOLD: i64 = 1_000_000;

/// Values strictly above this are `High`
pub const HIGH_THRESHOLD: i64 = 2_500_000;

// ============================================================================
// SEGMENT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Segment {
    #[serde(rename = "Low Value", alias = "Low")]
    Low,
    #[serde(rename = "Mid Value", alias = "Mid")]
    Mid,
    #[serde(rename = "High Value", alias = "High")]
    High,
}

impl Segment {
    /// Display order used by dashboards and the distribution chart
    pub const ALL: [Segment; 3] = [Segment::High, Segment::Mid, Segment::Low];

    pub fn from_value(value: i64) -> Self {
        if value > HIGH_THRESHOLD {
            Segment::High
        } else if value > MID_THRESHOLD {
            Segment::Mid
        } else {
            Segment::Low
        }
    }

    /// Label written to the CSV `Segment` column
    pub fn label(&self) -> &'static str {
        match self {
            Segment::Low => "Low Value",
            Segment::Mid => "Mid Value",
            Segment::High => "High Value",
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Segment::Low => "Low",
            Segment::Mid => "Mid",
            Segment::High => "High",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Segment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Low Value" | "Low" => Ok(Segment::Low),
            "Mid Value" | "Mid" => Ok(Segment::Mid),
            "High Value" | "High" => Ok(Segment::High),
            other => Err(format!("unknown segment: {other}")),
        }
    }
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub value: i64,
    pub segment: Segment,
}

/// Derive CLV and segment from margin and acquisition cost.
///
/// Returns `None` only when an input does not fit in `i64`.
pub fn classify(margin: u64, cost: u64) -> Option<Classification> {
    let margin = i64::try_from(margin).ok()?;
    let cost = i64::try_from(cost).ok()?;
    let value = margin.checked_sub(cost)?;

    Some(Classification {
        value,
        segment: Segment::from_value(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_is_margin_minus_cost() {
        let c = classify(1_500_000, 1_000_000).unwrap();
        assert_eq!(c.value, 500_000);

        let c = classify(100, 400).unwrap();
        assert_eq!(c.value, -300);
        assert_eq!(c.segment, Segment::Low);
    }

    #[test]
    fn test_boundaries_fall_into_lower_bucket() {
        assert_eq!(classify(1_000_000, 0).unwrap().segment, Segment::Low);
        assert_eq!(classify(1_000_001, 0).unwrap().segment, Segment::Mid);
        assert_eq!(classify(2_500_000, 0).unwrap().segment, Segment::Mid);
        assert_eq!(classify(2_500_001, 0).unwrap().segment, Segment::High);
    }

    #[test]
    fn test_reference_customers() {
        assert_eq!(classify(3_000_000, 200_000).unwrap(), Classification {
            value: 2_800_000,
            segment: Segment::High,
        });
        assert_eq!(classify(2_000_000, 500_000).unwrap(), Classification {
            value: 1_500_000,
            segment: Segment::Mid,
        });
    }

    #[test]
    fn test_oversized_input_rejected() {
        assert!(classify(u64::MAX, 0).is_none());
        assert!(classify(0, u64::MAX).is_none());
    }

    #[test]
    fn test_segment_labels_parse() {
        assert_eq!("High Value".parse::<Segment>().unwrap(), Segment::High);
        assert_eq!("Mid".parse::<Segment>().unwrap(), Segment::Mid);
        assert!("Premium".parse::<Segment>().is_err());
        assert_eq!(Segment::Low.to_string(), "Low Value");
    }
}
