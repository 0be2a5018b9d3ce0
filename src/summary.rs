// 📊 Summary - dashboard aggregates over the current records
// Pure functions. An empty store has no summary (None), never NaN.

use crate::record::CustomerRecord;
use crate::segment::Segment;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentStats {
    pub segment: Segment,
    pub count: usize,
    pub mean_clv: f64,
    pub median_clv: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentCount {
    pub segment: Segment,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean_clv: f64,
    pub median_clv: f64,
    /// Only segments that have at least one record, High → Low
    pub per_segment: Vec<SegmentStats>,
    /// All three segments, High → Low, zero counts included (bar chart input)
    pub distribution: Vec<SegmentCount>,
}

impl Summary {
    pub fn segment(&self, segment: Segment) -> Option<&SegmentStats> {
        self.per_segment.iter().find(|s| s.segment == segment)
    }
}

/// Aggregate the records, or `None` when there are none.
pub fn summarize(records: &[CustomerRecord]) -> Option<Summary> {
    let values: Vec<i64> = records.iter().map(|r| r.clv()).collect();
    let (mean_clv, median_clv) = mean_median(&values)?;

    let mut per_segment = Vec::new();
    let mut distribution = Vec::new();

    for segment in Segment::ALL {
        let seg_values: Vec<i64> = records
            .iter()
            .filter(|r| r.segment() == segment)
            .map(|r| r.clv())
            .collect();

        distribution.push(SegmentCount {
            segment,
            count: seg_values.len(),
        });

        if let Some((mean, median)) = mean_median(&seg_values) {
            per_segment.push(SegmentStats {
                segment,
                count: seg_values.len(),
                mean_clv: mean,
                median_clv: median,
            });
        }
    }

    Some(Summary {
        count: records.len(),
        mean_clv,
        median_clv,
        per_segment,
        distribution,
    })
}

fn mean_median(values: &[i64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }

    let sum: i128 = values.iter().map(|&v| v as i128).sum();
    let mean = sum as f64 / values.len() as f64;

    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    } else {
        sorted[mid] as f64
    };

    Some((mean, median))
}

/// `Rp 1,234,567` - truncates toward zero like the dashboard metrics do
pub fn format_rupiah(amount: f64) -> String {
    let whole = amount.trunc() as i64;
    let digits = whole.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if whole < 0 {
        format!("Rp -{grouped}")
    } else {
        format!("Rp {grouped}")
    }
}
