//! Client-side half of the correlation feature.
//!
//! Vector extraction, pair enumeration, result bookkeeping, and the heatmap
//! color scale live here. The coefficients themselves come from the backend
//! (`calculate_correlation`), one request per pair; this module never does
//! the statistics.

use crate::core::axes::{AxisSelection, date_to_millis};
use crate::core::dataset::{DATE_COLUMN, Dataset};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An unordered column pair, normalized so `(a, b)` and `(b, a)` collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey(String, String);

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_string(), b.to_string())
        } else {
            Self(b.to_string(), a.to_string())
        }
    }
}

/// What came back (or failed to come back) for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PairOutcome {
    Computed {
        coefficient: f64,
        p_value: Option<f64>,
        interpretation: String,
    },
    Failed(String),
}

/// Extract one column as a numeric vector.
///
/// Dates become epoch milliseconds, matching what the backend divides back
/// into days. The validity flag mirrors the wire contract: the typed store
/// cannot actually hold an unparseable value, but callers still branch on
/// it so the contract reads the same as the endpoint's.
pub fn extract_numeric(dataset: &Dataset, column: &str) -> (Vec<f64>, bool) {
    if column == DATE_COLUMN {
        let values = dataset
            .rows()
            .iter()
            .map(|row| date_to_millis(row.date))
            .collect();
        return (values, true);
    }
    let mut all_valid = true;
    let values = dataset
        .rows()
        .iter()
        .map(|row| match row.value(column) {
            Some(v) if v.is_finite() => v,
            _ => {
                all_valid = false;
                0.0
            }
        })
        .collect();
    (values, all_valid)
}

/// The unordered pairs among the currently-selected axes, deduplicated
/// (selections may coincide) and in a stable display order.
pub fn plotted_pairs(axes: &AxisSelection) -> Vec<(String, String)> {
    let candidates = [
        (axes.x.clone(), axes.y1.clone()),
        (axes.x.clone(), axes.y2.clone()),
        (axes.y1.clone(), axes.y2.clone()),
    ];
    let mut seen = Vec::new();
    let mut pairs = Vec::new();
    for (a, b) in candidates {
        if a == b {
            continue;
        }
        let key = PairKey::new(&a, &b);
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        pairs.push((a, b));
    }
    pairs
}

/// Off-diagonal upper-triangle pairs over the whole registry, in registry
/// order. Diagonal cells are identity and never leave the client.
pub fn all_pairs(columns: &[String]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for i in 0..columns.len() {
        for j in (i + 1)..columns.len() {
            pairs.push((columns[i].clone(), columns[j].clone()));
        }
    }
    pairs
}

/// Accumulates per-pair outcomes into a symmetric matrix view.
///
/// Only the upper triangle is ever written; reads mirror it. Ephemeral by
/// design — rebuilt from scratch on every recompute, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    columns: Vec<String>,
    outcomes: HashMap<PairKey, PairOutcome>,
    pending: usize,
}

impl CorrelationMatrix {
    pub fn new(columns: Vec<String>) -> Self {
        let pending = all_pairs(&columns).len();
        Self {
            columns,
            outcomes: HashMap::new(),
            pending,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn record(&mut self, a: &str, b: &str, outcome: PairOutcome) {
        if self
            .outcomes
            .insert(PairKey::new(a, b), outcome)
            .is_none()
        {
            self.pending = self.pending.saturating_sub(1);
        }
    }

    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }

    /// Coefficient for a cell; the diagonal is identity.
    pub fn coefficient(&self, a: &str, b: &str) -> Option<f64> {
        if a == b {
            return Some(1.0);
        }
        match self.outcomes.get(&PairKey::new(a, b)) {
            Some(PairOutcome::Computed { coefficient, .. }) => Some(*coefficient),
            _ => None,
        }
    }

    pub fn outcome(&self, a: &str, b: &str) -> Option<&PairOutcome> {
        self.outcomes.get(&PairKey::new(a, b))
    }

    /// The strongest-magnitude off-diagonal pair, for the summary line.
    pub fn strongest_pair(&self) -> Option<(&str, &str, f64)> {
        let mut best: Option<(&str, &str, f64)> = None;
        for i in 0..self.columns.len() {
            for j in (i + 1)..self.columns.len() {
                let (a, b) = (&self.columns[i], &self.columns[j]);
                if let Some(r) = self.coefficient(a, b) {
                    if best.map_or(true, |(_, _, current)| r.abs() > current.abs()) {
                        best = Some((a, b, r));
                    }
                }
            }
        }
        best
    }
}

/// Qualitative strength of a coefficient, same thresholds the backend's
/// interpretation text uses.
pub fn strength_label(r: f64) -> &'static str {
    let magnitude = r.abs();
    if magnitude > 0.7 {
        "strong"
    } else if magnitude > 0.3 {
        "moderate"
    } else if magnitude > 0.1 {
        "weak"
    } else {
        "no"
    }
}

pub fn direction_label(r: f64) -> &'static str {
    if r > 0.0 { "positive" } else { "negative" }
}

pub fn significance_label(p: f64) -> &'static str {
    if p < 0.05 {
        "significant"
    } else {
        "not significant"
    }
}

/// Fixed red-white-blue diverging scale over [-1, 1]: -1 saturated red,
/// 0 white, +1 saturated blue.
pub fn diverging_color(r: f64) -> Color {
    let r = r.clamp(-1.0, 1.0);
    let t = r.abs();
    let fade = |channel: f64| (255.0 - t * (255.0 - channel)).round() as u8;
    if r < 0.0 {
        // white -> red (178, 24, 43)
        Color::Rgb(fade(178.0), fade(24.0), fade(43.0))
    } else {
        // white -> blue (33, 102, 172)
        Color::Rgb(fade(33.0), fade(102.0), fade(172.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn sample() -> Dataset {
        let mut ds = Dataset::default();
        for (date, a, b) in [
            ("2024-01-01", "1", "10"),
            ("2024-01-02", "2", "20"),
            ("2024-01-03", "3", "30"),
        ] {
            let mut entries = HashMap::new();
            entries.insert("Variable 1".to_string(), a.to_string());
            entries.insert("Variable 2".to_string(), b.to_string());
            ds.add_row(date, &entries).unwrap();
        }
        ds
    }

    #[test]
    fn dates_extract_as_epoch_millis() {
        let ds = sample();
        let (values, all_valid) = extract_numeric(&ds, DATE_COLUMN);
        assert!(all_valid);
        assert_eq!(values.len(), 3);
        // Consecutive days are exactly one day of millis apart
        assert_eq!(values[1] - values[0], 86_400_000.0);
    }

    #[test]
    fn value_columns_extract_in_row_order() {
        let ds = sample();
        let (values, all_valid) = extract_numeric(&ds, "Variable 2");
        assert!(all_valid);
        assert_eq!(values, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn plotted_pairs_dedupe_coinciding_axes() {
        let axes = AxisSelection {
            x: "Date".to_string(),
            y1: "A".to_string(),
            y2: "A".to_string(),
        };
        assert_eq!(
            plotted_pairs(&axes),
            vec![("Date".to_string(), "A".to_string())]
        );

        let axes = AxisSelection {
            x: "Date".to_string(),
            y1: "A".to_string(),
            y2: "B".to_string(),
        };
        assert_eq!(plotted_pairs(&axes).len(), 3);
    }

    #[test]
    fn all_pairs_cover_the_upper_triangle() {
        let columns = vec!["Date".to_string(), "A".to_string(), "B".to_string()];
        assert_eq!(
            all_pairs(&columns),
            vec![
                ("Date".to_string(), "A".to_string()),
                ("Date".to_string(), "B".to_string()),
                ("A".to_string(), "B".to_string()),
            ]
        );
    }

    #[test]
    fn matrix_mirrors_and_completes() {
        let columns = vec!["Date".to_string(), "A".to_string(), "B".to_string()];
        let mut matrix = CorrelationMatrix::new(columns);
        assert!(!matrix.is_complete());

        matrix.record(
            "A",
            "Date",
            PairOutcome::Computed {
                coefficient: 0.9,
                p_value: Some(0.01),
                interpretation: String::new(),
            },
        );
        // Mirrored read, either order
        assert_eq!(matrix.coefficient("Date", "A"), Some(0.9));
        assert_eq!(matrix.coefficient("A", "Date"), Some(0.9));
        // Diagonal is identity without a request
        assert_eq!(matrix.coefficient("A", "A"), Some(1.0));

        matrix.record("Date", "B", PairOutcome::Failed("constant".to_string()));
        matrix.record(
            "A",
            "B",
            PairOutcome::Computed {
                coefficient: -0.4,
                p_value: Some(0.2),
                interpretation: String::new(),
            },
        );
        assert!(matrix.is_complete());
        assert_eq!(matrix.coefficient("B", "Date"), None);
    }

    #[test]
    fn strongest_pair_ignores_the_diagonal() {
        let columns = vec!["Date".to_string(), "A".to_string(), "B".to_string()];
        let mut matrix = CorrelationMatrix::new(columns);
        matrix.record(
            "Date",
            "A",
            PairOutcome::Computed {
                coefficient: 0.2,
                p_value: None,
                interpretation: String::new(),
            },
        );
        matrix.record(
            "A",
            "B",
            PairOutcome::Computed {
                coefficient: -0.8,
                p_value: None,
                interpretation: String::new(),
            },
        );
        let (a, b, r) = matrix.strongest_pair().unwrap();
        assert_eq!((a, b, r), ("A", "B", -0.8));
    }

    #[test]
    fn strength_thresholds_match_the_interpretation_text() {
        assert_eq!(strength_label(0.9), "strong");
        assert_eq!(strength_label(-0.5), "moderate");
        assert_eq!(strength_label(0.2), "weak");
        assert_eq!(strength_label(0.05), "no");
        assert_eq!(direction_label(0.3), "positive");
        assert_eq!(direction_label(-0.3), "negative");
        assert_eq!(significance_label(0.01), "significant");
        assert_eq!(significance_label(0.5), "not significant");
    }

    #[test]
    fn diverging_scale_hits_its_anchors() {
        assert_eq!(diverging_color(0.0), Color::Rgb(255, 255, 255));
        assert_eq!(diverging_color(1.0), Color::Rgb(33, 102, 172));
        assert_eq!(diverging_color(-1.0), Color::Rgb(178, 24, 43));
        // Out-of-domain input clamps instead of wrapping
        assert_eq!(diverging_color(5.0), diverging_color(1.0));
    }
}
