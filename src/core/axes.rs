//! Axis selection and chart projection.
//!
//! Three pointers into the column registry (X, Y1, Y2) plus the pure
//! function that turns the dataset into sorted plot series. Selections are
//! re-resolved against the registry after every structural change, keeping
//! the user's choice whenever it is still a valid option.

use crate::core::dataset::{DATE_COLUMN, Dataset};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Which axis pointer a selector controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y1,
    Y2,
}

impl Axis {
    pub fn label(&self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y1 => "Y1",
            Axis::Y2 => "Y2",
        }
    }
}

/// The three axis pointers. Y1/Y2 never point at `Date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisSelection {
    pub x: String,
    pub y1: String,
    pub y2: String,
}

impl AxisSelection {
    /// Resolve selections against the registry.
    ///
    /// A preferred value survives if it is still among that axis's options;
    /// otherwise X falls back to `Date`, Y1 to the first value column, and
    /// Y2 to the first value column different from Y1 (or Y1 itself when
    /// only one value column exists).
    pub fn resolve(columns: &[String], prefer: Option<&AxisSelection>) -> Self {
        let y_options: Vec<&String> =
            columns.iter().filter(|c| *c != DATE_COLUMN).collect();

        let x = prefer
            .map(|p| &p.x)
            .filter(|x| columns.contains(*x))
            .cloned()
            .unwrap_or_else(|| DATE_COLUMN.to_string());

        let y1 = prefer
            .map(|p| &p.y1)
            .filter(|y| y_options.iter().any(|c| c == y))
            .or(y_options.first().copied())
            .cloned()
            .unwrap_or_else(|| DATE_COLUMN.to_string());

        let y2 = prefer
            .map(|p| &p.y2)
            .filter(|y| y_options.iter().any(|c| c == y))
            .cloned()
            .or_else(|| {
                y_options
                    .iter()
                    .find(|c| c.as_str() != y1)
                    .map(|c| (*c).clone())
            })
            .unwrap_or_else(|| y1.clone());

        Self { x, y1, y2 }
    }

    /// Options offered for an axis: X may point anywhere, Y1/Y2 exclude
    /// `Date`.
    pub fn options(axis: Axis, columns: &[String]) -> Vec<String> {
        match axis {
            Axis::X => columns.to_vec(),
            Axis::Y1 | Axis::Y2 => columns
                .iter()
                .filter(|c| *c != DATE_COLUMN)
                .cloned()
                .collect(),
        }
    }

    pub fn get(&self, axis: Axis) -> &str {
        match axis {
            Axis::X => &self.x,
            Axis::Y1 => &self.y1,
            Axis::Y2 => &self.y2,
        }
    }

    pub fn set(&mut self, axis: Axis, column: String) {
        match axis {
            Axis::X => self.x = column,
            Axis::Y1 => self.y1 = column,
            Axis::Y2 => self.y2 = column,
        }
    }

    /// Repoint any pointer equal to `from` at `to` after a rename.
    /// Returns true when at least one pointer moved.
    pub fn repoint(&mut self, from: &str, to: &str) -> bool {
        let mut moved = false;
        for slot in [&mut self.x, &mut self.y1, &mut self.y2] {
            if slot == from {
                *slot = to.to_string();
                moved = true;
            }
        }
        moved
    }
}

/// Date cell as the number the chart and the correlation service share:
/// milliseconds since the Unix epoch at local midnight.
pub fn date_to_millis(date: chrono::NaiveDate) -> f64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis() as f64
}

/// Two series sharing one X vector, sorted ascending by X.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub x_column: String,
    pub y1_column: String,
    pub y2_column: String,
    pub x_is_date: bool,
    /// (x, y1) pairs in plot order.
    pub y1_points: Vec<(f64, f64)>,
    /// (x, y2) pairs in plot order.
    pub y2_points: Vec<(f64, f64)>,
    /// X values in plot order, formatted for tick labels.
    pub x_labels: Vec<String>,
}

impl PlotSeries {
    pub fn is_empty(&self) -> bool {
        self.y1_points.is_empty()
    }

    /// Inclusive X range of the plotted points.
    pub fn x_bounds(&self) -> Option<(f64, f64)> {
        let first = self.y1_points.first()?.0;
        let last = self.y1_points.last()?.0;
        Some((first, last))
    }

    /// Inclusive Y range across both series (they share one value axis).
    pub fn y_bounds(&self) -> Option<(f64, f64)> {
        let ys = self
            .y1_points
            .iter()
            .chain(self.y2_points.iter())
            .map(|(_, y)| *y);
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for y in ys {
            min = min.min(y);
            max = max.max(y);
        }
        if min.is_finite() {
            Some((min, max))
        } else {
            None
        }
    }
}

/// Project the dataset onto the selected axes.
///
/// The dataset is copied and sorted ascending by the X column — row
/// insertion order is display order, not plot order. Chronological
/// comparison when X is `Date`, numeric otherwise. Idempotent; no state is
/// touched.
pub fn plot_series(dataset: &Dataset, axes: &AxisSelection) -> PlotSeries {
    let x_is_date = axes.x == DATE_COLUMN;

    let mut indexed: Vec<(f64, String, usize)> = dataset
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            if x_is_date {
                (
                    date_to_millis(row.date),
                    row.date.format("%m-%d").to_string(),
                    i,
                )
            } else {
                let x = row.value(&axes.x).unwrap_or(0.0);
                (x, trim_float(x), i)
            }
        })
        .collect();
    indexed.sort_by(|a, b| a.0.total_cmp(&b.0));

    let rows = dataset.rows();
    let mut y1_points = Vec::with_capacity(indexed.len());
    let mut y2_points = Vec::with_capacity(indexed.len());
    let mut x_labels = Vec::with_capacity(indexed.len());
    for (x, label, i) in indexed {
        y1_points.push((x, rows[i].value(&axes.y1).unwrap_or(0.0)));
        y2_points.push((x, rows[i].value(&axes.y2).unwrap_or(0.0)));
        x_labels.push(label);
    }

    PlotSeries {
        x_column: axes.x.clone(),
        y1_column: axes.y1.clone(),
        y2_column: axes.y2.clone(),
        x_is_date,
        y1_points,
        y2_points,
        x_labels,
    }
}

/// Compact float formatting for tick labels (no trailing `.0`).
pub fn trim_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e12 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn dataset_with_dates(dates: &[&str]) -> Dataset {
        let mut ds = Dataset::default();
        for (i, date) in dates.iter().enumerate() {
            let mut entries = HashMap::new();
            entries.insert("Variable 1".to_string(), format!("{i}"));
            entries.insert("Variable 2".to_string(), format!("{}", i * 10));
            ds.add_row(date, &entries).unwrap();
        }
        ds
    }

    #[test]
    fn defaults_pick_date_and_first_two_value_columns() {
        let columns = Dataset::default_columns();
        let axes = AxisSelection::resolve(&columns, None);
        assert_eq!(axes.x, "Date");
        assert_eq!(axes.y1, "Variable 1");
        assert_eq!(axes.y2, "Variable 2");
    }

    #[test]
    fn preferred_selections_survive_when_still_valid() {
        let columns = vec![
            "Date".to_string(),
            "Temp".to_string(),
            "Humidity".to_string(),
        ];
        let prefer = AxisSelection {
            x: "Temp".to_string(),
            y1: "Humidity".to_string(),
            y2: "Temp".to_string(),
        };
        let axes = AxisSelection::resolve(&columns, Some(&prefer));
        assert_eq!(axes, prefer);
    }

    #[test]
    fn stale_preferences_fall_back_to_defaults() {
        let columns = vec!["Date".to_string(), "Temp".to_string()];
        let prefer = AxisSelection {
            x: "Gone".to_string(),
            y1: "Gone".to_string(),
            y2: "Gone".to_string(),
        };
        let axes = AxisSelection::resolve(&columns, Some(&prefer));
        assert_eq!(axes.x, "Date");
        assert_eq!(axes.y1, "Temp");
        // Only one value column: Y2 falls back to Y1's value
        assert_eq!(axes.y2, "Temp");
    }

    #[test]
    fn y2_avoids_y1_when_another_column_exists() {
        let columns = vec![
            "Date".to_string(),
            "A".to_string(),
            "B".to_string(),
        ];
        let prefer = AxisSelection {
            x: "Date".to_string(),
            y1: "B".to_string(),
            y2: "Missing".to_string(),
        };
        let axes = AxisSelection::resolve(&columns, Some(&prefer));
        assert_eq!(axes.y1, "B");
        assert_eq!(axes.y2, "A");
    }

    #[test]
    fn date_axis_options_exclude_date_for_y() {
        let columns = Dataset::default_columns();
        assert_eq!(AxisSelection::options(Axis::X, &columns).len(), 3);
        assert_eq!(
            AxisSelection::options(Axis::Y1, &columns),
            vec!["Variable 1".to_string(), "Variable 2".to_string()]
        );
    }

    #[test]
    fn repoint_moves_every_matching_pointer() {
        let mut axes = AxisSelection {
            x: "Date".to_string(),
            y1: "A".to_string(),
            y2: "A".to_string(),
        };
        assert!(axes.repoint("A", "B"));
        assert_eq!(axes.y1, "B");
        assert_eq!(axes.y2, "B");
        assert!(!axes.repoint("A", "C"));
    }

    #[test]
    fn plot_sorts_chronologically_when_x_is_date() {
        let ds = dataset_with_dates(&["2024-03-01", "2024-01-01", "2024-02-01"]);
        let axes = AxisSelection::resolve(ds.columns(), None);
        let series = plot_series(&ds, &axes);

        assert_eq!(series.x_labels, vec!["01-01", "02-01", "03-01"]);
        // Y values follow their rows through the sort
        let ys: Vec<f64> = series.y1_points.iter().map(|(_, y)| *y).collect();
        assert_eq!(ys, vec![1.0, 2.0, 0.0]);
    }

    #[test]
    fn plot_sorts_numerically_for_value_x() {
        let mut ds = dataset_with_dates(&["2024-01-01", "2024-01-02"]);
        ds.set_cell(0, "Variable 1", "9").unwrap();
        ds.set_cell(1, "Variable 1", "3").unwrap();
        let mut axes = AxisSelection::resolve(ds.columns(), None);
        axes.set(Axis::X, "Variable 1".to_string());

        let series = plot_series(&ds, &axes);
        assert!(!series.x_is_date);
        assert_eq!(series.y1_points[0].0, 3.0);
        assert_eq!(series.y1_points[1].0, 9.0);
    }

    #[test]
    fn bounds_cover_both_series() {
        let ds = dataset_with_dates(&["2024-01-01", "2024-01-02"]);
        let axes = AxisSelection::resolve(ds.columns(), None);
        let series = plot_series(&ds, &axes);
        // Variable 2 values are 0 and 10
        assert_eq!(series.y_bounds(), Some((0.0, 10.0)));
        assert!(series.x_bounds().is_some());
    }

    #[test]
    fn empty_dataset_projects_to_empty_series() {
        let ds = Dataset::default();
        let axes = AxisSelection::resolve(ds.columns(), None);
        let series = plot_series(&ds, &axes);
        assert!(series.is_empty());
        assert_eq!(series.x_bounds(), None);
        assert_eq!(series.y_bounds(), None);
    }
}
