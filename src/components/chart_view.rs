//! ChartView: axis selectors plus the dual-series line chart.
//!
//! The selector row owns nothing but which selector has focus; the actual
//! axis pointers live in the app state and arrive as arguments, so the
//! chart redraws correctly no matter which mutation triggered it.

use crate::action::Action;
use crate::core::axes::{Axis, AxisSelection, PlotSeries, trim_float};
use crate::core::dataset::Dataset;
use crate::theme::Theme;
use chrono::DateTime;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    symbols,
    text::{Line, Span},
    widgets::{Axis as ChartAxis, Block, Borders, Chart, Dataset as ChartDataset, GraphType,
        Paragraph},
};

const SELECTORS: [Axis; 3] = [Axis::X, Axis::Y1, Axis::Y2];

#[derive(Debug, Default)]
pub struct ChartView {
    /// Which of the three selectors reacts to left/right.
    selector: usize,
}

impl ChartView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Left/right cycle the focused selector through that axis's options;
    /// up/down switch selectors. Every change is an action so the app can
    /// re-resolve and replot.
    pub fn handle_key_event(
        &mut self,
        key: KeyEvent,
        dataset: &Dataset,
        axes: &AxisSelection,
    ) -> Result<Option<Action>> {
        match key.code {
            KeyCode::Up => {
                self.selector = self.selector.checked_sub(1).unwrap_or(SELECTORS.len() - 1);
            }
            KeyCode::Down | KeyCode::Tab => {
                self.selector = (self.selector + 1) % SELECTORS.len();
            }
            KeyCode::Left => return Ok(self.step_selection(dataset, axes, -1)),
            KeyCode::Right => return Ok(self.step_selection(dataset, axes, 1)),
            _ => {}
        }
        Ok(None)
    }

    fn step_selection(
        &self,
        dataset: &Dataset,
        axes: &AxisSelection,
        delta: isize,
    ) -> Option<Action> {
        let axis = SELECTORS[self.selector];
        let options = AxisSelection::options(axis, dataset.columns());
        if options.is_empty() {
            return None;
        }
        let current = options
            .iter()
            .position(|c| c == axes.get(axis))
            .unwrap_or(0);
        let next = (current as isize + delta).rem_euclid(options.len() as isize) as usize;
        if next == current {
            return None;
        }
        Some(Action::AxisSelected {
            axis,
            column: options[next].clone(),
        })
    }

    pub fn draw(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        series: &PlotSeries,
        theme: &Theme,
        focused: bool,
    ) {
        let block = Block::default()
            .title(" Chart ")
            .borders(Borders::ALL)
            .border_style(theme.border_style(focused));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height < 4 {
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(inner);

        self.draw_selectors(frame, chunks[0], series, theme, focused);
        self.draw_chart(frame, chunks[1], series, theme);
    }

    fn draw_selectors(
        &self,
        frame: &mut Frame,
        area: Rect,
        series: &PlotSeries,
        theme: &Theme,
        focused: bool,
    ) {
        let selected = |axis: Axis| -> &str {
            match axis {
                Axis::X => &series.x_column,
                Axis::Y1 => &series.y1_column,
                Axis::Y2 => &series.y2_column,
            }
        };
        let mut spans: Vec<Span> = Vec::new();
        for (i, axis) in SELECTORS.iter().enumerate() {
            let style = if focused && i == self.selector {
                theme.selected_style()
            } else {
                theme.normal_style()
            };
            spans.push(Span::styled(
                format!(" {}: ‹{}› ", axis.label(), selected(*axis)),
                style,
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_chart(&self, frame: &mut Frame, area: Rect, series: &PlotSeries, theme: &Theme) {
        if series.is_empty() {
            let empty = Paragraph::new("No data to plot — add a row below the table")
                .style(theme.normal_style())
                .centered();
            frame.render_widget(empty, area);
            return;
        }

        let Some((x_min, x_max)) = series.x_bounds() else {
            return;
        };
        let Some((y_min, y_max)) = series.y_bounds() else {
            return;
        };
        // Flat data still needs a nonzero span to draw
        let (x_min, x_max) = pad_bounds(x_min, x_max);
        let (y_min, y_max) = pad_bounds(y_min, y_max);

        let datasets = vec![
            ChartDataset::default()
                .name(series.y1_column.clone())
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(theme.series_y1))
                .data(&series.y1_points),
            ChartDataset::default()
                .name(series.y2_column.clone())
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(theme.series_y2))
                .data(&series.y2_points),
        ];

        let x_labels: Vec<Span> = x_tick_labels(series, x_min, x_max)
            .into_iter()
            .map(Span::from)
            .collect();
        let y_labels: Vec<Span> = [y_min, (y_min + y_max) / 2.0, y_max]
            .iter()
            .map(|v| Span::from(trim_float(*v)))
            .collect();

        let chart = Chart::new(datasets)
            .x_axis(
                ChartAxis::default()
                    .title(series.x_column.clone())
                    .bounds([x_min, x_max])
                    .labels(x_labels)
                    .style(theme.normal_style()),
            )
            .y_axis(
                ChartAxis::default()
                    .bounds([y_min, y_max])
                    .labels(y_labels)
                    .style(theme.normal_style()),
            );
        frame.render_widget(chart, area);
    }
}

/// Give zero-span bounds a little room so the chart axis stays valid.
fn pad_bounds(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        (min, max)
    }
}

/// Three tick labels across the X range; month-day when X is the date.
fn x_tick_labels(series: &PlotSeries, x_min: f64, x_max: f64) -> Vec<String> {
    let format = |x: f64| -> String {
        if series.x_is_date {
            DateTime::from_timestamp_millis(x as i64)
                .map(|dt| dt.format("%m-%d").to_string())
                .unwrap_or_default()
        } else {
            trim_float(x)
        }
    };
    vec![format(x_min), format((x_min + x_max) / 2.0), format(x_max)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::axes::plot_series;
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn dataset() -> Dataset {
        let mut ds = Dataset::default();
        let mut entries = HashMap::new();
        entries.insert("Variable 1".to_string(), "1".to_string());
        entries.insert("Variable 2".to_string(), "2".to_string());
        ds.add_row("2024-01-01", &entries).unwrap();
        ds
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn stepping_the_x_selector_emits_the_next_option() {
        let ds = dataset();
        let axes = AxisSelection::resolve(ds.columns(), None);
        let mut view = ChartView::new();

        let action = view.handle_key_event(key(KeyCode::Right), &ds, &axes).unwrap();
        assert_eq!(
            action,
            Some(Action::AxisSelected {
                axis: Axis::X,
                column: "Variable 1".to_string(),
            })
        );
    }

    #[test]
    fn y_selectors_skip_the_date_column() {
        let ds = dataset();
        let axes = AxisSelection::resolve(ds.columns(), None);
        let mut view = ChartView::new();
        view.handle_key_event(key(KeyCode::Down), &ds, &axes).unwrap();

        // Y1 currently "Variable 1"; stepping right wraps within value columns
        let action = view.handle_key_event(key(KeyCode::Right), &ds, &axes).unwrap();
        assert_eq!(
            action,
            Some(Action::AxisSelected {
                axis: Axis::Y1,
                column: "Variable 2".to_string(),
            })
        );
    }

    #[test]
    fn selector_focus_wraps_both_directions() {
        let ds = dataset();
        let axes = AxisSelection::resolve(ds.columns(), None);
        let mut view = ChartView::new();
        view.handle_key_event(key(KeyCode::Up), &ds, &axes).unwrap();
        assert_eq!(view.selector, 2);
        view.handle_key_event(key(KeyCode::Down), &ds, &axes).unwrap();
        assert_eq!(view.selector, 0);
    }

    #[test]
    fn date_ticks_render_as_month_day() {
        let ds = dataset();
        let axes = AxisSelection::resolve(ds.columns(), None);
        let series = plot_series(&ds, &axes);
        let (x_min, x_max) = series.x_bounds().unwrap();
        let labels = x_tick_labels(&series, x_min, x_max);
        assert_eq!(labels[0], "01-01");
    }

    #[test]
    fn flat_bounds_get_padded() {
        assert_eq!(pad_bounds(5.0, 5.0), (4.0, 6.0));
        assert_eq!(pad_bounds(1.0, 2.0), (1.0, 2.0));
    }
}
