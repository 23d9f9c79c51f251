//! CorrelationView: per-pair results and the all-pairs heatmap.
//!
//! Holds only display state. Results are ephemeral: each recompute starts a
//! fresh set of slots (or a fresh matrix) and per-pair outcomes stream in
//! independently, so partial success renders partially instead of blocking
//! on the slowest pair.

use crate::core::correlate::{
    CorrelationMatrix, PairOutcome, direction_label, diverging_color, strength_label,
};
use crate::theme::Theme;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

/// One plotted-pair slot; `None` outcome means the request is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct PlottedSlot {
    pub x: String,
    pub y: String,
    pub outcome: Option<PairOutcome>,
}

#[derive(Debug, Default)]
pub struct CorrelationView {
    plotted: Vec<PlottedSlot>,
    matrix: Option<CorrelationMatrix>,
    /// Short-circuit message (no data, invalid vectors) shown instead of
    /// results.
    notice: Option<String>,
    scroll: u16,
}

impl CorrelationView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh plotted-pairs computation.
    pub fn begin_plotted(&mut self, pairs: Vec<(String, String)>) {
        self.notice = None;
        self.plotted = pairs
            .into_iter()
            .map(|(x, y)| PlottedSlot {
                x,
                y,
                outcome: None,
            })
            .collect();
    }

    /// Start a fresh full-matrix computation.
    pub fn begin_matrix(&mut self, columns: Vec<String>) {
        self.notice = None;
        self.matrix = Some(CorrelationMatrix::new(columns));
    }

    /// Replace everything with an explanatory message (zero rows, invalid
    /// vector). Explicitly not an error state.
    pub fn set_notice(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }

    pub fn record_plotted(&mut self, x: &str, y: &str, outcome: PairOutcome) {
        for slot in &mut self.plotted {
            if slot.x == x && slot.y == y {
                slot.outcome = Some(outcome);
                return;
            }
        }
    }

    pub fn record_matrix(&mut self, x: &str, y: &str, outcome: PairOutcome) {
        if let Some(matrix) = &mut self.matrix {
            matrix.record(x, y, outcome);
        }
    }

    pub fn matrix(&self) -> Option<&CorrelationMatrix> {
        self.matrix.as_ref()
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
            _ => {}
        }
        Ok(())
    }

    pub fn draw(&mut self, frame: &mut Frame, area: Rect, theme: &Theme, focused: bool) {
        let block = Block::default()
            .title(" Correlations ")
            .borders(Borders::ALL)
            .border_style(theme.border_style(focused));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        let mut lines: Vec<Line> = Vec::new();
        if let Some(notice) = &self.notice {
            lines.push(Line::from(Span::styled(
                notice.clone(),
                theme.info_style(),
            )));
        } else {
            self.plotted_lines(&mut lines, theme);
            if let Some(matrix) = &self.matrix {
                if !lines.is_empty() {
                    lines.push(Line::default());
                }
                heatmap_lines(matrix, &mut lines, theme);
            }
            if lines.is_empty() {
                lines.push(Line::from(Span::styled(
                    "p: correlate plotted pairs   a: correlate all columns",
                    theme.normal_style(),
                )));
            }
        }

        let paragraph = Paragraph::new(lines).scroll((self.scroll, 0));
        frame.render_widget(paragraph, inner);
    }

    fn plotted_lines(&self, lines: &mut Vec<Line>, theme: &Theme) {
        for slot in &self.plotted {
            let header = format!("{} × {}: ", slot.x, slot.y);
            let line = match &slot.outcome {
                None => Line::from(vec![
                    Span::raw(header),
                    Span::styled("computing…", theme.info_style()),
                ]),
                Some(PairOutcome::Failed(error)) => Line::from(vec![
                    Span::raw(header),
                    Span::styled(error.clone(), theme.error_style()),
                ]),
                Some(PairOutcome::Computed {
                    interpretation, ..
                }) => Line::from(vec![
                    Span::raw(header),
                    Span::styled(interpretation.clone(), theme.normal_style()),
                ]),
            };
            lines.push(line);
        }
    }
}

const CELL_WIDTH: usize = 7;
const LABEL_WIDTH: usize = 12;

fn short_label(name: &str) -> String {
    let mut label: String = name.chars().take(LABEL_WIDTH).collect();
    while label.chars().count() < LABEL_WIDTH {
        label.push(' ');
    }
    label
}

/// The symmetric matrix as styled text: labels, colored cells, and the
/// strongest-pair summary.
fn heatmap_lines(matrix: &CorrelationMatrix, lines: &mut Vec<Line>, theme: &Theme) {
    let columns = matrix.columns();

    // Column header row
    let mut header = vec![Span::raw(" ".repeat(LABEL_WIDTH + 1))];
    for name in columns {
        let mut label: String = name.chars().take(CELL_WIDTH - 1).collect();
        while label.chars().count() < CELL_WIDTH {
            label.push(' ');
        }
        header.push(Span::styled(label, theme.header_style()));
    }
    lines.push(Line::from(header));

    for a in columns {
        let mut spans = vec![
            Span::styled(short_label(a), theme.header_style()),
            Span::raw(" "),
        ];
        for b in columns {
            spans.push(cell_span(matrix, a, b, theme));
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::default());
    if !matrix.is_complete() {
        lines.push(Line::from(Span::styled(
            "computing remaining pairs…",
            theme.info_style(),
        )));
    }
    if let Some((a, b, r)) = matrix.strongest_pair() {
        lines.push(Line::from(Span::styled(
            format!(
                "Strongest relationship: {a} and {b} (r = {r:.2}, {} {})",
                strength_label(r),
                direction_label(r)
            ),
            theme.normal_style(),
        )));
    }
}

fn cell_span(matrix: &CorrelationMatrix, a: &str, b: &str, theme: &Theme) -> Span<'static> {
    match matrix.coefficient(a, b) {
        Some(r) => {
            let text = format!("{:^CELL_WIDTH$}", format!("{r:+.2}"));
            Span::styled(
                text,
                Style::default().fg(Color::Black).bg(diverging_color(r)),
            )
        }
        None => {
            let text = match matrix.outcome(a, b) {
                Some(PairOutcome::Failed(_)) => format!("{:^CELL_WIDTH$}", "×"),
                _ => format!("{:^CELL_WIDTH$}", "·"),
            };
            Span::styled(text, theme.normal_style())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn computed(r: f64) -> PairOutcome {
        PairOutcome::Computed {
            coefficient: r,
            p_value: Some(0.01),
            interpretation: format!("r = {r}"),
        }
    }

    #[test]
    fn plotted_slots_fill_independently() {
        let mut view = CorrelationView::new();
        view.begin_plotted(vec![
            ("Date".to_string(), "A".to_string()),
            ("Date".to_string(), "B".to_string()),
        ]);
        view.record_plotted("Date", "B", PairOutcome::Failed("constant".to_string()));

        assert_eq!(view.plotted[0].outcome, None);
        assert_eq!(
            view.plotted[1].outcome,
            Some(PairOutcome::Failed("constant".to_string()))
        );
    }

    #[test]
    fn notice_replaces_results() {
        let mut view = CorrelationView::new();
        view.begin_plotted(vec![("Date".to_string(), "A".to_string())]);
        view.set_notice("No data available for correlation analysis");
        assert!(view.notice.is_some());

        // A fresh computation clears the notice
        view.begin_plotted(vec![("Date".to_string(), "A".to_string())]);
        assert!(view.notice.is_none());
    }

    #[test]
    fn matrix_records_stream_in() {
        let mut view = CorrelationView::new();
        view.begin_matrix(vec!["Date".to_string(), "A".to_string()]);
        assert!(!view.matrix().unwrap().is_complete());

        view.record_matrix("Date", "A", computed(0.5));
        assert!(view.matrix().unwrap().is_complete());
        assert_eq!(view.matrix().unwrap().coefficient("A", "Date"), Some(0.5));
    }

    #[test]
    fn heatmap_cells_are_fixed_width() {
        let mut matrix = CorrelationMatrix::new(vec!["Date".to_string(), "A".to_string()]);
        matrix.record("Date", "A", computed(-0.8));
        let theme = Theme::default();
        let span = cell_span(&matrix, "Date", "A", &theme);
        assert_eq!(span.content.chars().count(), CELL_WIDTH);
        assert_eq!(span.content.trim(), "-0.80");
    }
}
