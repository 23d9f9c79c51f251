pub mod chart_view;
pub mod correlation_view;
pub mod table_view;

pub use chart_view::ChartView;
pub use correlation_view::CorrelationView;
pub use table_view::TableView;

use crate::action::Action;
use color_eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::{Frame, layout::Rect};

/// Base trait for self-contained UI elements (dialogs, overlays).
///
/// The three data panels take the dataset as an argument instead — they are
/// projections of shared state and deliberately own none of it — so they
/// expose inherent methods rather than this trait.
pub trait Component {
    /// Handle a key press. Returns an action to dispatch, or `None` when
    /// the key was consumed (or ignored) locally.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>>;

    /// Render into the given area.
    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()>;
}
