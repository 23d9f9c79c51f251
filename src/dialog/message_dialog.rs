use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Clear};

use crate::action::Action;
use crate::components::Component;

/// Reusable modal for transient notifications: alerts, import messages,
/// backend errors. Enter or Esc dismisses it.
#[derive(Debug, Clone)]
pub struct MessageDialog {
    title: String,
    message: String,
    /// Optional action dispatched when the dialog closes (e.g. the
    /// disclaimer acknowledgement).
    on_close: Option<Action>,
}

impl MessageDialog {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            title: "Message".to_string(),
            message: message.into(),
            on_close: None,
        }
    }

    pub fn with_title(message: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            on_close: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_title(message, "Error")
    }

    pub fn on_close(mut self, action: Action) -> Self {
        self.on_close = Some(action);
        self
    }

    fn modal_area(&self, area: Rect) -> Rect {
        let max_width = area.width.clamp(20, 48);
        let wrap_width = max_width.saturating_sub(4) as usize;
        let wrapped = textwrap::wrap(&self.message, wrap_width.max(1));
        let content_lines = wrapped.len() as u16;
        let height = content_lines
            .saturating_add(4)
            .clamp(5, area.height.saturating_sub(4).max(5));
        let width = max_width;
        let x = area.x + (area.width.saturating_sub(width)) / 2;
        let y = area.y + (area.height.saturating_sub(height)) / 2;
        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

impl Component for MessageDialog {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.kind == KeyEventKind::Press {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => {
                    return Ok(Some(
                        self.on_close.clone().unwrap_or(Action::DialogClose),
                    ));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let modal = self.modal_area(area);
        frame.render_widget(Clear, modal);

        let block = Block::default()
            .title(self.title.as_str())
            .borders(Borders::ALL)
            .border_type(BorderType::Double);
        let inner = block.inner(modal);
        frame.render_widget(block, modal);

        let buf = frame.buffer_mut();
        let wrap_width = inner.width.saturating_sub(2) as usize;
        let wrapped = textwrap::wrap(&self.message, wrap_width.max(1));
        for (i, line) in wrapped.iter().enumerate() {
            if i as u16 >= inner.height {
                break;
            }
            buf.set_string(
                inner.x + 1,
                inner.y + i as u16,
                line,
                Style::default().fg(Color::White),
            );
        }

        let hint = "Enter/Esc to close";
        let hint_x = inner.x + inner.width.saturating_sub(hint.len() as u16 + 1);
        let hint_y = inner.y + inner.height.saturating_sub(1);
        buf.set_string(hint_x, hint_y, hint, Style::default().fg(Color::Gray));
        Ok(())
    }
}
