use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Clear};

use crate::action::Action;
use crate::components::Component;

/// Yes/no gate for destructive operations (clear, reset).
///
/// Carries the action it is guarding; accepting emits
/// `Action::Confirmed(action)`, declining just closes. Nothing destructive
/// happens until the app sees the confirmation.
#[derive(Debug, Clone)]
pub struct ConfirmDialog {
    title: String,
    message: String,
    on_confirm: Action,
    yes_selected: bool,
}

impl ConfirmDialog {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        on_confirm: Action,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            on_confirm,
            yes_selected: false,
        }
    }

    fn modal_area(&self, area: Rect) -> Rect {
        let width = area.width.clamp(24, 50);
        let wrap_width = width.saturating_sub(4) as usize;
        let lines = textwrap::wrap(&self.message, wrap_width.max(1)).len() as u16;
        let height = (lines + 5).clamp(7, area.height.max(7));
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

impl Component for ConfirmDialog {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }
        match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                self.yes_selected = !self.yes_selected;
            }
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                return Ok(Some(Action::Confirmed(Box::new(self.on_confirm.clone()))));
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                return Ok(Some(Action::DialogClose));
            }
            KeyCode::Enter => {
                return Ok(Some(if self.yes_selected {
                    Action::Confirmed(Box::new(self.on_confirm.clone()))
                } else {
                    Action::DialogClose
                }));
            }
            _ => {}
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
        for (i, line) in textwrap::wrap(&self.message, wrap_width.max(1))
            .iter()
            .enumerate()
        {
            if (i as u16) + 2 >= inner.height {
                break;
            }
            buf.set_string(
                inner.x + 1,
                inner.y + i as u16,
                line,
                Style::default().fg(Color::White),
            );
        }

        // Button row pinned to the bottom
        let selected = Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let unselected = Style::default().fg(Color::Gray);
        let y = inner.y + inner.height.saturating_sub(1);
        let yes_style = if self.yes_selected { selected } else { unselected };
        let no_style = if self.yes_selected { unselected } else { selected };
        buf.set_string(inner.x + 2, y, "[ Yes ]", yes_style);
        buf.set_string(inner.x + 12, y, "[ No ]", no_style);
        Ok(())
    }
}
