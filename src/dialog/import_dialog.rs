use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Clear};
use std::path::PathBuf;

use crate::action::Action;
use crate::api::client::{IMPORT_EXTENSIONS, is_importable};
use crate::components::Component;

/// Path-entry dialog for data file import.
///
/// The extension gate runs here, before anything touches the network: a
/// path that is not `.csv`/`.xlsx`/`.xls` (case-insensitive) shows an
/// inline error and never becomes an action.
#[derive(Debug, Clone, Default)]
pub struct ImportDialog {
    path: String,
    error: Option<String>,
}

impl ImportDialog {
    pub fn new() -> Self {
        Self::default()
    }

    fn modal_area(area: Rect) -> Rect {
        let width = area.width.clamp(30, 64);
        let height = 7.min(area.height.max(7));
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

impl Component for ImportDialog {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }
        match key.code {
            KeyCode::Esc => return Ok(Some(Action::DialogClose)),
            KeyCode::Enter => {
                let trimmed = self.path.trim();
                if trimmed.is_empty() {
                    self.error = Some("Enter a file path".to_string());
                    return Ok(None);
                }
                let path = PathBuf::from(trimmed);
                if !is_importable(&path) {
                    self.error = Some(format!(
                        "File must be CSV or Excel ({})",
                        IMPORT_EXTENSIONS
                            .map(|e| format!(".{e}"))
                            .join(", ")
                    ));
                    return Ok(None);
                }
                return Ok(Some(Action::ImportPathChosen(path)));
            }
            KeyCode::Backspace => {
                self.path.pop();
                self.error = None;
            }
            KeyCode::Char(c)
                if key
                    .modifiers
                    .intersection(KeyModifiers::CONTROL | KeyModifiers::ALT)
                    .is_empty() =>
            {
                self.path.push(c);
                self.error = None;
            }
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let modal = Self::modal_area(area);
        frame.render_widget(Clear, modal);

        let block = Block::default()
            .title(" Import data file ")
            .borders(Borders::ALL)
            .border_type(BorderType::Double);
        let inner = block.inner(modal);
        frame.render_widget(block, modal);

        let buf = frame.buffer_mut();
        buf.set_string(
            inner.x + 1,
            inner.y,
            "Path to .csv / .xlsx / .xls:",
            Style::default().fg(Color::Gray),
        );

        let input = format!("{}_", self.path);
        let visible: String = input
            .chars()
            .rev()
            .take(inner.width.saturating_sub(2) as usize)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        buf.set_string(
            inner.x + 1,
            inner.y + 1,
            visible,
            Style::default().fg(Color::White),
        );

        if let Some(error) = &self.error {
            buf.set_string(
                inner.x + 1,
                inner.y + 3,
                error,
                Style::default().fg(Color::Red),
            );
        } else {
            buf.set_string(
                inner.x + 1,
                inner.y + 3,
                "Enter: upload  Esc: cancel",
                Style::default().fg(Color::Gray),
            );
        }
        Ok(())
    }
}
