//! TableView: the editable grid projection of the dataset.
//!
//! Renders the column registry as a header line, the row store as a
//! scrollable grid, and a persistent entry line for appending rows. All
//! table text is derived from the dataset on every draw; the view owns only
//! cursor position, scroll offsets, and in-flight edit buffers, so a
//! rejected or rolled-back edit "reverts" simply by being re-projected.

use crate::action::Action;
use crate::core::axes::trim_float;
use crate::core::dataset::{DATE_COLUMN, Dataset};
use crate::theme::Theme;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Row as TableRow, Table},
};
use std::collections::HashMap;

const MIN_COL_WIDTH: u16 = 8;
const MAX_COL_WIDTH: u16 = 20;

/// Where the cursor sits: the header line, a data cell, or the entry line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Header(usize),
    Cell { row: usize, col: usize },
    Entry(usize),
}

/// Open cell-edit buffer; discarded on cancel, emitted on commit.
#[derive(Debug, Clone, PartialEq)]
struct CellBuffer {
    row: usize,
    col: usize,
    text: String,
}

/// Explicit header-rename state machine.
///
/// `Committing` and `Reverting` exist as observable states rather than
/// being inferred from focus changes; the app moves the machine back to
/// `Viewing` once the rename has been applied or rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderEditState {
    Viewing,
    Editing { column: String, buffer: String },
    Committing { from: String, candidate: String },
    Reverting { column: String },
}

#[derive(Debug)]
pub struct TableView {
    pub cursor: Cursor,
    scroll_row: usize,
    scroll_col: usize,
    cell_edit: Option<CellBuffer>,
    header_edit: HeaderEditState,
    /// Raw entry-line text keyed by column name, so buffers follow their
    /// column through renames.
    entry: HashMap<String, String>,
}

impl Default for TableView {
    fn default() -> Self {
        Self {
            cursor: Cursor::Entry(0),
            scroll_row: 0,
            scroll_col: 0,
            cell_edit: None,
            header_edit: HeaderEditState::Viewing,
            entry: HashMap::new(),
        }
    }
}

impl TableView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_editing(&self) -> bool {
        self.cell_edit.is_some()
            || matches!(self.header_edit, HeaderEditState::Editing { .. })
    }

    pub fn header_edit_state(&self) -> &HeaderEditState {
        &self.header_edit
    }

    /// Called by the app once a commit has been applied (or rejected); the
    /// next draw re-projects whatever the dataset now says.
    pub fn end_header_edit(&mut self, renamed: bool) {
        if let HeaderEditState::Committing { from, .. } = &self.header_edit {
            self.header_edit = if renamed {
                HeaderEditState::Viewing
            } else {
                HeaderEditState::Reverting {
                    column: from.clone(),
                }
            };
        }
    }

    /// Reverting lasts exactly one frame: the old identifier is redisplayed,
    /// then the machine rests.
    fn settle_header_edit(&mut self) {
        if matches!(self.header_edit, HeaderEditState::Reverting { .. }) {
            self.header_edit = HeaderEditState::Viewing;
        }
    }

    /// Move an entry buffer with its renamed column.
    pub fn rename_entry_column(&mut self, from: &str, to: &str) {
        if let Some(text) = self.entry.remove(from) {
            self.entry.insert(to.to_string(), text);
        }
    }

    pub fn clear_entry(&mut self) {
        self.entry.clear();
    }

    /// Clamp cursor and scroll state after any structural change.
    pub fn sync_with(&mut self, dataset: &Dataset) {
        let cols = dataset.columns().len();
        let rows = dataset.len();
        self.cursor = match self.cursor {
            Cursor::Header(c) => Cursor::Header(c.min(cols.saturating_sub(1))),
            Cursor::Cell { .. } if rows == 0 => Cursor::Entry(0),
            Cursor::Cell { row, col } => Cursor::Cell {
                row: row.min(rows - 1),
                col: col.min(cols.saturating_sub(1)),
            },
            Cursor::Entry(c) => Cursor::Entry(c.min(cols.saturating_sub(1))),
        };
        if let Some(edit) = &self.cell_edit {
            if edit.row >= rows || edit.col >= cols {
                self.cell_edit = None;
            }
        }
        self.entry.retain(|column, _| dataset.has_column(column));
    }

    fn display_value(dataset: &Dataset, row: usize, col: usize) -> String {
        let Some(record) = dataset.rows().get(row) else {
            return String::new();
        };
        let column = &dataset.columns()[col];
        if column == DATE_COLUMN {
            record.date.format("%Y-%m-%d").to_string()
        } else {
            record.value(column).map(trim_float).unwrap_or_default()
        }
    }

    fn entry_text(&self, column: &str) -> &str {
        self.entry.get(column).map(String::as_str).unwrap_or("")
    }

    /// Collect the entry line for submission: the raw date plus one raw
    /// string per value column.
    fn take_entry_action(&self, dataset: &Dataset) -> Action {
        let entries = dataset
            .value_columns()
            .iter()
            .map(|c| (c.clone(), self.entry_text(c).to_string()))
            .collect();
        Action::SubmitEntryRow {
            date: self.entry_text(DATE_COLUMN).to_string(),
            entries,
        }
    }

    pub fn handle_key_event(
        &mut self,
        key: KeyEvent,
        dataset: &Dataset,
    ) -> Result<Option<Action>> {
        self.sync_with(dataset);

        // An open cell edit captures everything except control chords
        if self.cell_edit.is_some() {
            return Ok(self.handle_cell_edit_key(key, dataset));
        }
        if matches!(self.header_edit, HeaderEditState::Editing { .. }) {
            return Ok(self.handle_header_edit_key(key));
        }

        let cols = dataset.columns().len();
        let rows = dataset.len();
        match key.code {
            KeyCode::Up => self.move_vertical(-1, rows),
            KeyCode::Down => self.move_vertical(1, rows),
            KeyCode::Left => self.move_horizontal(-1, cols),
            KeyCode::Right => self.move_horizontal(1, cols),
            KeyCode::Home => self.move_horizontal(isize::MIN, cols),
            KeyCode::End => self.move_horizontal(isize::MAX, cols),
            KeyCode::PageUp => {
                for _ in 0..10 {
                    self.move_vertical(-1, rows);
                }
            }
            KeyCode::PageDown => {
                for _ in 0..10 {
                    self.move_vertical(1, rows);
                }
            }
            KeyCode::Enter => return Ok(self.begin_or_submit(dataset, None)),
            KeyCode::Char(c) if key.modifiers.intersection(KeyModifiers::CONTROL | KeyModifiers::ALT).is_empty() => {
                return Ok(self.begin_or_submit(dataset, Some(c)));
            }
            KeyCode::Backspace => {
                if let Cursor::Entry(col) = self.cursor {
                    let column = dataset.columns()[col].clone();
                    if let Some(text) = self.entry.get_mut(&column) {
                        text.pop();
                    }
                }
            }
            _ => {}
        }
        Ok(None)
    }

    /// Enter or a typed character on the current cursor position.
    fn begin_or_submit(&mut self, dataset: &Dataset, typed: Option<char>) -> Option<Action> {
        match self.cursor {
            Cursor::Header(col) => {
                let column = dataset.columns()[col].clone();
                // Date is immutable; refuse to even open the editor
                if typed.is_none() && column != DATE_COLUMN {
                    self.header_edit = HeaderEditState::Editing {
                        buffer: column.clone(),
                        column,
                    };
                }
                None
            }
            Cursor::Cell { row, col } => {
                let text = match typed {
                    Some(c) => c.to_string(),
                    None => Self::display_value(dataset, row, col),
                };
                self.cell_edit = Some(CellBuffer { row, col, text });
                None
            }
            Cursor::Entry(col) => match typed {
                Some(c) => {
                    let column = dataset.columns()[col].clone();
                    self.entry.entry(column).or_default().push(c);
                    None
                }
                None => Some(self.take_entry_action(dataset)),
            },
        }
    }

    fn handle_cell_edit_key(&mut self, key: KeyEvent, dataset: &Dataset) -> Option<Action> {
        let Some(edit) = &mut self.cell_edit else {
            return None;
        };
        match key.code {
            KeyCode::Esc => {
                self.cell_edit = None;
                None
            }
            KeyCode::Enter => {
                let edit = self.cell_edit.take()?;
                let column = dataset.columns()[edit.col].clone();
                // Unchanged text commits nothing
                if edit.text == Self::display_value(dataset, edit.row, edit.col) {
                    return None;
                }
                Some(Action::CommitCellEdit {
                    row: edit.row,
                    column,
                    input: edit.text,
                })
            }
            KeyCode::Backspace => {
                edit.text.pop();
                None
            }
            KeyCode::Char(c)
                if key
                    .modifiers
                    .intersection(KeyModifiers::CONTROL | KeyModifiers::ALT)
                    .is_empty() =>
            {
                edit.text.push(c);
                None
            }
            _ => None,
        }
    }

    fn handle_header_edit_key(&mut self, key: KeyEvent) -> Option<Action> {
        let HeaderEditState::Editing { column, buffer } = &mut self.header_edit else {
            return None;
        };
        match key.code {
            KeyCode::Esc => {
                let column = column.clone();
                self.header_edit = HeaderEditState::Reverting { column };
                None
            }
            KeyCode::Enter => {
                let from = column.clone();
                let candidate = buffer.trim().to_string();
                self.header_edit = HeaderEditState::Committing {
                    from: from.clone(),
                    candidate: candidate.clone(),
                };
                Some(Action::CommitHeaderRename { from, candidate })
            }
            KeyCode::Backspace => {
                buffer.pop();
                None
            }
            KeyCode::Char(c)
                if key
                    .modifiers
                    .intersection(KeyModifiers::CONTROL | KeyModifiers::ALT)
                    .is_empty() =>
            {
                buffer.push(c);
                None
            }
            _ => None,
        }
    }

    fn move_vertical(&mut self, delta: isize, rows: usize) {
        self.cursor = match (self.cursor, delta) {
            (Cursor::Header(c), d) if d > 0 => {
                if rows > 0 {
                    Cursor::Cell { row: 0, col: c }
                } else {
                    Cursor::Entry(c)
                }
            }
            (Cursor::Header(c), _) => Cursor::Header(c),
            (Cursor::Cell { row, col }, d) if d < 0 => {
                if row == 0 {
                    Cursor::Header(col)
                } else {
                    Cursor::Cell { row: row - 1, col }
                }
            }
            (Cursor::Cell { row, col }, _) => {
                if row + 1 >= rows {
                    Cursor::Entry(col)
                } else {
                    Cursor::Cell { row: row + 1, col }
                }
            }
            (Cursor::Entry(c), d) if d < 0 => {
                if rows > 0 {
                    Cursor::Cell {
                        row: rows - 1,
                        col: c,
                    }
                } else {
                    Cursor::Header(c)
                }
            }
            (Cursor::Entry(c), _) => Cursor::Entry(c),
        };
    }

    fn move_horizontal(&mut self, delta: isize, cols: usize) {
        let clamp = |c: usize| -> usize {
            match delta {
                isize::MIN => 0,
                isize::MAX => cols.saturating_sub(1),
                d if d < 0 => c.saturating_sub(1),
                _ => (c + 1).min(cols.saturating_sub(1)),
            }
        };
        self.cursor = match self.cursor {
            Cursor::Header(c) => Cursor::Header(clamp(c)),
            Cursor::Cell { row, col } => Cursor::Cell {
                row,
                col: clamp(col),
            },
            Cursor::Entry(c) => Cursor::Entry(clamp(c)),
        };
    }

    fn column_width(name: &str) -> u16 {
        (name.chars().count() as u16 + 2).clamp(MIN_COL_WIDTH, MAX_COL_WIDTH)
    }

    /// First visible column and how many fit, keeping the cursor on screen.
    fn visible_columns(&mut self, dataset: &Dataset, width: u16) -> (usize, usize) {
        let columns = dataset.columns();
        let cursor_col = match self.cursor {
            Cursor::Header(c) | Cursor::Entry(c) => c,
            Cursor::Cell { col, .. } => col,
        };
        if cursor_col < self.scroll_col {
            self.scroll_col = cursor_col;
        }
        loop {
            let mut used = 0u16;
            let mut count = 0usize;
            for name in &columns[self.scroll_col..] {
                let w = Self::column_width(name) + 1;
                if used + w > width {
                    break;
                }
                used += w;
                count += 1;
            }
            let count = count.max(1);
            if cursor_col < self.scroll_col + count || self.scroll_col + 1 >= columns.len() {
                return (self.scroll_col, count);
            }
            self.scroll_col += 1;
        }
    }

    pub fn draw(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        dataset: &Dataset,
        theme: &Theme,
        focused: bool,
    ) {
        self.sync_with(dataset);

        let title = format!(" Data Table ({} rows) ", dataset.len());
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(theme.border_style(focused));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height < 3 {
            return;
        }

        let (col_start, col_count) = self.visible_columns(dataset, inner.width);
        let columns = &dataset.columns()[col_start..col_start + col_count];

        // Header + entry line take one row each
        let body_height = inner.height.saturating_sub(2) as usize;
        let cursor_row = match self.cursor {
            Cursor::Cell { row, .. } => Some(row),
            _ => None,
        };
        if let Some(row) = cursor_row {
            if row < self.scroll_row {
                self.scroll_row = row;
            } else if body_height > 0 && row >= self.scroll_row + body_height {
                self.scroll_row = row + 1 - body_height;
            }
        }
        let row_end = (self.scroll_row + body_height).min(dataset.len());

        let header_cells: Vec<Cell> = columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let col = col_start + i;
                let (text, style) = self.header_cell_text(name, col, theme);
                Cell::from(text).style(style)
            })
            .collect();
        let header = TableRow::new(header_cells).height(1);

        let mut body: Vec<TableRow> = Vec::with_capacity(row_end - self.scroll_row + 1);
        for row in self.scroll_row..row_end {
            let cells: Vec<Cell> = columns
                .iter()
                .enumerate()
                .map(|(i, _)| {
                    let col = col_start + i;
                    let (text, style) = self.data_cell_text(dataset, row, col, theme);
                    Cell::from(text).style(style)
                })
                .collect();
            body.push(TableRow::new(cells).height(1));
        }

        let entry_cells: Vec<Cell> = columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let col = col_start + i;
                let selected = self.cursor == Cursor::Entry(col);
                let text = self.entry_text(name);
                let display = if text.is_empty() && !selected {
                    if name == DATE_COLUMN {
                        "(today)".to_string()
                    } else {
                        "+".to_string()
                    }
                } else {
                    text.to_string()
                };
                let style = if selected && focused {
                    theme.editing_style()
                } else {
                    theme.entry_style()
                };
                Cell::from(display).style(style)
            })
            .collect();
        body.push(TableRow::new(entry_cells).height(1));

        let widths: Vec<Constraint> = columns
            .iter()
            .map(|name| Constraint::Length(Self::column_width(name)))
            .collect();
        let table = Table::new(body, widths).header(header).column_spacing(1);
        frame.render_widget(table, inner);
        self.settle_header_edit();
    }

    fn header_cell_text(&self, name: &str, col: usize, theme: &Theme) -> (String, Style) {
        match &self.header_edit {
            HeaderEditState::Editing { column, buffer } if column == name => {
                return (format!("{buffer}_"), theme.editing_style());
            }
            HeaderEditState::Committing { from, candidate } if from == name => {
                return (candidate.clone(), theme.editing_style());
            }
            _ => {}
        }
        let style = if self.cursor == Cursor::Header(col) {
            theme.selected_style()
        } else {
            theme.header_style()
        };
        (name.to_string(), style)
    }

    fn data_cell_text(
        &self,
        dataset: &Dataset,
        row: usize,
        col: usize,
        theme: &Theme,
    ) -> (String, Style) {
        if let Some(edit) = &self.cell_edit {
            if edit.row == row && edit.col == col {
                return (format!("{}_", edit.text), theme.editing_style());
            }
        }
        let style = if self.cursor == (Cursor::Cell { row, col }) {
            theme.selected_style()
        } else {
            theme.normal_style()
        };
        (Self::display_value(dataset, row, col), style)
    }

    /// Footer hint for the app's status line.
    pub fn hint(&self) -> Line<'static> {
        let text = if self.is_editing() {
            "enter: commit  esc: cancel"
        } else {
            "arrows: move  enter: edit/submit  type in entry line to add a row"
        };
        Line::from(Span::raw(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap as StdHashMap;

    fn dataset() -> Dataset {
        let mut ds = Dataset::default();
        let mut entries = StdHashMap::new();
        entries.insert("Variable 1".to_string(), "1".to_string());
        entries.insert("Variable 2".to_string(), "2".to_string());
        ds.add_row("2024-01-01", &entries).unwrap();
        ds.add_row("2024-01-02", &entries).unwrap();
        ds
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn cursor_walks_header_grid_and_entry() {
        let ds = dataset();
        let mut view = TableView::new();
        view.cursor = Cursor::Header(0);

        view.handle_key_event(key(KeyCode::Down), &ds).unwrap();
        assert_eq!(view.cursor, Cursor::Cell { row: 0, col: 0 });
        view.handle_key_event(key(KeyCode::Down), &ds).unwrap();
        view.handle_key_event(key(KeyCode::Down), &ds).unwrap();
        assert_eq!(view.cursor, Cursor::Entry(0));
        view.handle_key_event(key(KeyCode::Up), &ds).unwrap();
        assert_eq!(view.cursor, Cursor::Cell { row: 1, col: 0 });
        view.handle_key_event(key(KeyCode::Right), &ds).unwrap();
        assert_eq!(view.cursor, Cursor::Cell { row: 1, col: 1 });
    }

    #[test]
    fn typing_on_a_cell_opens_an_edit_buffer_seeded_with_the_char() {
        let ds = dataset();
        let mut view = TableView::new();
        view.cursor = Cursor::Cell { row: 0, col: 1 };

        let action = view
            .handle_key_event(key(KeyCode::Char('7')), &ds)
            .unwrap();
        assert_eq!(action, None);
        assert!(view.is_editing());

        let action = view.handle_key_event(key(KeyCode::Enter), &ds).unwrap();
        assert_eq!(
            action,
            Some(Action::CommitCellEdit {
                row: 0,
                column: "Variable 1".to_string(),
                input: "7".to_string(),
            })
        );
        assert!(!view.is_editing());
    }

    #[test]
    fn escape_discards_an_open_cell_edit() {
        let ds = dataset();
        let mut view = TableView::new();
        view.cursor = Cursor::Cell { row: 0, col: 1 };
        view.handle_key_event(key(KeyCode::Char('9')), &ds).unwrap();
        let action = view.handle_key_event(key(KeyCode::Esc), &ds).unwrap();
        assert_eq!(action, None);
        assert!(!view.is_editing());
    }

    #[test]
    fn committing_unchanged_text_is_a_no_op() {
        let ds = dataset();
        let mut view = TableView::new();
        view.cursor = Cursor::Cell { row: 0, col: 0 };
        // Open with Enter: buffer starts as the current display text
        view.handle_key_event(key(KeyCode::Enter), &ds).unwrap();
        let action = view.handle_key_event(key(KeyCode::Enter), &ds).unwrap();
        assert_eq!(action, None);
    }

    #[test]
    fn header_rename_walks_the_state_machine() {
        let ds = dataset();
        let mut view = TableView::new();
        view.cursor = Cursor::Header(1);

        view.handle_key_event(key(KeyCode::Enter), &ds).unwrap();
        assert!(matches!(
            view.header_edit_state(),
            HeaderEditState::Editing { .. }
        ));

        for c in "x".chars() {
            view.handle_key_event(key(KeyCode::Char(c)), &ds).unwrap();
        }
        let action = view.handle_key_event(key(KeyCode::Enter), &ds).unwrap();
        assert_eq!(
            action,
            Some(Action::CommitHeaderRename {
                from: "Variable 1".to_string(),
                candidate: "Variable 1x".to_string(),
            })
        );
        assert!(matches!(
            view.header_edit_state(),
            HeaderEditState::Committing { .. }
        ));

        view.end_header_edit(true);
        assert_eq!(*view.header_edit_state(), HeaderEditState::Viewing);
    }

    #[test]
    fn rejected_rename_passes_through_reverting() {
        let ds = dataset();
        let mut view = TableView::new();
        view.cursor = Cursor::Header(1);
        view.handle_key_event(key(KeyCode::Enter), &ds).unwrap();
        // Wipe the buffer so the candidate is empty (a guaranteed rejection)
        for _ in 0..20 {
            view.handle_key_event(key(KeyCode::Backspace), &ds).unwrap();
        }
        let action = view.handle_key_event(key(KeyCode::Enter), &ds).unwrap();
        assert_eq!(
            action,
            Some(Action::CommitHeaderRename {
                from: "Variable 1".to_string(),
                candidate: String::new(),
            })
        );

        view.end_header_edit(false);
        assert!(matches!(
            view.header_edit_state(),
            HeaderEditState::Reverting { .. }
        ));
        view.settle_header_edit();
        assert_eq!(*view.header_edit_state(), HeaderEditState::Viewing);
    }

    #[test]
    fn date_header_never_opens_an_editor() {
        let ds = dataset();
        let mut view = TableView::new();
        view.cursor = Cursor::Header(0);
        view.handle_key_event(key(KeyCode::Enter), &ds).unwrap();
        assert_eq!(*view.header_edit_state(), HeaderEditState::Viewing);
    }

    #[test]
    fn entry_line_collects_one_raw_value_per_value_column() {
        let ds = dataset();
        let mut view = TableView::new();

        view.cursor = Cursor::Entry(1);
        for c in "3.5".chars() {
            view.handle_key_event(key(KeyCode::Char(c)), &ds).unwrap();
        }
        view.cursor = Cursor::Entry(0);
        for c in "2024-02-01".chars() {
            view.handle_key_event(key(KeyCode::Char(c)), &ds).unwrap();
        }

        let action = view.handle_key_event(key(KeyCode::Enter), &ds).unwrap();
        assert_eq!(
            action,
            Some(Action::SubmitEntryRow {
                date: "2024-02-01".to_string(),
                entries: vec![
                    ("Variable 1".to_string(), "3.5".to_string()),
                    ("Variable 2".to_string(), String::new()),
                ],
            })
        );

        view.clear_entry();
        assert_eq!(view.entry_text("Variable 1"), "");
    }

    #[test]
    fn entry_buffers_follow_a_renamed_column() {
        let ds = dataset();
        let mut view = TableView::new();
        view.cursor = Cursor::Entry(1);
        view.handle_key_event(key(KeyCode::Char('5')), &ds).unwrap();

        view.rename_entry_column("Variable 1", "Temp");
        assert_eq!(view.entry_text("Temp"), "5");
        assert_eq!(view.entry_text("Variable 1"), "");
    }

    #[test]
    fn sync_clamps_the_cursor_after_shrinking() {
        let ds = dataset();
        let mut view = TableView::new();
        view.cursor = Cursor::Cell { row: 10, col: 10 };
        view.sync_with(&ds);
        assert_eq!(view.cursor, Cursor::Cell { row: 1, col: 2 });

        let empty = Dataset::default();
        view.sync_with(&empty);
        assert_eq!(view.cursor, Cursor::Entry(0));
    }
}
