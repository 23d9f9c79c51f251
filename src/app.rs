//! Application state and the action loop.
//!
//! `App` owns the one authoritative copy of the table (dataset + axis
//! selections); every panel draws from it and every mutation runs through
//! [`App::dispatch`]. Mutations update local state first (optimistic),
//! enqueue a sync job, and the three panels are simply re-projected on the
//! next frame — there is no other channel through which table structure can
//! change.

use crate::action::Action;
use crate::api::types::dataset_to_wire;
use crate::api::{Backend, CorrelationRequest, row_to_wire};
use crate::components::{ChartView, Component, CorrelationView, TableView};
use crate::config::{Config, Mode};
use crate::core::axes::{AxisSelection, PlotSeries, plot_series};
use crate::core::correlate::{all_pairs, extract_numeric, plotted_pairs};
use crate::core::dataset::{DATE_COLUMN, Dataset};
use crate::core::PairOutcome;
use crate::dialog::{ConfirmDialog, ImportDialog, MessageDialog};
use crate::sync::{LoadOrigin, SyncHandle, SyncOutcome, SyncTask, SyncWorker, TaskKind, sync_channel};
use crate::theme::Theme;
use crate::tui::{Event, Tui};
use color_eyre::Result;
use crossterm::event::{KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    text::Line,
    widgets::Paragraph,
};
use std::path::PathBuf;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, warn};

const DISCLAIMER: &str = "This tool stores your table on the configured data \
service and sends column vectors there for correlation analysis. Statistical \
output is descriptive, not advice.";

/// Which panel has keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Table,
    Chart,
    Correlation,
}

impl Panel {
    fn mode(self) -> Mode {
        match self {
            Panel::Table => Mode::Table,
            Panel::Chart => Mode::Chart,
            Panel::Correlation => Mode::Correlation,
        }
    }

    fn next(self) -> Self {
        match self {
            Panel::Table => Panel::Chart,
            Panel::Chart => Panel::Correlation,
            Panel::Correlation => Panel::Table,
        }
    }

    fn prev(self) -> Self {
        self.next().next()
    }
}

pub struct App<B: Backend> {
    config: Config,
    config_path: Option<PathBuf>,
    theme: Theme,
    backend: B,

    dataset: Dataset,
    axes: AxisSelection,
    series: PlotSeries,

    focus: Panel,
    table_view: TableView,
    chart_view: ChartView,
    correlation_view: CorrelationView,
    confirm_dialog: Option<ConfirmDialog>,
    message_dialog: Option<MessageDialog>,
    import_dialog: Option<ImportDialog>,

    sync: SyncHandle,
    action_tx: UnboundedSender<Action>,
    /// Taken by `run`; `Some` only before the loop starts (and in tests).
    action_rx: Option<UnboundedReceiver<Action>>,

    auth_email: Option<String>,
    should_quit: bool,
    should_render: bool,
}

impl<B: Backend> App<B> {
    /// Build the app and start its sync worker on the current runtime.
    pub fn new(config: Config, config_path: Option<PathBuf>, backend: B) -> Self {
        let (sync, jobs) = sync_channel();
        let (action_tx, action_rx) = unbounded_channel();
        tokio::spawn(SyncWorker::new(backend.clone(), jobs, action_tx.clone()).run());

        let dataset = Dataset::default();
        let axes = AxisSelection::resolve(dataset.columns(), None);
        let series = plot_series(&dataset, &axes);

        Self {
            config,
            config_path,
            theme: Theme::default(),
            backend,
            dataset,
            axes,
            series,
            focus: Panel::Table,
            table_view: TableView::new(),
            chart_view: ChartView::new(),
            correlation_view: CorrelationView::new(),
            confirm_dialog: None,
            message_dialog: None,
            import_dialog: None,
            sync,
            action_tx,
            action_rx: Some(action_rx),
            auth_email: None,
            should_quit: false,
            should_render: true,
        }
    }

    pub async fn run(&mut self, tui: &mut Tui) -> Result<()> {
        let Some(mut action_rx) = self.action_rx.take() else {
            return Err(color_eyre::eyre::eyre!("app is already running"));
        };
        tui.enter()?;

        self.sync.enqueue(SyncTask::Refresh);
        self.spawn_auth_probe();
        if !self.config.disclaimer_acknowledged {
            self.message_dialog = Some(
                MessageDialog::with_title(DISCLAIMER, "Before you start")
                    .on_close(Action::AcknowledgeDisclaimer),
            );
        }

        while !self.should_quit {
            tokio::select! {
                maybe_event = tui.next_event() => {
                    match maybe_event {
                        Some(event) => self.handle_event(event)?,
                        None => break,
                    }
                }
                Some(action) = action_rx.recv() => self.dispatch(action)?,
            }
            // Drain whatever else queued up before rendering
            while let Ok(action) = action_rx.try_recv() {
                self.dispatch(action)?;
            }
            if self.should_render {
                self.should_render = false;
                tui.draw(|frame| self.draw(frame))?;
            }
        }

        tui.exit()
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Init | Event::Tick | Event::Mouse(_) => {}
            Event::Render | Event::Resize(_, _) => self.should_render = true,
            Event::Error(e) => self.dispatch(Action::Error(e))?,
            Event::Key(key) => {
                if let Some(action) = self.action_for_key(key)? {
                    self.dispatch(action)?;
                }
            }
        }
        Ok(())
    }

    /// Route a key press: dialogs first, then an open edit, then the
    /// keybinding maps, then the focused panel.
    fn action_for_key(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if let Some(dialog) = &mut self.message_dialog {
            return dialog.handle_key_event(key);
        }
        if let Some(dialog) = &mut self.confirm_dialog {
            return dialog.handle_key_event(key);
        }
        if let Some(dialog) = &mut self.import_dialog {
            return dialog.handle_key_event(key);
        }

        // An open edit owns the keyboard, apart from control chords
        let editing = self.focus == Panel::Table && self.table_view.is_editing();
        if editing && !key.modifiers.contains(KeyModifiers::CONTROL) {
            return self.table_view.handle_key_event(key, &self.dataset);
        }

        if let Some(action) = self.config.action_for_key(Mode::Global, key) {
            return Ok(Some(action));
        }
        if let Some(action) = self.config.action_for_key(self.focus.mode(), key) {
            return Ok(Some(action));
        }

        match self.focus {
            Panel::Table => self.table_view.handle_key_event(key, &self.dataset),
            Panel::Chart => self
                .chart_view
                .handle_key_event(key, &self.dataset, &self.axes),
            Panel::Correlation => {
                self.correlation_view.handle_key_event(key)?;
                Ok(None)
            }
        }
    }

    pub fn dispatch(&mut self, action: Action) -> Result<()> {
        // Anything that reaches dispatch is worth a redraw
        self.should_render = true;
        match action {
            Action::Tick | Action::Render | Action::Resize(_, _) | Action::Resume => {}
            Action::Quit | Action::Suspend => self.should_quit = true,
            Action::Error(message) => {
                warn!("{message}");
                self.message_dialog = Some(MessageDialog::error(message));
            }
            Action::Help => self.open_help(),
            Action::DialogClose => {
                self.message_dialog = None;
                self.confirm_dialog = None;
                self.import_dialog = None;
            }
            Action::NextPanel => self.focus = self.focus.next(),
            Action::PrevPanel => self.focus = self.focus.prev(),
            Action::Refresh => {
                self.sync.enqueue(SyncTask::Refresh);
            }
            Action::AddColumn => self.add_column(),
            Action::OpenImportDialog => self.import_dialog = Some(ImportDialog::new()),
            Action::RequestClearData => {
                self.confirm_dialog = Some(ConfirmDialog::new(
                    "Clear data",
                    "Delete every row from the table? This cannot be undone.",
                    Action::ClearData,
                ));
            }
            Action::RequestResetTable => {
                self.confirm_dialog = Some(ConfirmDialog::new(
                    "Reset table",
                    "Reset the table to its default columns, discarding all data?",
                    Action::ResetTable,
                ));
            }
            Action::ClearData => {
                self.sync.enqueue(SyncTask::ClearThenRefetch);
            }
            Action::ResetTable => {
                self.sync.enqueue(SyncTask::ResetThenRefetch);
            }
            Action::Confirmed(inner) => {
                self.confirm_dialog = None;
                self.dispatch(*inner)?;
            }
            Action::CalculatePlotted => self.calculate_plotted(),
            Action::CalculateAllCorrelations => self.calculate_all(),
            Action::Logout => self.logout(),
            Action::CommitCellEdit { row, column, input } => {
                self.commit_cell_edit(row, &column, &input);
            }
            Action::SubmitEntryRow { date, entries } => {
                self.submit_entry_row(&date, entries);
            }
            Action::CommitHeaderRename { from, candidate } => {
                self.commit_header_rename(&from, &candidate);
            }
            Action::AxisSelected { axis, column } => {
                self.axes.set(axis, column);
                self.replot();
            }
            Action::ImportPathChosen(path) => {
                self.import_dialog = None;
                self.sync.enqueue(SyncTask::Import { path });
            }
            Action::Sync { id, outcome } => {
                debug!("sync job {id} resolved");
                self.apply_sync_outcome(outcome);
            }
            Action::PlottedPairResult { x, y, outcome } => {
                self.correlation_view.record_plotted(&x, &y, outcome);
            }
            Action::MatrixPairResult { x, y, outcome } => {
                self.correlation_view.record_matrix(&x, &y, outcome);
            }
            Action::AuthStatusResolved {
                authenticated,
                email,
            } => {
                self.auth_email = if authenticated { email } else { None };
            }
            Action::AcknowledgeDisclaimer => {
                self.message_dialog = None;
                self.config.disclaimer_acknowledged = true;
                if let Err(e) = Config::persist_disclaimer_ack(self.config_path.as_ref()) {
                    warn!("could not persist disclaimer acknowledgement: {e}");
                }
            }
        }
        Ok(())
    }

    /// Re-derive the chart projection. Called after every mutation that can
    /// move a point.
    fn replot(&mut self) {
        self.series = plot_series(&self.dataset, &self.axes);
    }

    /// Re-resolve axis pointers against the (possibly reshaped) registry,
    /// keeping current choices where still valid.
    fn resolve_axes(&mut self) {
        self.axes = AxisSelection::resolve(self.dataset.columns(), Some(&self.axes));
    }

    fn add_column(&mut self) {
        let name = self.dataset.add_column();
        info!("added column '{name}'");
        self.table_view.sync_with(&self.dataset);
        self.resolve_axes();
        self.replot();
        self.sync.enqueue(SyncTask::ReplaceData {
            rows: dataset_to_wire(&self.dataset),
            rollback: None,
        });
    }

    fn commit_cell_edit(&mut self, row: usize, column: &str, input: &str) {
        match self.dataset.set_cell(row, column, input) {
            Ok(edit) => {
                self.replot();
                self.sync.enqueue(SyncTask::ReplaceData {
                    rows: dataset_to_wire(&self.dataset),
                    rollback: Some(edit),
                });
            }
            Err(e) => {
                // Validation rejection: no backend call, the grid simply
                // re-projects the last known-good value
                debug!("cell edit rejected: {e}");
            }
        }
    }

    fn submit_entry_row(&mut self, date: &str, entries: Vec<(String, String)>) {
        let entries: std::collections::HashMap<String, String> =
            entries.into_iter().collect();
        match self.dataset.add_row(date, &entries) {
            Ok(()) => {
                self.table_view.clear_entry();
                self.table_view.sync_with(&self.dataset);
                self.replot();
                if let Some(row) = self.dataset.rows().last() {
                    self.sync.enqueue(SyncTask::AddRow {
                        row: row_to_wire(self.dataset.columns(), row),
                    });
                }
            }
            Err(e) => {
                self.message_dialog = Some(MessageDialog::error(e.to_string()));
            }
        }
    }

    fn commit_header_rename(&mut self, from: &str, candidate: &str) {
        use crate::core::RenameOutcome;
        match self.dataset.rename_column(from, candidate) {
            Ok(RenameOutcome::Renamed { from, to }) => {
                info!("renamed column '{from}' -> '{to}'");
                let repointed = self.axes.repoint(&from, &to);
                self.table_view.rename_entry_column(&from, &to);
                self.table_view.end_header_edit(true);
                if repointed {
                    self.replot();
                }
                // Fire-and-forget: a failure is logged, not rolled back
                self.sync.enqueue(SyncTask::ReplaceData {
                    rows: dataset_to_wire(&self.dataset),
                    rollback: None,
                });
            }
            Ok(RenameOutcome::Unchanged) => {
                self.table_view.end_header_edit(false);
            }
            Err(e) => {
                debug!("rename rejected: {e}");
                self.table_view.end_header_edit(false);
            }
        }
    }

    fn apply_sync_outcome(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::TableLoaded { table, origin } => {
                if let Err(e) = self.dataset.replace_all(table.columns, table.rows) {
                    self.message_dialog = Some(MessageDialog::error(format!(
                        "Backend sent an inconsistent table: {e}"
                    )));
                    return;
                }
                self.table_view.sync_with(&self.dataset);
                self.resolve_axes();
                self.replot();
                match origin {
                    LoadOrigin::Import { message } => {
                        self.message_dialog =
                            Some(MessageDialog::with_title(message, "Import"));
                    }
                    LoadOrigin::Hydrate => debug!("hydrated {} rows", self.dataset.len()),
                    LoadOrigin::Clear | LoadOrigin::Reset => {
                        info!("table structure refetched after clear/reset");
                    }
                }
            }
            SyncOutcome::RowAdded | SyncOutcome::Replaced => {}
            SyncOutcome::Failed {
                kind,
                error,
                rollback,
            } => {
                match (kind, rollback) {
                    (TaskKind::ReplaceData, Some(edit)) => {
                        // Optimistic cell edit the backend refused: put the
                        // previous value back and tell the user
                        if let Err(e) = self.dataset.revert_cell(&edit) {
                            warn!("rollback failed: {e}");
                        }
                        self.replot();
                        self.message_dialog = Some(MessageDialog::error(format!(
                            "Edit was not saved: {error}"
                        )));
                    }
                    (TaskKind::AddRow | TaskKind::ReplaceData, _) => {
                        // Accepted divergence: optimistic state stays
                        warn!("{kind:?} not persisted: {error}");
                    }
                    _ => {
                        self.message_dialog = Some(MessageDialog::error(error));
                    }
                }
            }
        }
    }

    fn calculate_plotted(&mut self) {
        self.focus = Panel::Correlation;
        if self.dataset.is_empty() {
            self.correlation_view
                .set_notice("No data available for correlation analysis — add rows first");
            return;
        }
        let pairs = plotted_pairs(&self.axes);
        for (a, b) in &pairs {
            for column in [a, b] {
                let (_, all_valid) = extract_numeric(&self.dataset, column);
                if !all_valid {
                    self.correlation_view.set_notice(format!(
                        "Column '{column}' has non-numeric values; fix it before correlating"
                    ));
                    return;
                }
            }
        }
        self.correlation_view.begin_plotted(pairs.clone());
        for (x, y) in pairs {
            self.spawn_pair_request(x, y, false);
        }
    }

    fn calculate_all(&mut self) {
        self.focus = Panel::Correlation;
        if self.dataset.is_empty() {
            self.correlation_view
                .set_notice("No data available for correlation analysis — add rows first");
            return;
        }
        let columns = self.dataset.columns().to_vec();
        self.correlation_view.begin_matrix(columns.clone());
        for (x, y) in all_pairs(&columns) {
            self.spawn_pair_request(x, y, true);
        }
    }

    /// One backend request per pair, in parallel; each outcome lands as its
    /// own action so pairs render independently.
    fn spawn_pair_request(&self, x: String, y: String, for_matrix: bool) {
        let (x_values, _) = extract_numeric(&self.dataset, &x);
        let (y_values, _) = extract_numeric(&self.dataset, &y);
        let request = CorrelationRequest {
            x_values,
            y_values,
            x_axis: x.clone(),
            y_axis: y.clone(),
            is_date_x: x == DATE_COLUMN,
            is_date_y: y == DATE_COLUMN,
        };
        let backend = self.backend.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let outcome = match backend.correlation(request).await {
                Ok(outcome) => outcome,
                Err(e) => PairOutcome::Failed(e.to_string()),
            };
            let action = if for_matrix {
                Action::MatrixPairResult { x, y, outcome }
            } else {
                Action::PlottedPairResult { x, y, outcome }
            };
            let _ = tx.send(action);
        });
    }

    fn spawn_auth_probe(&self) {
        let backend = self.backend.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            match backend.auth_status().await {
                Ok(status) => {
                    let _ = tx.send(Action::AuthStatusResolved {
                        authenticated: status.authenticated,
                        email: status.email,
                    });
                }
                Err(e) => warn!("auth probe failed: {e}"),
            }
        });
    }

    fn logout(&mut self) {
        let backend = self.backend.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = backend.logout().await {
                warn!("logout failed: {e}");
            }
            let _ = tx.send(Action::Quit);
        });
    }

    fn open_help(&mut self) {
        let text = self.config.hint_line(&[
            (Mode::Global, Action::NextPanel, "switch panel"),
            (Mode::Global, Action::Refresh, "refresh"),
            (Mode::Table, Action::AddColumn, "add column"),
            (Mode::Table, Action::OpenImportDialog, "import file"),
            (Mode::Table, Action::RequestClearData, "clear data"),
            (Mode::Table, Action::RequestResetTable, "reset table"),
            (Mode::Correlation, Action::CalculatePlotted, "correlate plotted"),
            (
                Mode::Correlation,
                Action::CalculateAllCorrelations,
                "correlate all",
            ),
            (Mode::Global, Action::Logout, "logout"),
            (Mode::Global, Action::Quit, "quit"),
        ]);
        self.message_dialog = Some(MessageDialog::with_title(text, "Keys"));
    }

    fn draw(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let account = self
            .auth_email
            .as_deref()
            .unwrap_or("offline");
        let status = format!(" trendtui — {account}");
        frame.render_widget(
            Paragraph::new(status).style(self.theme.header_style()),
            chunks[0],
        );

        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(main[1]);

        self.table_view.draw(
            frame,
            main[0],
            &self.dataset,
            &self.theme,
            self.focus == Panel::Table,
        );
        self.chart_view.draw(
            frame,
            right[0],
            &self.series,
            &self.theme,
            self.focus == Panel::Chart,
        );
        self.correlation_view.draw(
            frame,
            right[1],
            &self.theme,
            self.focus == Panel::Correlation,
        );

        let footer: Line = match self.focus {
            Panel::Table => self.table_view.hint(),
            Panel::Chart => Line::from("arrows: pick axes  c: correlate plotted"),
            Panel::Correlation => {
                Line::from("p: correlate plotted  a: correlate all  arrows: scroll")
            }
        };
        frame.render_widget(Paragraph::new(footer), chunks[2]);

        if let Some(dialog) = &mut self.import_dialog {
            let _ = dialog.draw(frame, frame.area());
        }
        if let Some(dialog) = &mut self.confirm_dialog {
            let _ = dialog.draw(frame, frame.area());
        }
        if let Some(dialog) = &mut self.message_dialog {
            let _ = dialog.draw(frame, frame.area());
        }
    }

    /// Dispatch every action that has already arrived from the worker or a
    /// spawned task. The run loop owns the receiver once started; this is
    /// for driving the app headlessly (integration tests, scripting).
    pub fn drain_pending(&mut self) -> Result<()> {
        let Some(rx) = self.action_rx.as_mut() else {
            return Ok(());
        };
        let mut pending = Vec::new();
        while let Ok(action) = rx.try_recv() {
            pending.push(action);
        }
        for action in pending {
            self.dispatch(action)?;
        }
        Ok(())
    }

    // Test and integration seams

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn axes(&self) -> &AxisSelection {
        &self.axes
    }

    pub fn series(&self) -> &PlotSeries {
        &self.series
    }

    pub fn correlation_view(&self) -> &CorrelationView {
        &self.correlation_view
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{ApiError, AuthStatus, ImportResponse, TableData, WireRow};
    use crate::sync::LoadOrigin;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use uuid::Uuid;

    /// Backend that answers everything immediately with canned data.
    #[derive(Clone, Default)]
    struct StubBackend;

    impl Backend for StubBackend {
        async fn fetch_rows(&self) -> Result<Vec<WireRow>, ApiError> {
            Ok(vec![])
        }
        async fn add_row(&self, _row: WireRow) -> Result<(), ApiError> {
            Ok(())
        }
        async fn replace_data(&self, _rows: Vec<WireRow>) -> Result<(), ApiError> {
            Ok(())
        }
        async fn clear_data(&self) -> Result<(), ApiError> {
            Ok(())
        }
        async fn reset_table(&self) -> Result<(), ApiError> {
            Ok(())
        }
        async fn import_datafile(&self, _path: &Path) -> Result<ImportResponse, ApiError> {
            Err(ApiError::Rejected("not under test".to_string()))
        }
        async fn correlation(
            &self,
            _request: CorrelationRequest,
        ) -> Result<PairOutcome, ApiError> {
            Ok(PairOutcome::Computed {
                coefficient: 0.5,
                p_value: Some(0.04),
                interpretation: "canned".to_string(),
            })
        }
        async fn auth_status(&self) -> Result<AuthStatus, ApiError> {
            Ok(AuthStatus {
                authenticated: true,
                email: Some("user@example.com".to_string()),
            })
        }
        async fn logout(&self) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn app() -> App<StubBackend> {
        App::new(Config::default(), None, StubBackend)
    }

    fn seeded_app() -> App<StubBackend> {
        let mut app = app();
        app.dispatch(Action::SubmitEntryRow {
            date: "2024-01-01".to_string(),
            entries: vec![
                ("Variable 1".to_string(), "1".to_string()),
                ("Variable 2".to_string(), "2".to_string()),
            ],
        })
        .unwrap();
        app
    }

    #[tokio::test]
    async fn entry_row_submission_appends_optimistically() {
        let app = seeded_app();
        assert_eq!(app.dataset().len(), 1);
        assert_eq!(app.dataset().rows()[0].value("Variable 1"), Some(1.0));
    }

    #[tokio::test]
    async fn rename_repoints_axes_and_preserves_values() {
        let mut app = seeded_app();
        app.dispatch(Action::CommitHeaderRename {
            from: "Variable 1".to_string(),
            candidate: "Temp".to_string(),
        })
        .unwrap();

        assert_eq!(app.axes().y1, "Temp");
        assert_eq!(app.dataset().rows()[0].value("Temp"), Some(1.0));
        assert!(!app.dataset().has_column("Variable 1"));
    }

    #[tokio::test]
    async fn rejected_rename_changes_nothing() {
        let mut app = seeded_app();
        let before_columns = app.dataset().columns().to_vec();
        let before_axes = app.axes().clone();

        for candidate in ["", "Date", "Variable 2"] {
            app.dispatch(Action::CommitHeaderRename {
                from: "Variable 1".to_string(),
                candidate: candidate.to_string(),
            })
            .unwrap();
        }

        assert_eq!(app.dataset().columns(), before_columns.as_slice());
        assert_eq!(*app.axes(), before_axes);
    }

    #[tokio::test]
    async fn failed_cell_replace_rolls_back_the_one_row() {
        let mut app = seeded_app();
        app.dispatch(Action::CommitCellEdit {
            row: 0,
            column: "Variable 1".to_string(),
            input: "9.5".to_string(),
        })
        .unwrap();
        assert_eq!(app.dataset().rows()[0].value("Variable 1"), Some(9.5));

        // Simulate the backend refusing the replace carrying this edit
        let edit = crate::core::CellEdit {
            row: 0,
            column: "Variable 1".to_string(),
            previous: crate::core::CellValue::Number(1.0),
            applied: crate::core::CellValue::Number(9.5),
        };
        app.dispatch(Action::Sync {
            id: Uuid::new_v4(),
            outcome: SyncOutcome::Failed {
                kind: TaskKind::ReplaceData,
                error: "boom".to_string(),
                rollback: Some(edit),
            },
        })
        .unwrap();

        assert_eq!(app.dataset().rows()[0].value("Variable 1"), Some(1.0));
        assert!(app.message_dialog.is_some());
    }

    #[tokio::test]
    async fn invalid_cell_edit_is_rejected_without_mutation() {
        let mut app = seeded_app();
        app.dispatch(Action::CommitCellEdit {
            row: 0,
            column: "Variable 1".to_string(),
            input: "abc".to_string(),
        })
        .unwrap();
        assert_eq!(app.dataset().rows()[0].value("Variable 1"), Some(1.0));
        assert!(app.message_dialog.is_none());
    }

    #[tokio::test]
    async fn imported_table_replaces_structure_everywhere() {
        let mut app = seeded_app();
        let table = TableData::from_wire(
            serde_json::from_str(
                r#"[{"Date": "2024-02-01", "Temp": 21.0, "Humidity": 60.0}]"#,
            )
            .unwrap(),
        )
        .unwrap();

        app.dispatch(Action::Sync {
            id: Uuid::new_v4(),
            outcome: SyncOutcome::TableLoaded {
                table,
                origin: LoadOrigin::Import {
                    message: "Successfully imported 1 rows".to_string(),
                },
            },
        })
        .unwrap();

        assert_eq!(app.dataset().columns(), &["Date", "Temp", "Humidity"]);
        // Stale axis preferences fall back to the new registry's defaults
        assert_eq!(app.axes().x, "Date");
        assert_eq!(app.axes().y1, "Temp");
        assert_eq!(app.axes().y2, "Humidity");
        assert!(app.message_dialog.is_some());
    }

    #[tokio::test]
    async fn add_column_reshapes_rows_and_replots() {
        let mut app = seeded_app();
        app.dispatch(Action::AddColumn).unwrap();
        assert_eq!(app.dataset().columns().len(), 4);
        assert_eq!(app.dataset().rows()[0].value("Variable 3"), Some(0.0));
        assert!(app.dataset().is_consistent());
    }

    #[tokio::test]
    async fn empty_dataset_correlation_shows_a_notice_not_an_error() {
        let mut app = app();
        app.dispatch(Action::CalculateAllCorrelations).unwrap();
        assert!(app.correlation_view().matrix().is_none());
        // Focus moved so the notice is visible
        assert_eq!(app.focus, Panel::Correlation);
    }

    #[tokio::test]
    async fn plotted_correlations_spawn_and_land_per_pair() {
        let mut app = seeded_app();
        app.dispatch(Action::CalculatePlotted).unwrap();

        // Let the spawned requests and their result actions settle
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        let mut landed = 0;
        while let Ok(action) = app.action_rx.as_mut().unwrap().try_recv() {
            if matches!(action, Action::PlottedPairResult { .. }) {
                landed += 1;
            }
            app.dispatch(action).unwrap();
        }
        assert_eq!(landed, 3);
    }

    #[tokio::test]
    async fn axis_change_resorts_the_series() {
        let mut app = seeded_app();
        app.dispatch(Action::SubmitEntryRow {
            date: "2023-12-01".to_string(),
            entries: vec![
                ("Variable 1".to_string(), "5".to_string()),
                ("Variable 2".to_string(), "6".to_string()),
            ],
        })
        .unwrap();

        // Insertion order is 2024 first; the plot sorts chronologically
        assert_eq!(app.series().x_labels, vec!["12-01", "01-01"]);
        app.dispatch(Action::AxisSelected {
            axis: crate::core::Axis::X,
            column: "Variable 1".to_string(),
        })
        .unwrap();
        assert!(!app.series().x_is_date);
        assert_eq!(app.series().y1_points[0].0, 1.0);
    }
}
