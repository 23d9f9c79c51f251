//! Ordered outbound mutation queue.
//!
//! Every state mutation that must reach the backend becomes a [`SyncTask`]
//! on an unbounded channel; one worker drains it a task at a time, so two
//! writes can never race each other and the backend always observes
//! mutations in the order the user made them. Outcomes travel back to the
//! UI loop as [`crate::action::Action::Sync`] messages — the worker never
//! touches application state.

use crate::api::types::TableData;
use crate::api::{ApiError, Backend, WireRow};
use crate::action::Action;
use crate::core::CellEdit;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, error};
use uuid::Uuid;

/// One unit of outbound work, processed strictly in enqueue order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncTask {
    /// Hydrate (or re-hydrate) the table from `get_data`.
    Refresh,
    /// Append one row; optimistic, never rolled back.
    AddRow { row: WireRow },
    /// Replace the whole table. Cell edits attach a rollback record;
    /// renames and column adds do not.
    ReplaceData {
        rows: Vec<WireRow>,
        rollback: Option<CellEdit>,
    },
    /// Clear server-side, then refetch the canonical (empty) structure.
    ClearThenRefetch,
    /// Reset server-side, then refetch the fresh default table.
    ResetThenRefetch,
    /// Upload a data file; the response replaces the table wholesale.
    Import { path: PathBuf },
}

/// Which task kind produced an outcome; drives failure handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    Refresh,
    AddRow,
    ReplaceData,
    Clear,
    Reset,
    Import,
}

impl SyncTask {
    pub fn kind(&self) -> TaskKind {
        match self {
            SyncTask::Refresh => TaskKind::Refresh,
            SyncTask::AddRow { .. } => TaskKind::AddRow,
            SyncTask::ReplaceData { .. } => TaskKind::ReplaceData,
            SyncTask::ClearThenRefetch => TaskKind::Clear,
            SyncTask::ResetThenRefetch => TaskKind::Reset,
            SyncTask::Import { .. } => TaskKind::Import,
        }
    }
}

/// Why a full table arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoadOrigin {
    Hydrate,
    Clear,
    Reset,
    Import { message: String },
}

/// What the worker reports back for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncOutcome {
    /// A full replacement table (hydration, clear, reset, import).
    TableLoaded {
        table: TableData,
        origin: LoadOrigin,
    },
    RowAdded,
    Replaced,
    Failed {
        kind: TaskKind,
        error: String,
        /// Present only for the cell-edit replace path; the app writes the
        /// previous value back.
        rollback: Option<CellEdit>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncJob {
    pub id: Uuid,
    pub task: SyncTask,
}

/// Cheap handle the UI keeps; enqueues and returns the job id.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    tx: UnboundedSender<SyncJob>,
}

impl SyncHandle {
    pub fn enqueue(&self, task: SyncTask) -> Uuid {
        let id = Uuid::new_v4();
        debug!("enqueue sync job {id}: {:?}", task.kind());
        // A closed channel means shutdown is already underway
        let _ = self.tx.send(SyncJob { id, task });
        id
    }
}

/// Create the queue: a handle for the UI and a receiver for the worker.
pub fn sync_channel() -> (SyncHandle, UnboundedReceiver<SyncJob>) {
    let (tx, rx) = unbounded_channel();
    (SyncHandle { tx }, rx)
}

/// Drains the queue one job at a time against a backend.
pub struct SyncWorker<B: Backend> {
    backend: B,
    jobs: UnboundedReceiver<SyncJob>,
    actions: UnboundedSender<Action>,
}

impl<B: Backend> SyncWorker<B> {
    pub fn new(
        backend: B,
        jobs: UnboundedReceiver<SyncJob>,
        actions: UnboundedSender<Action>,
    ) -> Self {
        Self {
            backend,
            jobs,
            actions,
        }
    }

    /// Run until the job channel closes. Strictly sequential: the next job
    /// is not picked up until the current one (including any chained
    /// refetch) has fully resolved.
    pub async fn run(mut self) {
        while let Some(job) = self.jobs.recv().await {
            let outcome = process(&self.backend, job.task).await;
            if let SyncOutcome::Failed { kind, error, .. } = &outcome {
                error!("sync job {} ({kind:?}) failed: {error}", job.id);
            }
            if self
                .actions
                .send(Action::Sync {
                    id: job.id,
                    outcome,
                })
                .is_err()
            {
                break;
            }
        }
    }
}

async fn process<B: Backend>(backend: &B, task: SyncTask) -> SyncOutcome {
    let kind = task.kind();
    match run_task(backend, task).await {
        Ok(outcome) => outcome,
        Err((error, rollback)) => SyncOutcome::Failed {
            kind,
            error: error.to_string(),
            rollback,
        },
    }
}

type TaskError = (ApiError, Option<CellEdit>);

async fn run_task<B: Backend>(
    backend: &B,
    task: SyncTask,
) -> Result<SyncOutcome, TaskError> {
    match task {
        SyncTask::Refresh => {
            let table = fetch_table(backend).await?;
            Ok(SyncOutcome::TableLoaded {
                table,
                origin: LoadOrigin::Hydrate,
            })
        }
        SyncTask::AddRow { row } => {
            backend.add_row(row).await.map_err(|e| (e, None))?;
            Ok(SyncOutcome::RowAdded)
        }
        SyncTask::ReplaceData { rows, rollback } => {
            match backend.replace_data(rows).await {
                Ok(()) => Ok(SyncOutcome::Replaced),
                Err(e) => Err((e, rollback)),
            }
        }
        SyncTask::ClearThenRefetch => {
            backend.clear_data().await.map_err(|e| (e, None))?;
            let table = fetch_table(backend).await?;
            Ok(SyncOutcome::TableLoaded {
                table,
                origin: LoadOrigin::Clear,
            })
        }
        SyncTask::ResetThenRefetch => {
            backend.reset_table().await.map_err(|e| (e, None))?;
            let table = fetch_table(backend).await?;
            Ok(SyncOutcome::TableLoaded {
                table,
                origin: LoadOrigin::Reset,
            })
        }
        SyncTask::Import { path } => {
            let response = backend
                .import_datafile(&path)
                .await
                .map_err(|e| (e, None))?;
            if let Some(error) = response.error {
                return Err((ApiError::Rejected(error), None));
            }
            let rows = response.data.ok_or_else(|| {
                (
                    ApiError::Malformed("import response carried no data".to_string()),
                    None,
                )
            })?;
            let table =
                TableData::from_wire(rows).map_err(|e| (e, None))?;
            let message = response
                .message
                .unwrap_or_else(|| "Import complete".to_string());
            Ok(SyncOutcome::TableLoaded {
                table,
                origin: LoadOrigin::Import { message },
            })
        }
    }
}

async fn fetch_table<B: Backend>(backend: &B) -> Result<TableData, TaskError> {
    let rows = backend.fetch_rows().await.map_err(|e| (e, None))?;
    TableData::from_wire(rows).map_err(|e| (e, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{AuthStatus, CorrelationRequest, ImportResponse};
    use crate::core::{CellValue, PairOutcome};
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    /// Records the order of backend calls; `replace_data` fails when the
    /// payload is empty so failure paths are reachable.
    #[derive(Clone, Default)]
    struct ScriptedBackend {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedBackend {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn log(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }
    }

    impl Backend for ScriptedBackend {
        async fn fetch_rows(&self) -> Result<Vec<WireRow>, ApiError> {
            self.log("get_data");
            Ok(vec![])
        }

        async fn add_row(&self, _row: WireRow) -> Result<(), ApiError> {
            self.log("add_row");
            Ok(())
        }

        async fn replace_data(&self, rows: Vec<WireRow>) -> Result<(), ApiError> {
            self.log(&format!("replace_data:{}", rows.len()));
            if rows.is_empty() {
                Err(ApiError::Rejected("Data must be a list".to_string()))
            } else {
                Ok(())
            }
        }

        async fn clear_data(&self) -> Result<(), ApiError> {
            self.log("clear_data");
            Ok(())
        }

        async fn reset_table(&self) -> Result<(), ApiError> {
            self.log("reset_table");
            Ok(())
        }

        async fn import_datafile(&self, _path: &Path) -> Result<ImportResponse, ApiError> {
            self.log("import_datafile");
            Ok(ImportResponse {
                success: Some(true),
                message: Some("Successfully imported 1 rows".to_string()),
                data: Some(
                    serde_json::from_str(r#"[{"Date": "2024-01-01", "Temp": 1.0}]"#)
                        .unwrap(),
                ),
                error: None,
            })
        }

        async fn correlation(
            &self,
            _request: CorrelationRequest,
        ) -> Result<PairOutcome, ApiError> {
            self.log("calculate_correlation");
            Ok(PairOutcome::Failed("not under test".to_string()))
        }

        async fn auth_status(&self) -> Result<AuthStatus, ApiError> {
            Ok(AuthStatus {
                authenticated: false,
                email: None,
            })
        }

        async fn logout(&self) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn one_row() -> WireRow {
        serde_json::from_str(r#"{"Date": "2024-01-01", "Variable 1": 1.0}"#).unwrap()
    }

    #[tokio::test]
    async fn jobs_reach_the_backend_in_enqueue_order() {
        let backend = ScriptedBackend::default();
        let (handle, jobs) = sync_channel();
        let (action_tx, mut action_rx) = unbounded_channel();

        handle.enqueue(SyncTask::ReplaceData {
            rows: vec![one_row()],
            rollback: None,
        });
        handle.enqueue(SyncTask::AddRow { row: one_row() });
        handle.enqueue(SyncTask::ReplaceData {
            rows: vec![one_row(), one_row()],
            rollback: None,
        });
        drop(handle);

        SyncWorker::new(backend.clone(), jobs, action_tx).run().await;

        assert_eq!(
            backend.calls(),
            vec!["replace_data:1", "add_row", "replace_data:2"]
        );
        // Three outcomes, in order
        let mut outcomes = Vec::new();
        while let Ok(action) = action_rx.try_recv() {
            if let Action::Sync { outcome, .. } = action {
                outcomes.push(outcome);
            }
        }
        assert_eq!(
            outcomes,
            vec![
                SyncOutcome::Replaced,
                SyncOutcome::RowAdded,
                SyncOutcome::Replaced
            ]
        );
    }

    #[tokio::test]
    async fn failed_replace_carries_its_rollback_record() {
        let backend = ScriptedBackend::default();
        let rollback = CellEdit {
            row: 0,
            column: "Variable 1".to_string(),
            previous: CellValue::Number(1.5),
            applied: CellValue::Number(2.5),
        };
        let outcome = process(
            &backend,
            SyncTask::ReplaceData {
                rows: vec![],
                rollback: Some(rollback.clone()),
            },
        )
        .await;

        assert_eq!(
            outcome,
            SyncOutcome::Failed {
                kind: TaskKind::ReplaceData,
                error: "backend rejected the request: Data must be a list".to_string(),
                rollback: Some(rollback),
            }
        );
    }

    #[tokio::test]
    async fn clear_chains_into_a_refetch() {
        let backend = ScriptedBackend::default();
        let outcome = process(&backend, SyncTask::ClearThenRefetch).await;

        assert_eq!(backend.calls(), vec!["clear_data", "get_data"]);
        match outcome {
            SyncOutcome::TableLoaded { table, origin } => {
                assert_eq!(origin, LoadOrigin::Clear);
                // Empty refetch restores the default structure
                assert_eq!(table.columns, crate::core::Dataset::default_columns());
                assert!(table.rows.is_empty());
            }
            other => panic!("expected TableLoaded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn import_success_replaces_the_table() {
        let backend = ScriptedBackend::default();
        let outcome = process(
            &backend,
            SyncTask::Import {
                path: PathBuf::from("data.csv"),
            },
        )
        .await;

        match outcome {
            SyncOutcome::TableLoaded { table, origin } => {
                assert_eq!(
                    origin,
                    LoadOrigin::Import {
                        message: "Successfully imported 1 rows".to_string()
                    }
                );
                assert_eq!(table.columns, vec!["Date", "Temp"]);
            }
            other => panic!("expected TableLoaded, got {other:?}"),
        }
    }
}
