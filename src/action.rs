use crate::core::axes::Axis;
use crate::core::correlate::PairOutcome;
use crate::sync::SyncOutcome;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::Display;
use uuid::Uuid;

/// High-level actions that can be triggered by keybindings or components.
///
/// Unit variants are bindable from the config file; payload variants are
/// emitted internally (by components, the sync worker, or correlation
/// tasks) and never appear in keybinding maps.
#[derive(Debug, Clone, PartialEq, Display, Serialize, Deserialize)]
pub enum Action {
    Tick,
    Render,
    Resize(u16, u16),
    Suspend,
    Resume,
    Quit,
    Error(String),
    Help,
    /// Close any active dialog
    DialogClose,
    /// Cycle focus between the table, chart, and correlation panels
    NextPanel,
    /// Cycle focus backwards
    PrevPanel,
    /// Re-hydrate the table from the backend
    Refresh,
    /// Register a fresh `Variable {n}` column
    AddColumn,
    /// Open the file-import dialog
    OpenImportDialog,
    /// Ask for confirmation, then clear all rows
    RequestClearData,
    /// Ask for confirmation, then reset the table to its default shape
    RequestResetTable,
    /// Confirmed: clear server-side and refetch the empty structure
    ClearData,
    /// Confirmed: reset server-side and refetch the default table
    ResetTable,
    /// Compute correlations for the three plotted axis pairs
    CalculatePlotted,
    /// Compute the full pairwise correlation matrix
    CalculateAllCorrelations,
    /// End the backend session and quit
    Logout,
    /// The user committed an edited cell (edit box closed with changed text)
    CommitCellEdit {
        row: usize,
        column: String,
        input: String,
    },
    /// The user submitted the entry line: one raw value per value column
    SubmitEntryRow {
        date: String,
        entries: Vec<(String, String)>,
    },
    /// A header edit left its Editing state with a candidate name
    CommitHeaderRename { from: String, candidate: String },
    /// An axis selector moved to a different column
    AxisSelected { axis: Axis, column: String },
    /// The import dialog validated and chose a file
    ImportPathChosen(PathBuf),
    /// The active confirmation dialog was accepted; carries the gated action
    Confirmed(Box<Action>),
    /// Outcome of one ordered sync job
    Sync { id: Uuid, outcome: SyncOutcome },
    /// Outcome of one correlation request (plotted-pair panel)
    PlottedPairResult {
        x: String,
        y: String,
        outcome: PairOutcome,
    },
    /// Outcome of one correlation request (full-matrix panel)
    MatrixPairResult {
        x: String,
        y: String,
        outcome: PairOutcome,
    },
    /// The startup auth probe resolved
    AuthStatusResolved {
        authenticated: bool,
        email: Option<String>,
    },
    /// The user acknowledged the one-time disclaimer
    AcknowledgeDisclaimer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_variants_round_trip_as_plain_strings() {
        let json = serde_json::to_string(&Action::Quit).unwrap();
        assert_eq!(json, "\"Quit\"");
        let restored: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, Action::Quit);
    }

    #[test]
    fn payload_variants_round_trip() {
        let action = Action::CommitHeaderRename {
            from: "Variable 1".to_string(),
            candidate: "Temp".to_string(),
        };
        let json = serde_json::to_string(&action).unwrap();
        let restored: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, action);
    }

    #[test]
    fn display_is_nonempty_for_every_simple_variant() {
        for action in [
            Action::Quit,
            Action::Refresh,
            Action::AddColumn,
            Action::CalculatePlotted,
            Action::CalculateAllCorrelations,
        ] {
            assert!(!format!("{action}").is_empty());
        }
    }
}
