pub mod client;
pub mod types;

pub use client::{HttpBackend, IMPORT_EXTENSIONS, is_importable};
pub use types::{
    ApiError, AuthStatus, CorrelationRequest, ImportResponse, TableData, WireRow,
    dataset_to_wire, row_to_wire,
};

use crate::core::PairOutcome;
use std::future::Future;
use std::path::Path;

/// The data service contract (one method per endpoint).
///
/// Futures are declared `Send` so callers can hand work to the runtime with
/// the backend type still generic; implementations just write `async fn`.
/// Production talks HTTP through [`HttpBackend`]; tests swap in an
/// in-memory stand-in.
pub trait Backend: Clone + Send + Sync + 'static {
    /// `GET get_data` — the full ordered row sequence.
    fn fetch_rows(&self)
    -> impl Future<Output = Result<Vec<WireRow>, ApiError>> + Send;

    /// `POST add_row` — append one row.
    fn add_row(&self, row: WireRow) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `POST replace_data` — replace the whole table.
    fn replace_data(
        &self,
        rows: Vec<WireRow>,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `POST clear_data` — drop every row.
    fn clear_data(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `POST reset_table` — restore the server-side default table.
    fn reset_table(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `POST import_datafile` — multipart upload; the answer carries the
    /// replacement table.
    fn import_datafile(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<ImportResponse, ApiError>> + Send;

    /// `POST calculate_correlation` for one column pair. Backend-side
    /// rejections (constant input, too few points) come back as
    /// [`PairOutcome::Failed`], not as transport errors.
    fn correlation(
        &self,
        request: CorrelationRequest,
    ) -> impl Future<Output = Result<PairOutcome, ApiError>> + Send;

    /// `GET auth-status`.
    fn auth_status(&self) -> impl Future<Output = Result<AuthStatus, ApiError>> + Send;

    /// `POST logout`.
    fn logout(&self) -> impl Future<Output = Result<(), ApiError>> + Send;
}
