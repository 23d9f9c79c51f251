pub mod axes;
pub mod correlate;
pub mod dataset;

pub use axes::{Axis, AxisSelection, PlotSeries, plot_series};
pub use correlate::{CorrelationMatrix, PairOutcome};
pub use dataset::{CellEdit, CellValue, DATE_COLUMN, Dataset, DatasetError, RenameOutcome, Row};
