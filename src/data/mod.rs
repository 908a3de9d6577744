pub mod export;
pub mod loader;
pub mod types;

pub use export::{export_monthly_cashflows, ExportError};
pub use loader::{LoaderError, ResultsLoader, EXPECTED_COLUMNS};
pub use types::{month_start, DailyResult, DailyResults, MonthlySeries, TableError, MAX_MONEY_MAGNITUDE};
