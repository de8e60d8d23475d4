//! Balance sheet rows, columnar snapshots and CSV ingest

mod classification;
mod item;
pub mod loader;
mod sheet;

pub use classification::{Classification, Side};
pub use item::BalanceSheetItem;
pub use loader::{load_balance_sheet, load_balance_sheet_from_reader};
pub use sheet::{BalanceSheet, KeyColumn, KeyGroup};
pub(crate) use sheet::RunoffColumns;
