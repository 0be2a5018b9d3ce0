// CLV Ledger - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod segment;
pub mod record;
pub mod csv_io;
pub mod store;
pub mod summary;
pub mod sync;
pub mod config;
pub mod cli;

// Re-export commonly used types
pub use error::{LedgerError, Result};
pub use segment::{classify, Classification, Segment, HIGH_THRESHOLD, MID_THRESHOLD};
pub use record::{placeholder_id, CustomerInput, CustomerRecord};
pub use csv_io::{export_bytes, read_rows, ImportedRow, EXPORT_HEADER, REQUIRED_COLUMNS};
pub use store::RecordStore;
pub use summary::{format_rupiah, summarize, SegmentCount, SegmentStats, Summary};
pub use sync::{sync_store, MemorySheet, SheetCredentials, SheetSync, SqliteSheet, SyncReport};
pub use config::LedgerConfig;
pub use cli::{run_report, Cli, Command, ReportArgs, UiArgs};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
