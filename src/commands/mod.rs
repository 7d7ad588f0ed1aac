pub mod import;

pub use import::{import_file, import_table, ImportEvent, ImportResult};
