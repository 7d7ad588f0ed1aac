pub mod columns;
pub mod deserializers;
pub mod pipeline;
pub mod reader;
pub mod types;
pub mod validator;

pub use columns::{find_column_value, resolve_columns, ColumnMap, Field, FieldAliasTable};
pub use deserializers::parse_flexible_date;
pub use pipeline::{ingest, IngestContext};
pub use reader::{read_csv_reader, read_path};
pub use types::{CellValue, IngestOutput, RawRow, RawTable, Ticket, ValidationError};
pub use validator::validate_row;
