use std::ops::ControlFlow;
use std::time::Instant;

use crate::analyzer::normalizers::NormalizerRules;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::parser::columns::{resolve_columns, FieldAliasTable};
use crate::parser::types::{CellValue, IngestOutput, RawRow, RawTable, Ticket, ValidationError};
use crate::parser::validator::validate_row;

pub const DEFAULT_PROGRESS_STRIDE: usize = 100;

/// Immutable inputs of one ingestion: the alias table used to resolve
/// headers and the rule tables used to normalise values.
#[derive(Debug, Clone)]
pub struct IngestContext {
    pub aliases: FieldAliasTable,
    pub rules: NormalizerRules,
    /// The progress callback fires every `progress_stride` data rows.
    pub progress_stride: usize,
}

impl Default for IngestContext {
    fn default() -> Self {
        IngestContext {
            aliases: FieldAliasTable::default(),
            rules: NormalizerRules::default(),
            progress_stride: DEFAULT_PROGRESS_STRIDE,
        }
    }
}

impl IngestContext {
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let aliases = match &config.aliases {
            Some(overrides) => FieldAliasTable::with_overrides(overrides)?,
            None => FieldAliasTable::default(),
        };
        Ok(IngestContext {
            aliases,
            rules: config.rules.clone(),
            progress_stride: config.progress_stride.max(1),
        })
    }
}

/// Pair each cell with its header. Columns with a blank header are dropped.
fn build_raw_row(headers: &[String], cells: &[CellValue]) -> RawRow {
    let mut row = RawRow::new();
    for (i, header) in headers.iter().enumerate() {
        if header.is_empty() {
            continue;
        }
        row.insert(header.clone(), cells.get(i).cloned().unwrap_or_default());
    }
    row
}

/// Ingest a whole table.
///
/// Structural problems (no rows, no header, required columns missing) fail
/// before any data row is read. Row errors are collected and the row is
/// dropped. Fully blank rows are skipped without error. If no row survives,
/// the call fails with `NoValidRecords` carrying the collected errors.
///
/// `progress(rows_processed, records_accepted)` is called every
/// `ctx.progress_stride` rows; returning `Break` cancels the import.
pub fn ingest(
    table: &RawTable,
    ctx: &IngestContext,
    mut progress: impl FnMut(usize, usize) -> ControlFlow<()>,
) -> Result<IngestOutput, AppError> {
    let start = Instant::now();

    // Phase 1: header and schema
    if table.is_empty() {
        return Err(AppError::EmptyFile);
    }
    let headers = table.header().ok_or(AppError::MissingHeader)?;
    let col_map = resolve_columns(&headers, &ctx.aliases)?;
    let missing_optional = col_map.missing_optional(&ctx.aliases);
    if !missing_optional.is_empty() {
        log::debug!("Optional columns not found: {}", missing_optional.join(", "));
    }

    let data = table.data_rows();
    if data.is_empty() {
        return Err(AppError::EmptyFile);
    }

    // Phase 2: validate rows
    let stride = ctx.progress_stride.max(1);
    let mut records: Vec<Ticket> = Vec::with_capacity(data.len());
    let mut errors: Vec<ValidationError> = Vec::new();
    let mut blank_rows = 0usize;

    for (idx, cells) in data.iter().enumerate() {
        let processed = idx + 1;
        // +1 for the header, +1 for 1-based numbering
        let row_number = idx + 2;

        let row = build_raw_row(&headers, cells);
        if row.is_blank() {
            blank_rows += 1;
        } else {
            match validate_row(&row, row_number, ctx) {
                Ok(ticket) => records.push(ticket),
                Err(row_errors) => errors.extend(row_errors),
            }
        }

        if processed % stride == 0 {
            log::debug!("Ingest progress: {} rows, {} records", processed, records.len());
            if progress(processed, records.len()).is_break() {
                log::info!("Ingest cancelled after {} rows", processed);
                return Err(AppError::Cancelled);
            }
        }
    }

    errors.sort_by(|a, b| (a.row, &a.column).cmp(&(b.row, &b.column)));

    if records.is_empty() {
        log::warn!(
            "No valid records in {} rows ({} errors)",
            data.len(),
            errors.len()
        );
        return Err(AppError::NoValidRecords { errors });
    }

    let parse_duration_ms = start.elapsed().as_millis() as u64;
    log::info!(
        "Ingested {} records from {} rows ({} errors, {} blank) in {} ms",
        records.len(),
        data.len(),
        errors.len(),
        blank_rows,
        parse_duration_ms
    );

    Ok(IngestOutput {
        records,
        errors,
        total_rows_processed: data.len(),
        blank_rows,
        detected_columns: col_map.all_headers().to_vec(),
        missing_optional_columns: missing_optional,
        parse_duration_ms,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────
