use std::collections::BTreeSet;
use std::ops::ControlFlow;
use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use crate::analyzer::sla::SlaEngine;
use crate::analyzer::summary::{summarize_sla, SlaSummary};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::parser::pipeline::{ingest, IngestContext};
use crate::parser::reader::read_path;
use crate::parser::types::{RawTable, ValidationError};
use crate::state::{AppState, Dataset, DatasetAccess};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "event", content = "data")]
pub enum ImportEvent {
    #[serde(rename_all = "camelCase")]
    Progress {
        rows_parsed: usize,
        records_accepted: usize,
    },
    #[serde(rename_all = "camelCase")]
    Complete {
        duration_ms: u64,
        total_tickets: usize,
        error_count: usize,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub source: String,
    pub total_tickets: usize,
    pub total_rows: usize,
    pub blank_rows: usize,
    pub errors: Vec<ValidationError>,
    pub detected_columns: Vec<String>,
    pub missing_optional_columns: Vec<String>,
    /// Distinct state labels after normalisation; unrecognised states appear verbatim.
    pub unique_states: Vec<String>,
    pub unique_priorities: Vec<String>,
    pub unique_locations: Vec<String>,
    pub sla: SlaSummary,
    pub parse_duration_ms: u64,
}

impl ImportResult {
    /// One line per rejected row error, for the warnings list.
    pub fn warning_lines(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Ingest an already extracted table, attach SLA outcomes and make the result
/// the current dataset. On any error the previous dataset is left untouched.
pub fn import_table(
    state: &AppState,
    source: &str,
    table: &RawTable,
    config: &AppConfig,
    mut on_event: impl FnMut(ImportEvent) -> ControlFlow<()>,
) -> Result<ImportResult, AppError> {
    let start = Instant::now();
    let ctx = IngestContext::from_config(config)?;

    let output = ingest(table, &ctx, |rows_parsed, records_accepted| {
        on_event(ImportEvent::Progress {
            rows_parsed,
            records_accepted,
        })
    })?;

    let mut records = output.records;
    let engine = SlaEngine::new(config.sla_thresholds, &ctx.rules, config.assume_open_as_of());
    engine.attach(&mut records);
    let sla = summarize_sla(&records, &ctx.rules);

    let mut unique_states = BTreeSet::new();
    let mut unique_priorities = BTreeSet::new();
    let mut unique_locations = BTreeSet::new();
    for ticket in &records {
        if !ticket.state.is_empty() {
            unique_states.insert(ctx.rules.incident_state(&ticket.state).label().to_string());
        }
        if !ticket.priority.is_empty() {
            unique_priorities.insert(ticket.priority.clone());
        }
        if !ticket.assignment_group.is_empty() {
            unique_locations.insert(ctx.rules.normalize_location_name(&ticket.assignment_group));
        }
    }

    let result = ImportResult {
        source: source.to_string(),
        total_tickets: records.len(),
        total_rows: output.total_rows_processed,
        blank_rows: output.blank_rows,
        errors: output.errors.clone(),
        detected_columns: output.detected_columns,
        missing_optional_columns: output.missing_optional_columns,
        unique_states: unique_states.into_iter().collect(),
        unique_priorities: unique_priorities.into_iter().collect(),
        unique_locations: unique_locations.into_iter().collect(),
        sla: sla.clone(),
        parse_duration_ms: output.parse_duration_ms,
    };

    state.replace_dataset(Dataset {
        source: source.to_string(),
        records,
        errors: output.errors,
        sla_summary: sla,
    })?;

    let duration_ms = start.elapsed().as_millis() as u64;
    log::info!(
        "Import of {} complete: {} tickets, {} row errors, SLA compliance {}%",
        source,
        result.total_tickets,
        result.errors.len(),
        result.sla.compliance_pct
    );
    // The import is already committed; a Break here has nothing left to cancel.
    let _ = on_event(ImportEvent::Complete {
        duration_ms,
        total_tickets: result.total_tickets,
        error_count: result.errors.len(),
    });

    Ok(result)
}

/// Read a `.csv` or workbook file from disk and import it.
pub fn import_file(
    state: &AppState,
    path: &Path,
    config: &AppConfig,
    on_event: impl FnMut(ImportEvent) -> ControlFlow<()>,
) -> Result<ImportResult, AppError> {
    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string());
    let table = read_path(path)?;
    import_table(state, &source, &table, config, on_event)
}
