pub mod analyzer;
pub mod commands;
pub mod config;
pub mod error;
pub mod parser;
pub mod state;

pub use analyzer::{
    evaluate_sla, get_incident_state, is_cancelled, normalize_location_name, normalize_priority,
    summarize_sla, SLA_THRESHOLDS,
};
pub use commands::{import_file, import_table, ImportEvent, ImportResult};
pub use config::AppConfig;
pub use error::AppError;
pub use parser::{ingest, parse_flexible_date, resolve_columns, validate_row, IngestContext};
pub use state::{AppState, Dataset, DatasetAccess};

// ─── E2E Integration Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod e2e_tests {
    use std::ops::ControlFlow;

    use chrono::{TimeZone, Utc};

    use crate::analyzer::normalizers::Priority;
    use crate::analyzer::sla::SlaOutcome;
    use crate::parser::reader::read_csv_reader;
    use crate::parser::types::{CellValue, RawTable};
    use crate::{import_file, import_table, AppConfig, AppError, AppState, DatasetAccess, ImportEvent};

    const EXPORT: &str = "\u{FEFF}Number,Opened,Short description,Priority,State,Assignment group,Updated,Closed\n\
        INC0001,2025-03-01 08:00:00,VPN down,1 - Critical,Closed,Service Desk São Paulo,2025-03-01 08:45:00,2025-03-01 08:45:00\n\
        INC0002,01/03/2025 09:00,Printer jam,3 - Moderate,In Progress,Suporte Campinas,,\n\
        INC0003,not a date,Mail slow,2 - High,New,NOC 24x7,,\n\
        ,,,,,,,\n\
        INC0004,2025-03-01T10:00:00Z,Access request,whenever,Open,NOC 24x7,,\n\
        INC0005,2025-03-01 10:00,Disk full,2 - High,Cancelled,Suporte Campinas,,2025-03-01 20:00\n";

    fn config() -> AppConfig {
        AppConfig {
            assume_open_as_of: Some(Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap()),
            ..AppConfig::default()
        }
    }

    fn no_cancel(_: ImportEvent) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// E2E: delimited export → ingest → SLA → dataset replaced
    #[test]
    fn test_e2e_import_and_sla_pipeline() {
        let state = AppState::default();
        let table = read_csv_reader(EXPORT.as_bytes()).expect("CSV read failed");
        let result = import_table(&state, "export.csv", &table, &config(), no_cancel)
            .expect("import failed");

        // 1. Counts
        assert_eq!(result.total_rows, 6);
        assert_eq!(result.blank_rows, 1);
        assert_eq!(result.total_tickets, 3);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].row, 4);
        assert_eq!(result.errors[0].column, "Opened");
        assert_eq!(result.errors[1].row, 6);
        assert_eq!(result.errors[1].column, "Priority");

        // 2. Normalised values
        let records = state.dataset(|d| d.records.clone()).expect("no dataset");
        let numbers: Vec<&str> = records.iter().map(|t| t.number.as_str()).collect();
        assert_eq!(numbers, vec!["INC0001", "INC0002", "INC0005"]);
        assert_eq!(records[0].priority, Priority::P1.as_str());
        assert_eq!(records[0].opened, "2025-03-01T08:00:00Z");
        assert_eq!(records[1].opened, "2025-03-01T09:00:00Z");
        assert_eq!(records[2].state, "Cancelled");
        assert_eq!(
            result.unique_locations,
            vec!["CPS - Suporte", "SP - Service Desk"]
        );

        // 3. SLA outcomes
        // INC0001: P1, 0.75h → within.
        // INC0002: P3, open until 2025-03-02 09:00 → 24h → within.
        // INC0005: P2, cancelled, closed after 10h → 6h over.
        let outcomes: Vec<SlaOutcome> = records.iter().filter_map(|t| t.sla).collect();
        assert_eq!(outcomes.len(), 3);
        assert!(!outcomes[0].is_breached());
        assert!(!outcomes[1].is_breached());
        assert_eq!(outcomes[2].result().map(|r| r.hours_over_threshold), Some(6.0));
        assert_eq!(result.sla.counts.breached, 1);
        assert_eq!(result.sla.compliance_pct, 66.67);

        // 4. Serialized ticket carries the SLA block
        let json = serde_json::to_value(&records[2]).unwrap();
        assert_eq!(json["Number"], "INC0005");
        assert_eq!(json["SLA"]["status"], "computed");
    }

    /// E2E: workbook-shaped grid with numeric cells and serial dates
    #[test]
    fn test_e2e_numeric_cells() {
        let state = AppState::default();
        let table = RawTable::new(vec![
            vec![CellValue::text("Número"), CellValue::text("Aberto em"), CellValue::text("Prioridade")],
            vec![CellValue::Number(1042.0), CellValue::Number(45658.5), CellValue::Number(2.0)],
        ]);
        let result = import_table(&state, "planilha.xlsx", &table, &config(), no_cancel).unwrap();
        assert_eq!(result.total_tickets, 1);

        let ticket = state.dataset(|d| d.records[0].clone()).unwrap();
        assert_eq!(ticket.number, "1042");
        assert_eq!(ticket.opened, "2025-01-01T12:00:00Z");
        assert_eq!(ticket.priority, "P2");
    }

    /// E2E: every row rejected → NoValidRecords, nothing replaced
    #[test]
    fn test_e2e_no_valid_records() {
        let state = AppState::default();
        let table = read_csv_reader("Number;Opened\nINC1;soon\n;2025-01-01\n".as_bytes()).unwrap();
        match import_table(&state, "bad.csv", &table, &config(), no_cancel) {
            Err(AppError::NoValidRecords { errors }) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].to_string(), "row 2: Opened invalid date (value: soon)");
                assert_eq!(errors[1].to_string(), "row 3: Number required");
            }
            other => panic!("expected NoValidRecords, got {:?}", other.map(|r| r.total_tickets)),
        }
        assert!(matches!(
            state.dataset(|d| d.records.len()),
            Err(AppError::NoDataset)
        ));
    }

    /// E2E: cancelling from the progress callback aborts the import
    #[test]
    fn test_e2e_cancel() {
        let state = AppState::default();
        let table = read_csv_reader(EXPORT.as_bytes()).unwrap();
        let config = AppConfig {
            progress_stride: 1,
            ..config()
        };
        let err = import_table(&state, "export.csv", &table, &config, |_| ControlFlow::Break(()))
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
        assert!(state.dataset(|_| ()).is_err());
    }

    /// E2E: file on disk through the extension dispatch
    #[test]
    fn test_e2e_import_file() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let path = dir.path().join("export.csv");
        std::fs::write(&path, EXPORT).unwrap();

        let state = AppState::default();
        let result = import_file(&state, &path, &config(), no_cancel).expect("import_file failed");
        assert_eq!(result.source, "export.csv");
        assert_eq!(result.total_tickets, 3);
        assert_eq!(state.dataset(|d| d.source.clone()).unwrap(), "export.csv");
    }
}
