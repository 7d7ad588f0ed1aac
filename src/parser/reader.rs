use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::AppError;
use crate::parser::types::{CellValue, RawTable};

const BOM: &[u8] = b"\xEF\xBB\xBF";
const CANDIDATE_DELIMITERS: &[u8] = b";,\t";

/// Pick the delimiter that occurs most often on the header line.
/// Ties go to the earlier candidate, so a header with no separator at all
/// reads as `;` like the exports this was built for.
fn detect_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|&b| b == b'\n').next().unwrap_or(&[]);
    let mut best = CANDIDATE_DELIMITERS[0];
    let mut best_count = 0usize;
    for &d in CANDIDATE_DELIMITERS {
        let count = first_line.iter().filter(|&&b| b == d).count();
        if count > best_count {
            best = d;
            best_count = count;
        }
    }
    best
}

/// Read a delimited text export into a cell grid. Everything is text;
/// the pipeline parses dates and numbers itself.
pub fn read_csv_reader<R: Read>(mut reader: R) -> Result<RawTable, AppError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let body = bytes.strip_prefix(BOM).unwrap_or(&bytes);

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(body))
        .has_headers(false)
        .flexible(true)
        .double_quote(true)
        .quoting(true)
        .from_reader(body);

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(CellValue::from).collect());
    }
    Ok(RawTable::new(rows))
}

pub fn read_csv_path(path: &Path) -> Result<RawTable, AppError> {
    let file = std::fs::File::open(path)?;
    read_csv_reader(std::io::BufReader::new(file))
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        // Date cells stay serial numbers; the date parser handles them.
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from(s.as_str()),
    }
}

/// First worksheet of an `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods` workbook.
pub fn read_workbook(path: &Path) -> Result<RawTable, AppError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Err(AppError::EmptyFile),
    };
    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();
    Ok(RawTable::new(rows))
}

/// Dispatch on the file extension.
pub fn read_path(path: &Path) -> Result<RawTable, AppError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "csv" | "txt" => read_csv_path(path),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path),
        other => Err(AppError::UnsupportedFormat(other.to_string())),
    }
}
