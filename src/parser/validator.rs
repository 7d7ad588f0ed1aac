use crate::analyzer::normalizers::{title_case, Priority};
use crate::parser::columns::{find_column_cell, find_column_value, Field};
use crate::parser::deserializers::{format_iso, parse_cell_date};
use crate::parser::pipeline::IngestContext;
use crate::parser::types::{CellValue, RawRow, Ticket, ValidationError};

pub const REASON_REQUIRED: &str = "required";
pub const REASON_INVALID_DATE: &str = "invalid date";
pub const REASON_INVALID_PRIORITY: &str = "invalid priority, expected P1–P4";

/// Optional timestamp: rewritten to ISO-8601 when it parses, kept verbatim otherwise.
fn normalize_optional_date(cell: Option<&CellValue>) -> String {
    match cell {
        Some(cell) => parse_cell_date(cell)
            .map(|dt| format_iso(&dt))
            .unwrap_or_else(|| cell.to_trimmed_string()),
        None => String::new(),
    }
}

/// Validate one data row. `row_number` is the spreadsheet row (header = 1).
/// Every rule is checked independently so a row can report several errors;
/// a row with any error yields no ticket.
pub fn validate_row(
    row: &RawRow,
    row_number: usize,
    ctx: &IngestContext,
) -> Result<Ticket, Vec<ValidationError>> {
    let value = |field: Field| find_column_value(row, ctx.aliases.aliases(field));
    let cell = |field: Field| find_column_cell(row, ctx.aliases.aliases(field));
    let mut errors = Vec::new();

    let number = value(Field::Number);
    if number.is_empty() {
        errors.push(ValidationError::new(
            row_number,
            Field::Number.label(),
            "",
            REASON_REQUIRED,
        ));
    }

    // Workbook date cells arrive as serial numbers and are read as such.
    let opened = match cell(Field::Opened).filter(|c| !c.is_blank()) {
        None => {
            errors.push(ValidationError::new(
                row_number,
                Field::Opened.label(),
                "",
                REASON_REQUIRED,
            ));
            String::new()
        }
        Some(opened_cell) => match parse_cell_date(opened_cell) {
            Some(dt) => format_iso(&dt),
            None => {
                let raw = opened_cell.to_trimmed_string();
                errors.push(ValidationError::new(
                    row_number,
                    Field::Opened.label(),
                    &raw,
                    REASON_INVALID_DATE,
                ));
                raw
            }
        },
    };

    let mut priority = value(Field::Priority);
    if !priority.is_empty() {
        match ctx.rules.normalize_priority(&priority) {
            Priority::Undefined => errors.push(ValidationError::new(
                row_number,
                Field::Priority.label(),
                &priority,
                REASON_INVALID_PRIORITY,
            )),
            tier => priority = tier.as_str().to_string(),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let mut state = value(Field::State);
    if !state.is_empty() && ctx.rules.is_closing_state(&state) {
        state = title_case(&state);
    }

    Ok(Ticket {
        number,
        opened,
        short_description: value(Field::ShortDescription),
        caller: value(Field::Caller),
        priority,
        state,
        category: value(Field::Category),
        subcategory: value(Field::Subcategory),
        assignment_group: value(Field::AssignmentGroup),
        assigned_to: value(Field::AssignedTo),
        updated: normalize_optional_date(cell(Field::Updated)),
        updated_by: value(Field::UpdatedBy),
        closed: normalize_optional_date(cell(Field::Closed)),
        business_impact: value(Field::BusinessImpact),
        comments_and_work_notes: value(Field::CommentsAndWorkNotes),
        request_item: value(Field::RequestItem),
        requested_for_name: value(Field::RequestedForName),
        sla: None,
    })
}
