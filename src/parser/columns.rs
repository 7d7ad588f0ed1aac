use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::parser::types::{CellValue, RawRow};

/// Canonical ticket fields a header can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Number,
    Opened,
    ShortDescription,
    Caller,
    Priority,
    State,
    Category,
    Subcategory,
    AssignmentGroup,
    AssignedTo,
    Updated,
    UpdatedBy,
    Closed,
    BusinessImpact,
    CommentsAndWorkNotes,
    RequestItem,
    RequestedForName,
}

/// Fields whose absence from the header rejects the whole file.
pub const REQUIRED: &[Field] = &[Field::Number, Field::Opened];

impl Field {
    pub const ALL: [Field; 17] = [
        Field::Number,
        Field::Opened,
        Field::ShortDescription,
        Field::Caller,
        Field::Priority,
        Field::State,
        Field::Category,
        Field::Subcategory,
        Field::AssignmentGroup,
        Field::AssignedTo,
        Field::Updated,
        Field::UpdatedBy,
        Field::Closed,
        Field::BusinessImpact,
        Field::CommentsAndWorkNotes,
        Field::RequestItem,
        Field::RequestedForName,
    ];

    /// Name used in operator-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            Field::Number => "Number",
            Field::Opened => "Opened",
            Field::ShortDescription => "ShortDescription",
            Field::Caller => "Caller",
            Field::Priority => "Priority",
            Field::State => "State",
            Field::Category => "Category",
            Field::Subcategory => "Subcategory",
            Field::AssignmentGroup => "AssignmentGroup",
            Field::AssignedTo => "AssignedTo",
            Field::Updated => "Updated",
            Field::UpdatedBy => "UpdatedBy",
            Field::Closed => "Closed",
            Field::BusinessImpact => "BusinessImpact",
            Field::CommentsAndWorkNotes => "CommentsAndWorkNotes",
            Field::RequestItem => "RequestItem",
            Field::RequestedForName => "RequestedForName",
        }
    }

    pub fn is_required(self) -> bool {
        REQUIRED.contains(&self)
    }

    fn default_aliases(self) -> &'static [&'static str] {
        match self {
            Field::Number => &["Number", "Número", "Numero", "Nº", "Ticket", "Incident", "Incidente", "Chamado"],
            Field::Opened => &["Opened", "Data", "Aberto", "Aberto em", "Data de abertura", "Opened at", "Created", "Criado em"],
            Field::ShortDescription => &["Short description", "Descrição resumida", "Descrição", "Description", "Resumo", "Título", "Title"],
            Field::Caller => &["Caller", "Solicitante", "Chamador", "Requester", "Usuário"],
            Field::Priority => &["Priority", "Prioridade"],
            Field::State => &["State", "Estado", "Status", "Situação"],
            Field::Category => &["Category", "Categoria"],
            Field::Subcategory => &["Subcategory", "Subcategoria"],
            Field::AssignmentGroup => &["Assignment group", "Grupo de atribuição", "Grupo designado", "Grupo", "Fila", "Localidade", "Location"],
            Field::AssignedTo => &["Assigned to", "Atribuído a", "Atribuido a", "Responsável", "Técnico"],
            Field::Updated => &["Updated", "Atualizado", "Atualizado em", "Última atualização", "Last updated"],
            Field::UpdatedBy => &["Updated by", "Atualizado por"],
            Field::Closed => &["Closed", "Fechado em", "Resolved", "Resolvido em", "Data de fechamento", "Closed at"],
            Field::BusinessImpact => &["Business impact", "Impacto no negócio", "Impacto", "Impact"],
            Field::CommentsAndWorkNotes => &["Comments and Work notes", "Comentários e notas de trabalho", "Comentários", "Work notes", "Notas de trabalho"],
            Field::RequestItem => &["Request item", "Item de requisição", "Item da requisição", "RITM"],
            Field::RequestedForName => &["Requested for", "Requested for name", "Solicitado para", "Nome do solicitado"],
        }
    }
}

/// Per-field ordered header aliases. Alias sets never overlap across fields
/// (compared case-insensitively); the first alias found in a header wins.
#[derive(Debug, Clone)]
pub struct FieldAliasTable {
    entries: Vec<(Field, Vec<String>)>,
}

impl Default for FieldAliasTable {
    fn default() -> Self {
        FieldAliasTable {
            entries: Field::ALL
                .iter()
                .map(|&f| (f, f.default_aliases().iter().map(|a| a.to_string()).collect()))
                .collect(),
        }
    }
}

impl FieldAliasTable {
    /// Build a table from explicit entries. Fields left out have no aliases
    /// and never resolve.
    pub fn new(entries: Vec<(Field, Vec<String>)>) -> Result<Self, AppError> {
        let table = FieldAliasTable { entries };
        table.check_disjoint()?;
        Ok(table)
    }

    /// Default table with some fields' alias lists replaced.
    pub fn with_overrides(overrides: &BTreeMap<Field, Vec<String>>) -> Result<Self, AppError> {
        let mut table = FieldAliasTable::default();
        for (field, aliases) in &mut table.entries {
            if let Some(replacement) = overrides.get(field) {
                *aliases = replacement.clone();
            }
        }
        table.check_disjoint()?;
        Ok(table)
    }

    pub fn aliases(&self, field: Field) -> &[String] {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, a)| a.as_slice())
            .unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.entries.iter().map(|(f, _)| *f)
    }

    fn check_disjoint(&self) -> Result<(), AppError> {
        let mut owner: HashMap<String, Field> = HashMap::new();
        for (field, aliases) in &self.entries {
            for alias in aliases {
                let key = alias.trim().to_lowercase();
                match owner.get(&key) {
                    Some(other) if other != field => {
                        return Err(AppError::InvalidAliasTable(format!(
                            "alias {:?} is used by both {} and {}",
                            alias,
                            other.label(),
                            field.label()
                        )));
                    }
                    _ => {
                        owner.insert(key, *field);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Header matching one of `aliases`: exact match over the
/// whole alias list first, then a case-insensitive pass.
fn find_header<'a, I>(headers: I, aliases: &[String]) -> Option<&'a str>
where
    I: Iterator<Item = &'a str> + Clone,
{
    for alias in aliases {
        if let Some(h) = headers.clone().find(|h| *h == alias.as_str()) {
            return Some(h);
        }
    }
    for alias in aliases {
        let wanted = alias.to_lowercase();
        if let Some(h) = headers.clone().find(|h| h.to_lowercase() == wanted) {
            return Some(h);
        }
    }
    None
}

/// Cell under the first alias present in `row`.
pub fn find_column_cell<'r>(row: &'r RawRow, aliases: &[String]) -> Option<&'r CellValue> {
    find_header(row.headers(), aliases).and_then(|h| row.get(h))
}

/// Trimmed string value of the first alias present in `row`, or "".
pub fn find_column_value(row: &RawRow, aliases: &[String]) -> String {
    find_column_cell(row, aliases)
        .map(CellValue::to_trimmed_string)
        .unwrap_or_default()
}

/// Header text resolved for each canonical field of one file.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    resolved: Vec<(Field, String)>,
    headers: Vec<String>,
}

impl ColumnMap {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.resolved
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, h)| h.as_str())
    }

    pub fn has(&self, field: Field) -> bool {
        self.get(field).is_some()
    }

    /// All header names in file order.
    pub fn all_headers(&self) -> &[String] {
        &self.headers
    }

    /// Optional fields with no matching header; every row reads "" for them.
    pub fn missing_optional(&self, aliases: &FieldAliasTable) -> Vec<String> {
        aliases
            .fields()
            .filter(|f| !f.is_required() && !self.has(*f))
            .map(|f| f.label().to_string())
            .collect()
    }
}

/// Map the header row to canonical fields. Fails if a required field has
/// no matching header.
pub fn resolve_columns(
    headers: &[String],
    aliases: &FieldAliasTable,
) -> Result<ColumnMap, AppError> {
    let resolved: Vec<(Field, String)> = aliases
        .fields()
        .filter_map(|field| {
            find_header(headers.iter().map(String::as_str), aliases.aliases(field))
                .map(|h| (field, h.to_string()))
        })
        .collect();

    let missing_required: Vec<String> = REQUIRED
        .iter()
        .filter(|f| !resolved.iter().any(|(r, _)| r == *f))
        .map(|f| f.label().to_string())
        .collect();

    if !missing_required.is_empty() {
        return Err(AppError::MissingColumns(missing_required));
    }

    Ok(ColumnMap {
        resolved,
        headers: headers.to_vec(),
    })
}
