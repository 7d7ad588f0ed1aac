use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::analyzer::rules::{Matcher, MatcherSet, Rule, RuleTable};

/// Canonical priority tier. `Undefined` is the sentinel for text that no
/// tier rule recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    P1,
    P2,
    P3,
    P4,
    #[serde(rename = "undefined")]
    Undefined,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
            Priority::P4 => "P4",
            Priority::Undefined => "undefined",
        }
    }

    /// Parse the stored form written by `as_str`, case-insensitively.
    pub fn from_canonical(input: &str) -> Option<Priority> {
        match input.trim().to_ascii_lowercase().as_str() {
            "p1" => Some(Priority::P1),
            "p2" => Some(Priority::P2),
            "p3" => Some(Priority::P3),
            "p4" => Some(Priority::P4),
            "undefined" => Some(Priority::Undefined),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle buckets a state rule can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalState {
    Open,
    InProgress,
    Closed,
}

/// Result of state normalisation. Unrecognised text is carried through
/// verbatim and must be treated as "unknown", not as one of the buckets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IncidentState {
    Open,
    InProgress,
    Closed,
    Unrecognized(String),
}

impl IncidentState {
    /// Label shown on the dashboard.
    pub fn label(&self) -> &str {
        match self {
            IncidentState::Open => "Aberto",
            IncidentState::InProgress => "Em Andamento",
            IncidentState::Closed => "Fechado",
            IncidentState::Unrecognized(original) => original,
        }
    }

    pub fn is_closed(&self) -> bool {
        *self == IncidentState::Closed
    }
}

impl From<CanonicalState> for IncidentState {
    fn from(state: CanonicalState) -> Self {
        match state {
            CanonicalState::Open => IncidentState::Open,
            CanonicalState::InProgress => IncidentState::InProgress,
            CanonicalState::Closed => IncidentState::Closed,
        }
    }
}

impl fmt::Display for IncidentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rule tables behind every value normaliser. The built-in set covers the
/// English and Portuguese vocabularies seen in exports; a host can replace
/// any table from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizerRules {
    pub priority: RuleTable<Priority>,
    pub state: RuleTable<CanonicalState>,
    pub cancelled: MatcherSet,
    /// States title-cased by the row validator (closed and cancelled wording).
    pub closing_states: MatcherSet,
    pub location: RuleTable<String>,
}

impl Default for NormalizerRules {
    fn default() -> Self {
        NormalizerRules {
            priority: default_priority_rules(),
            state: default_state_rules(),
            cancelled: MatcherSet::contains(&["cancel", "cancelled", "canceled", "cancelado", "cancelada"]),
            closing_states: MatcherSet::exact(&[
                "closed", "resolved", "fechado", "resolvido", "encerrado",
                "cancelled", "canceled", "cancelado", "cancelada",
            ]),
            location: default_location_rules(),
        }
    }
}

fn tier(value: Priority, words: &[&str], prefixes: &[&str]) -> Rule<Priority> {
    let matchers = words
        .iter()
        .map(|w| Matcher::exact(w))
        .chain(prefixes.iter().map(|p| Matcher::prefix(p)))
        .collect();
    Rule::new(value, matchers)
}

fn default_priority_rules() -> RuleTable<Priority> {
    RuleTable::new(vec![
        tier(
            Priority::P1,
            &["p1", "1", "critical", "crítico", "critico", "crítica", "critica", "urgent", "urgente"],
            &["1 -", "p1 -", "1-", "p1-"],
        ),
        tier(
            Priority::P2,
            &["p2", "2", "high", "alta", "alto"],
            &["2 -", "p2 -", "2-", "p2-"],
        ),
        tier(
            Priority::P3,
            &["p3", "3", "medium", "moderate", "média", "media", "moderada", "médio", "medio"],
            &["3 -", "p3 -", "3-", "p3-"],
        ),
        tier(
            Priority::P4,
            &["p4", "4", "low", "planning", "baixa", "baixo", "planejamento"],
            &["4 -", "p4 -", "4-", "p4-"],
        ),
    ])
}

fn default_state_rules() -> RuleTable<CanonicalState> {
    let exact = |words: &[&str]| -> Vec<Matcher> { words.iter().map(|w| Matcher::exact(w)).collect() };
    RuleTable::new(vec![
        Rule::new(CanonicalState::Open, exact(&["aberto", "new", "novo", "open"])),
        Rule::new(
            CanonicalState::InProgress,
            exact(&["em andamento", "in progress", "work in progress", "em atendimento"]),
        ),
        Rule::new(
            CanonicalState::Closed,
            exact(&["fechado", "closed", "resolved", "resolvido", "encerrado"]),
        ),
    ])
}

fn default_location_rules() -> RuleTable<String> {
    let rewrite = |label: &str, names: &[&str]| {
        Rule::new(label.to_string(), names.iter().map(|n| Matcher::exact(n)).collect())
    };
    RuleTable::new(vec![
        rewrite("SP - Service Desk", &["service desk sao paulo", "service desk são paulo", "sd sao paulo", "sd são paulo"]),
        rewrite("SP - N2", &["suporte n2 sao paulo", "suporte n2 são paulo", "second level sao paulo"]),
        rewrite("CPS - Suporte", &["suporte campinas", "campinas support", "suporte local campinas"]),
        rewrite("RJ - Infra", &["infraestrutura rio de janeiro", "infra rio", "rio de janeiro infrastructure"]),
        rewrite("CWB - Field", &["field services curitiba", "atendimento de campo curitiba"]),
        rewrite("BH - Redes", &["redes belo horizonte", "network belo horizonte"]),
        rewrite("NOC", &["network operations center", "centro de operações de rede", "noc 24x7"]),
    ])
}

impl NormalizerRules {
    /// Shared built-in rule set.
    pub fn builtin() -> &'static NormalizerRules {
        static BUILTIN: OnceLock<NormalizerRules> = OnceLock::new();
        BUILTIN.get_or_init(NormalizerRules::default)
    }

    /// Canonical tier tokens are recognised before the rule table, so a
    /// stored tier normalises to itself whatever table is configured.
    pub fn normalize_priority(&self, input: &str) -> Priority {
        Priority::from_canonical(input)
            .or_else(|| self.priority.classify(input).copied())
            .unwrap_or(Priority::Undefined)
    }

    pub fn incident_state(&self, input: &str) -> IncidentState {
        match self.state.classify(input) {
            Some(state) => IncidentState::from(*state),
            None => IncidentState::Unrecognized(input.to_string()),
        }
    }

    pub fn is_cancelled(&self, input: &str) -> bool {
        self.cancelled.matches(input)
    }

    /// Closed or cancelled wording, used for the SLA closed-timestamp fallback.
    pub fn is_terminal(&self, input: &str) -> bool {
        self.incident_state(input).is_closed() || self.is_cancelled(input)
    }

    pub fn is_closing_state(&self, input: &str) -> bool {
        self.closing_states.matches(input)
    }

    pub fn normalize_location_name(&self, input: &str) -> String {
        self.location
            .classify(input)
            .cloned()
            .unwrap_or_else(|| input.to_string())
    }
}

pub fn normalize_priority(input: &str) -> Priority {
    NormalizerRules::builtin().normalize_priority(input)
}

pub fn get_incident_state(input: &str) -> IncidentState {
    NormalizerRules::builtin().incident_state(input)
}

pub fn is_cancelled(input: &str) -> bool {
    NormalizerRules::builtin().is_cancelled(input)
}

pub fn normalize_location_name(input: &str) -> String {
    NormalizerRules::builtin().normalize_location_name(input)
}

/// "CANCELADO" → "Cancelado", "work in progress" → "Work In Progress".
pub fn title_case(input: &str) -> String {
    input
        .trim()
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_words_and_codes() {
        assert_eq!(normalize_priority("Crítico"), Priority::P1);
        assert_eq!(normalize_priority("1"), Priority::P1);
        assert_eq!(normalize_priority("1 - Critical"), Priority::P1);
        assert_eq!(normalize_priority("P2 - Alta"), Priority::P2);
        assert_eq!(normalize_priority("  HIGH "), Priority::P2);
        assert_eq!(normalize_priority("Média"), Priority::P3);
        assert_eq!(normalize_priority("3 - Moderate"), Priority::P3);
        assert_eq!(normalize_priority("Baixa"), Priority::P4);
        assert_eq!(normalize_priority("4 - Low"), Priority::P4);
    }

    #[test]
    fn test_priority_unrecognised_is_undefined() {
        assert_eq!(normalize_priority("whenever"), Priority::Undefined);
        assert_eq!(normalize_priority(""), Priority::Undefined);
        assert_eq!(normalize_priority("10 - Something"), Priority::Undefined);
    }

    #[test]
    fn test_priority_idempotent() {
        for input in ["Crítico", "2", "p3 - x", "Baixo", "nonsense", "", "undefined", "P4"] {
            let once = normalize_priority(input);
            let twice = normalize_priority(once.as_str());
            assert_eq!(once, twice, "input {input:?}");
        }
    }

    #[test]
    fn test_incident_state_buckets() {
        assert_eq!(get_incident_state("Aberto"), IncidentState::Open);
        assert_eq!(get_incident_state("NEW"), IncidentState::Open);
        assert_eq!(get_incident_state("Work in Progress"), IncidentState::InProgress);
        assert_eq!(get_incident_state("Em andamento"), IncidentState::InProgress);
        assert_eq!(get_incident_state("Resolved"), IncidentState::Closed);
        assert_eq!(get_incident_state("fechado").label(), "Fechado");
    }

    #[test]
    fn test_incident_state_passthrough() {
        let state = get_incident_state("Aguardando usuário");
        assert_eq!(state, IncidentState::Unrecognized("Aguardando usuário".into()));
        assert_eq!(state.to_string(), "Aguardando usuário");
        assert_eq!(get_incident_state(""), IncidentState::Unrecognized(String::new()));
    }

    #[test]
    fn test_is_cancelled_substring() {
        assert!(is_cancelled("Cancelado"));
        assert!(is_cancelled("Canceled by caller"));
        assert!(is_cancelled("CANCELLATION requested"));
        assert!(!is_cancelled("Closed"));
        assert!(!is_cancelled(""));
    }

    #[test]
    fn test_terminal_states() {
        let rules = NormalizerRules::builtin();
        assert!(rules.is_terminal("Closed"));
        assert!(rules.is_terminal("cancelada"));
        assert!(!rules.is_terminal("Em andamento"));
    }

    #[test]
    fn test_location_rewrite_and_passthrough() {
        assert_eq!(normalize_location_name("Service Desk São Paulo"), "SP - Service Desk");
        assert_eq!(normalize_location_name("SUPORTE CAMPINAS"), "CPS - Suporte");
        assert_eq!(normalize_location_name("Equipe Recife"), "Equipe Recife");
        assert_eq!(normalize_location_name(""), "");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("CANCELADO"), "Cancelado");
        assert_eq!(title_case("closed"), "Closed");
        assert_eq!(title_case("work  in progress"), "Work In Progress");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_rules_override_from_json() {
        let json = r#"{
            "priority": [
                {"value": "P1", "match": [{"kind": "exact", "pattern": "Sev1"}]}
            ]
        }"#;
        let rules: NormalizerRules = serde_json::from_str(json).unwrap();
        assert_eq!(rules.normalize_priority("sev1"), Priority::P1);
        assert_eq!(rules.normalize_priority("Crítico"), Priority::Undefined);
        // Tables left out keep their defaults.
        assert_eq!(rules.incident_state("Aberto"), IncidentState::Open);
    }

    #[test]
    fn test_priority_idempotent_with_custom_table() {
        let json = r#"{
            "priority": [
                {"value": "P1", "match": [{"kind": "exact", "pattern": "Sev1"}]},
                {"value": "P3", "match": [{"kind": "prefix", "pattern": "sev3"}]}
            ]
        }"#;
        let rules: NormalizerRules = serde_json::from_str(json).unwrap();
        for input in ["Sev1", "sev3 - minor", "P2", "p4", "undefined", "Crítico", ""] {
            let once = rules.normalize_priority(input);
            let twice = rules.normalize_priority(once.as_str());
            assert_eq!(once, twice, "input {input:?}");
        }
        assert_eq!(rules.normalize_priority("P1"), Priority::P1);
        assert_eq!(rules.normalize_priority(" p2 "), Priority::P2);
    }

    #[test]
    fn test_from_canonical() {
        assert_eq!(Priority::from_canonical("P3"), Some(Priority::P3));
        assert_eq!(Priority::from_canonical("Undefined"), Some(Priority::Undefined));
        assert_eq!(Priority::from_canonical("P5"), None);
        assert_eq!(Priority::from_canonical("1"), None);
    }
}
