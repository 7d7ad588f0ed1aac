use serde::{Deserialize, Serialize};

/// A single text predicate. Patterns are compared against the trimmed,
/// lower-cased input; they are lower-cased themselves when a table is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pattern", rename_all = "camelCase")]
pub enum Matcher {
    Exact(String),
    Prefix(String),
    Contains(String),
}

impl Matcher {
    pub fn exact(p: &str) -> Self {
        Matcher::Exact(p.to_lowercase())
    }

    pub fn prefix(p: &str) -> Self {
        Matcher::Prefix(p.to_lowercase())
    }

    pub fn contains(p: &str) -> Self {
        Matcher::Contains(p.to_lowercase())
    }

    fn lowered(self) -> Self {
        match self {
            Matcher::Exact(p) => Matcher::Exact(p.to_lowercase()),
            Matcher::Prefix(p) => Matcher::Prefix(p.to_lowercase()),
            Matcher::Contains(p) => Matcher::Contains(p.to_lowercase()),
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        match self {
            Matcher::Exact(p) => lowered == p,
            Matcher::Prefix(p) => lowered.starts_with(p.as_str()),
            Matcher::Contains(p) => lowered.contains(p.as_str()),
        }
    }
}

fn lower_input(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Unordered set of matchers: true when any of them matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Matcher>", into = "Vec<Matcher>")]
pub struct MatcherSet(Vec<Matcher>);

impl From<Vec<Matcher>> for MatcherSet {
    fn from(matchers: Vec<Matcher>) -> Self {
        MatcherSet(matchers.into_iter().map(Matcher::lowered).collect())
    }
}

impl From<MatcherSet> for Vec<Matcher> {
    fn from(set: MatcherSet) -> Self {
        set.0
    }
}

impl MatcherSet {
    pub fn exact(patterns: &[&str]) -> Self {
        MatcherSet(patterns.iter().map(|p| Matcher::exact(p)).collect())
    }

    pub fn contains(patterns: &[&str]) -> Self {
        MatcherSet(patterns.iter().map(|p| Matcher::contains(p)).collect())
    }

    pub fn matches(&self, input: &str) -> bool {
        let lowered = lower_input(input);
        self.matches_lowered(&lowered)
    }

    fn matches_lowered(&self, lowered: &str) -> bool {
        self.0.iter().any(|m| m.matches(lowered))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule<T> {
    pub value: T,
    #[serde(rename = "match")]
    pub matchers: MatcherSet,
}

impl<T> Rule<T> {
    pub fn new(value: T, matchers: Vec<Matcher>) -> Self {
        Rule {
            value,
            matchers: MatcherSet::from(matchers),
        }
    }
}

/// Ordered `(predicate, value)` rules evaluated top to bottom; the first
/// matching rule wins. Callers supply their own fallback for `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable<T> {
    rules: Vec<Rule<T>>,
}

impl<T> RuleTable<T> {
    pub fn new(rules: Vec<Rule<T>>) -> Self {
        RuleTable { rules }
    }

    pub fn classify(&self, input: &str) -> Option<&T> {
        let lowered = lower_input(input);
        if lowered.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|r| r.matchers.matches_lowered(&lowered))
            .map(|r| &r.value)
    }
}
