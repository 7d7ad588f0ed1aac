use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzer::normalizers::{NormalizerRules, Priority};
use crate::analyzer::stats::round2;
use crate::parser::deserializers::parse_flexible_date;
use crate::parser::types::Ticket;

/// Maximum hours between opening and last activity, per priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlaThresholds {
    pub p1: f64,
    pub p2: f64,
    pub p3: f64,
    pub p4: f64,
    /// Applied when the priority is not one of P1–P4.
    pub fallback: f64,
}

pub const SLA_THRESHOLDS: SlaThresholds = SlaThresholds {
    p1: 1.0,
    p2: 4.0,
    p3: 36.0,
    p4: 72.0,
    fallback: 36.0,
};

impl Default for SlaThresholds {
    fn default() -> Self {
        SLA_THRESHOLDS
    }
}

impl SlaThresholds {
    pub fn hours_for(&self, priority: Priority) -> f64 {
        match priority {
            Priority::P1 => self.p1,
            Priority::P2 => self.p2,
            Priority::P3 => self.p3,
            Priority::P4 => self.p4,
            Priority::Undefined => self.fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaResult {
    #[serde(rename = "withinSLA")]
    pub within_sla: bool,
    /// 0 when within SLA, otherwise fractional hours rounded to 2 decimals.
    pub hours_over_threshold: f64,
    pub elapsed_hours: f64,
    pub threshold_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotComputedReason {
    /// Opened is missing or does not parse.
    InvalidOpened,
    /// Last activity precedes opening.
    NegativeDuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "camelCase")]
pub enum SlaOutcome {
    Computed(SlaResult),
    NotComputed(NotComputedReason),
}

impl SlaOutcome {
    pub fn result(&self) -> Option<&SlaResult> {
        match self {
            SlaOutcome::Computed(r) => Some(r),
            SlaOutcome::NotComputed(_) => None,
        }
    }

    pub fn is_breached(&self) -> bool {
        matches!(self, SlaOutcome::Computed(r) if !r.within_sla)
    }
}

impl fmt::Display for SlaOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlaOutcome::Computed(r) if r.within_sla => f.write_str("within SLA"),
            SlaOutcome::Computed(r) => write!(f, "+{:.2}h", r.hours_over_threshold),
            SlaOutcome::NotComputed(_) => f.write_str("not computed"),
        }
    }
}

/// Classifies tickets against the threshold table. Tickets with no usable
/// last-activity timestamp are measured up to `assume_open_as_of`.
#[derive(Debug, Clone)]
pub struct SlaEngine<'a> {
    thresholds: SlaThresholds,
    rules: &'a NormalizerRules,
    assume_open_as_of: DateTime<Utc>,
}

impl<'a> SlaEngine<'a> {
    pub fn new(
        thresholds: SlaThresholds,
        rules: &'a NormalizerRules,
        assume_open_as_of: DateTime<Utc>,
    ) -> Self {
        SlaEngine {
            thresholds,
            rules,
            assume_open_as_of,
        }
    }

    /// Updated if it parses; else Closed if the state is closed or cancelled
    /// and Closed parses; else the assumed "as of" instant.
    fn last_timestamp(&self, ticket: &Ticket) -> DateTime<Utc> {
        if let Some(updated) = parse_flexible_date(&ticket.updated) {
            return updated;
        }
        if self.rules.is_terminal(&ticket.state) {
            if let Some(closed) = parse_flexible_date(&ticket.closed) {
                return closed;
            }
        }
        self.assume_open_as_of
    }

    pub fn evaluate(&self, ticket: &Ticket) -> SlaOutcome {
        let threshold = self
            .thresholds
            .hours_for(self.rules.normalize_priority(&ticket.priority));

        let Some(opened) = parse_flexible_date(&ticket.opened) else {
            return SlaOutcome::NotComputed(NotComputedReason::InvalidOpened);
        };
        let last = self.last_timestamp(ticket);

        let elapsed_hours = (last - opened).num_milliseconds() as f64 / 3_600_000.0;
        if !elapsed_hours.is_finite() || elapsed_hours < 0.0 {
            return SlaOutcome::NotComputed(NotComputedReason::NegativeDuration);
        }

        let within_sla = elapsed_hours <= threshold;
        SlaOutcome::Computed(SlaResult {
            within_sla,
            hours_over_threshold: if within_sla {
                0.0
            } else {
                round2(elapsed_hours - threshold)
            },
            elapsed_hours: round2(elapsed_hours),
            threshold_hours: threshold,
        })
    }

    /// Attach the outcome to every ticket.
    pub fn attach(&self, records: &mut [Ticket]) {
        for ticket in records.iter_mut() {
            ticket.sla = Some(self.evaluate(ticket));
        }
    }
}

/// Evaluate one ticket with the built-in rules and thresholds.
pub fn evaluate_sla(ticket: &Ticket, assume_open_as_of: DateTime<Utc>) -> SlaOutcome {
    SlaEngine::new(SLA_THRESHOLDS, NormalizerRules::builtin(), assume_open_as_of).evaluate(ticket)
}
