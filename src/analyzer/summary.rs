use serde::Serialize;

use crate::analyzer::normalizers::{NormalizerRules, Priority};
use crate::analyzer::sla::SlaOutcome;
use crate::analyzer::stats::{mean, percentile, round2};
use crate::parser::types::Ticket;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaCounts {
    pub total: usize,
    pub within: usize,
    pub breached: usize,
    pub not_computed: usize,
}

impl SlaCounts {
    fn add(&mut self, outcome: Option<&SlaOutcome>) {
        self.total += 1;
        match outcome {
            Some(SlaOutcome::Computed(r)) if r.within_sla => self.within += 1,
            Some(SlaOutcome::Computed(_)) => self.breached += 1,
            Some(SlaOutcome::NotComputed(_)) | None => self.not_computed += 1,
        }
    }

    /// Share of classified tickets within SLA, in percent. 0 when nothing
    /// could be classified.
    pub fn compliance_pct(&self) -> f64 {
        let classified = self.within + self.breached;
        if classified == 0 {
            return 0.0;
        }
        round2(self.within as f64 * 100.0 / classified as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritySla {
    pub priority: Priority,
    #[serde(flatten)]
    pub counts: SlaCounts,
    pub compliance_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaSummary {
    #[serde(flatten)]
    pub counts: SlaCounts,
    pub compliance_pct: f64,
    pub mean_hours_over: f64,
    pub p90_hours_over: f64,
    pub by_priority: Vec<PrioritySla>,
}

/// Aggregate the SLA outcomes already attached to `records`.
/// Tickets without an attached outcome count as not computed.
pub fn summarize_sla(records: &[Ticket], rules: &NormalizerRules) -> SlaSummary {
    let tiers = [
        Priority::P1,
        Priority::P2,
        Priority::P3,
        Priority::P4,
        Priority::Undefined,
    ];
    let mut counts = SlaCounts::default();
    let mut per_tier: Vec<SlaCounts> = vec![SlaCounts::default(); tiers.len()];
    let mut overs: Vec<f64> = Vec::new();

    for ticket in records {
        let outcome = ticket.sla.as_ref();
        counts.add(outcome);

        let priority = rules.normalize_priority(&ticket.priority);
        if let Some(i) = tiers.iter().position(|p| *p == priority) {
            per_tier[i].add(outcome);
        }

        if let Some(SlaOutcome::Computed(r)) = outcome {
            if !r.within_sla {
                overs.push(r.hours_over_threshold);
            }
        }
    }

    let by_priority = tiers
        .iter()
        .zip(per_tier)
        .filter(|(_, c)| c.total > 0)
        .map(|(p, c)| PrioritySla {
            priority: *p,
            compliance_pct: c.compliance_pct(),
            counts: c,
        })
        .collect();

    SlaSummary {
        compliance_pct: counts.compliance_pct(),
        counts,
        mean_hours_over: round2(mean(&overs)),
        p90_hours_over: round2(percentile(&overs, 90.0)),
        by_priority,
    }
}
