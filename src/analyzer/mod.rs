pub mod normalizers;
pub mod rules;
pub mod sla;
pub mod stats;
pub mod summary;

pub use normalizers::{
    get_incident_state, is_cancelled, normalize_location_name, normalize_priority,
    IncidentState, NormalizerRules, Priority,
};
pub use sla::{evaluate_sla, SlaEngine, SlaOutcome, SlaResult, SlaThresholds, SLA_THRESHOLDS};
pub use summary::{summarize_sla, SlaSummary};
