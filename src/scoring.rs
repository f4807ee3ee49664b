/// ISO 21434 Risk Scoring
///
/// Pure scoring functions for threat analysis and risk assessment:
/// attack feasibility from CVSS-like parameters, impact from damage
/// dimensions, and risk level from the fixed feasibility/impact matrix.
///
/// Key ISO 21434 requirements addressed:
/// - 8.4.3: Impact rating
/// - 8.4.4: Attack feasibility rating
/// - 8.4.5: Risk value determination
///
/// All tables are fixed at compile time. Scoring is total over arbitrary
/// label strings: an unrecognized label scores 0 rather than failing, so a
/// half-filled or drifted record still flows through the pipeline.
use crate::types::{Feasibility, ImpactLevel, RiskLevel, TreatmentDecision};

/// Attack vector ordinal (Physical=0, Local=1, Adjacent=2, Network=3)
pub fn attack_vector_score(label: &str) -> u8 {
    match label {
        "Physical" => 0,
        "Local" => 1,
        "Adjacent" => 2,
        "Network" => 3,
        _ => 0,
    }
}

/// Attack complexity ordinal (High=0, Low=1)
pub fn attack_complexity_score(label: &str) -> u8 {
    match label {
        "High" => 0,
        "Low" => 1,
        _ => 0,
    }
}

/// Privileges required ordinal (High=0, Low=1, None=2)
pub fn privileges_required_score(label: &str) -> u8 {
    match label {
        "High" => 0,
        "Low" => 1,
        "None" => 2,
        _ => 0,
    }
}

/// User interaction ordinal (Required=0, None=1)
pub fn user_interaction_score(label: &str) -> u8 {
    match label {
        "Required" => 0,
        "None" => 1,
        _ => 0,
    }
}

/// Impact dimension ordinal: S0/F0/O0/P0=0 up to S3/F3/O3/P3=3
pub fn impact_score(label: &str) -> u8 {
    match label {
        "S0" | "F0" | "O0" | "P0" => 0,
        "S1" | "F1" | "O1" | "P1" => 1,
        "S2" | "F2" | "O2" | "P2" => 2,
        "S3" | "F3" | "O3" | "P3" => 3,
        _ => 0,
    }
}

/// Feasibility buckets over the summed parameter ordinals (0-8).
/// Inclusive upper bounds, checked in order.
const FEASIBILITY_THRESHOLDS: [(u8, Feasibility); 4] = [
    (2, Feasibility::VeryLow),
    (4, Feasibility::Low),
    (6, Feasibility::Medium),
    (8, Feasibility::High),
];

/// Risk matrix indexed [feasibility][impact], levels 1-5
pub const RISK_MATRIX: [[u8; 4]; 4] = [
    [1, 1, 1, 2], // Very Low feasibility
    [1, 1, 2, 3], // Low feasibility
    [1, 2, 3, 4], // Medium feasibility
    [2, 3, 4, 5], // High feasibility
];

/// Calculate attack feasibility from the four attack parameters.
///
/// Feasibility is undefined unless all four parameters are supplied.
pub fn feasibility(
    attack_vector: Option<&str>,
    attack_complexity: Option<&str>,
    privileges_required: Option<&str>,
    user_interaction: Option<&str>,
) -> Option<Feasibility> {
    let (av, ac, pr, ui) = (
        attack_vector?,
        attack_complexity?,
        privileges_required?,
        user_interaction?,
    );

    let total = attack_vector_score(av)
        + attack_complexity_score(ac)
        + privileges_required_score(pr)
        + user_interaction_score(ui);

    for (threshold, bucket) in FEASIBILITY_THRESHOLDS {
        if total <= threshold {
            return Some(bucket);
        }
    }

    Some(Feasibility::High)
}

/// Calculate impact as the maximum over the supplied damage dimensions.
///
/// Absent dimensions are excluded. With all four absent, impact is
/// undefined.
pub fn impact(
    safety: Option<&str>,
    financial: Option<&str>,
    operational: Option<&str>,
    privacy: Option<&str>,
) -> Option<ImpactLevel> {
    let max = [safety, financial, operational, privacy]
        .into_iter()
        .flatten()
        .map(impact_score)
        .max()?;

    Some(ImpactLevel::from_value(max))
}

/// Look up the risk level for a (feasibility, impact) ordinal pair.
///
/// Undefined if either ordinal is absent. Out-of-range ordinals are
/// clamped to [0,3] before lookup.
pub fn risk_level(feasibility_value: Option<u8>, impact_value: Option<u8>) -> Option<RiskLevel> {
    let feas_idx = feasibility_value?.min(3) as usize;
    let impact_idx = impact_value?.min(3) as usize;

    RiskLevel::from_level(RISK_MATRIX[feas_idx][impact_idx])
}

/// Suggest a treatment decision for a risk level.
///
/// A default suggestion only; an explicit decision already recorded on a
/// threat is never overwritten. An unassessed threat maps to Accept.
pub fn suggest_treatment(risk: Option<RiskLevel>) -> TreatmentDecision {
    match risk {
        None => TreatmentDecision::Accept,
        Some(level) => match level.level() {
            1 | 2 => TreatmentDecision::Accept,
            3 | 4 => TreatmentDecision::Reduce,
            _ => TreatmentDecision::Avoid,
        },
    }
}
