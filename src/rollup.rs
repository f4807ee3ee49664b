/// Project Risk Rollup (ISO 21434 risk reporting)
///
/// Read-only aggregates over all threats of a project: a 4x4
/// feasibility/impact count matrix, per-level threat counts, and a
/// formatted risk report. Recomputed on demand, never persisted.
use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::threat::ThreatScenario;

/// Aggregated risk view of a project's threats
#[derive(Debug, Clone, Serialize)]
pub struct RiskRollup {
    /// Count matrix indexed [feasibility][impact], ordinals clamped to [0,3]
    pub matrix: [[u32; 4]; 4],
    /// Threat count per risk level (1-5); unassessed threats are excluded
    pub threat_counts: BTreeMap<u8, u32>,
    /// Every threat of the project, assessed or not
    pub total_threats: u32,
    /// Threats at level 4 or 5
    pub high_risk_count: u32,
}

/// Build the rollup over all threats of a project.
pub fn risk_rollup<'a, T>(threats: T) -> RiskRollup
where
    T: IntoIterator<Item = &'a ThreatScenario>,
{
    let mut matrix = [[0u32; 4]; 4];
    let mut threat_counts: BTreeMap<u8, u32> = (1..=5).map(|level| (level, 0)).collect();
    let mut total_threats = 0;

    for threat in threats {
        total_threats += 1;

        if let (Some(feasibility), Some(impact)) = (threat.attack_feasibility, threat.impact_level)
        {
            let feas_idx = feasibility.value().min(3) as usize;
            let impact_idx = impact.value().min(3) as usize;
            matrix[feas_idx][impact_idx] += 1;
        }

        if let Some(risk) = threat.risk_level {
            if let Some(count) = threat_counts.get_mut(&risk.level()) {
                *count += 1;
            }
        }
    }

    let high_risk_count = threat_counts.get(&4).copied().unwrap_or(0)
        + threat_counts.get(&5).copied().unwrap_or(0);

    RiskRollup {
        matrix,
        threat_counts,
        total_threats,
        high_risk_count,
    }
}

/// Render a formatted risk report for a project.
///
/// Threats are listed sorted by risk level, highest first, followed by the
/// per-level counts and the feasibility/impact matrix.
pub fn render_report(project_name: &str, threats: &[&ThreatScenario]) -> String {
    let rollup = risk_rollup(threats.iter().copied());
    let mut report = String::new();

    report.push_str("═══════════════════════════════════════════════════════════════════\n");
    report.push_str("           ISO 21434 THREAT ANALYSIS AND RISK ASSESSMENT\n");
    report.push_str("═══════════════════════════════════════════════════════════════════\n\n");

    report.push_str(&format!("Project: {}\n", project_name));
    report.push_str(&format!("Total Threats: {}\n", rollup.total_threats));
    report.push_str(&format!("High Risk (level 4-5): {}\n\n", rollup.high_risk_count));

    report.push_str("───────────────────────────────────────────────────────────────────\n");
    report.push_str("THREAT SCENARIOS\n");
    report.push_str("───────────────────────────────────────────────────────────────────\n\n");

    let mut sorted: Vec<&ThreatScenario> = threats.to_vec();
    sorted.sort_by(|a, b| b.risk_level.cmp(&a.risk_level).then(a.threat_id.cmp(&b.threat_id)));

    for threat in sorted {
        report.push_str(&format!("[{}] {}\n", threat.threat_id, threat.threat_description));
        report.push_str(&format!(
            "  STRIDE: {} | Attribute: {}\n",
            threat.stride_type, threat.security_attribute
        ));
        match threat.risk_level {
            Some(risk) => report.push_str(&format!("  Risk: {} (level {})\n", risk, risk.level())),
            None => report.push_str(&format!("  Risk: {}\n", "not assessed".dimmed())),
        }
        if let Some(feasibility) = threat.attack_feasibility {
            report.push_str(&format!("  Feasibility: {}\n", feasibility));
        }
        if let Some(impact) = threat.impact_level {
            report.push_str(&format!("  Impact: {}\n", impact));
        }
        if let Some(decision) = threat.treatment_decision {
            report.push_str(&format!("  Treatment: {}\n", decision));
        }
        report.push('\n');
    }

    report.push_str("───────────────────────────────────────────────────────────────────\n");
    report.push_str("RISK SUMMARY\n");
    report.push_str("───────────────────────────────────────────────────────────────────\n\n");

    report.push_str("Threats by risk level:\n");
    for (level, count) in &rollup.threat_counts {
        report.push_str(&format!("  Level {}: {}\n", level, count));
    }
    report.push('\n');

    report.push_str("Feasibility \\ Impact matrix:\n");
    report.push_str("             Negligible  Moderate  Major  Severe\n");
    let row_labels = ["Very Low", "Low", "Medium", "High"];
    for (row, label) in rollup.matrix.iter().zip(row_labels) {
        report.push_str(&format!(
            "  {:<10} {:>9} {:>9} {:>6} {:>7}\n",
            label, row[0], row[1], row[2], row[3]
        ));
    }

    report.push_str("\n═══════════════════════════════════════════════════════════════════\n");

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threat::ThreatCreate;
    use crate::types::StrideType;

    fn threat(
        id: u64,
        threat_id: &str,
        attack: Option<(&str, &str, &str, &str)>,
        impacts: Option<(&str, &str, &str, &str)>,
    ) -> ThreatScenario {
        ThreatScenario::new(
            id,
            1,
            ThreatCreate {
                asset_id: 1,
                threat_id: threat_id.to_string(),
                security_attribute: "Integrity".to_string(),
                stride_type: StrideType::Tampering,
                threat_description: "test".to_string(),
                damage_scenario: None,
                attack_path: None,
                source_reference: None,
                wp29_mapping: None,
                attack_vector: attack.map(|a| a.0.to_string()),
                attack_complexity: attack.map(|a| a.1.to_string()),
                privileges_required: attack.map(|a| a.2.to_string()),
                user_interaction: attack.map(|a| a.3.to_string()),
                impact_safety: impacts.map(|i| i.0.to_string()),
                impact_financial: impacts.map(|i| i.1.to_string()),
                impact_operational: impacts.map(|i| i.2.to_string()),
                impact_privacy: impacts.map(|i| i.3.to_string()),
            },
            false,
        )
    }

    #[test]
    fn test_rollup_counts() {
        let threats = vec![
            // feasibility High(3), impact Severe(3) -> level 5
            threat(
                1,
                "T-001",
                Some(("Network", "Low", "None", "None")),
                Some(("S3", "F1", "O1", "P1")),
            ),
            // feasibility Very Low(0), impact Negligible(0) -> level 1
            threat(
                2,
                "T-002",
                Some(("Physical", "High", "High", "Required")),
                Some(("S0", "F0", "O0", "P0")),
            ),
            // unassessed
            threat(3, "T-003", None, None),
        ];

        let rollup = risk_rollup(threats.iter());

        assert_eq!(rollup.total_threats, 3);
        assert_eq!(rollup.matrix[3][3], 1);
        assert_eq!(rollup.matrix[0][0], 1);
        assert_eq!(rollup.threat_counts[&5], 1);
        assert_eq!(rollup.threat_counts[&1], 1);
        assert_eq!(rollup.high_risk_count, 1);
    }

    #[test]
    fn test_rollup_invariants() {
        let threats = vec![
            threat(
                1,
                "T-001",
                Some(("Network", "Low", "None", "None")),
                Some(("S2", "F1", "O0", "P0")),
            ),
            threat(2, "T-002", Some(("Local", "Low", "Low", "None")), None),
            threat(3, "T-003", None, Some(("S1", "F0", "O0", "P0"))),
        ];

        let rollup = risk_rollup(threats.iter());
        let matrix_sum: u32 = rollup.matrix.iter().flatten().sum();
        let level_sum: u32 = rollup.threat_counts.values().sum();

        // Only fully-assessed threats land in the matrix
        assert!(matrix_sum <= rollup.total_threats);
        assert_eq!(matrix_sum, 1);
        assert_eq!(level_sum, 1);
        assert_eq!(
            rollup.high_risk_count,
            rollup.threat_counts[&4] + rollup.threat_counts[&5]
        );
    }

    #[test]
    fn test_empty_rollup() {
        let rollup = risk_rollup(std::iter::empty());
        assert_eq!(rollup.total_threats, 0);
        assert_eq!(rollup.high_risk_count, 0);
        assert_eq!(rollup.threat_counts.len(), 5);
        assert!(rollup.matrix.iter().flatten().all(|&c| c == 0));
    }

    #[test]
    fn test_report_sections() {
        let threats = vec![threat(
            1,
            "T-001",
            Some(("Network", "Low", "None", "None")),
            Some(("S0", "F1", "O1", "P2")),
        )];
        let refs: Vec<&ThreatScenario> = threats.iter().collect();
        let report = render_report("Test Vehicle Platform", &refs);

        assert!(report.contains("THREAT ANALYSIS AND RISK ASSESSMENT"));
        assert!(report.contains("Project: Test Vehicle Platform"));
        assert!(report.contains("[T-001]"));
        assert!(report.contains("RISK SUMMARY"));
    }
}
