/// Threat Scenario Records and Assessment Lifecycle (ISO 21434)
///
/// A threat scenario belongs to exactly one asset and carries the raw
/// qualitative scoring inputs alongside the classifications computed from
/// them. The computed fields are only ever written by `assess`, which runs
/// on every create and on every update that touches a scoring input, so a
/// caller can never leave stale classifications behind.
///
/// Key ISO 21434 requirements addressed:
/// - 8.4.2: Threat scenario identification
/// - 8.4.5: Risk determination
/// - 8.5: Risk treatment decision
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring;
use crate::types::{
    Feasibility, ImpactLevel, ImplementationStatus, RiskLevel, StrideType, TreatmentDecision,
};

/// A threat scenario against a single asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatScenario {
    /// Storage key, unique across the project store
    pub id: u64,
    /// Owning project (denormalized from the asset)
    pub project_id: u64,
    /// Storage key of the threatened asset
    pub asset_id: u64,
    /// Human-readable threat identifier, unique within the project
    pub threat_id: String,
    /// Security attribute under threat, e.g. "Integrity"
    pub security_attribute: String,
    pub stride_type: StrideType,
    pub threat_description: String,
    pub damage_scenario: Option<String>,
    pub attack_path: Option<String>,
    pub source_reference: Option<String>,
    /// UN R155 / WP.29 threat-catalog mapping code
    pub wp29_mapping: Option<String>,

    // Attack feasibility inputs
    pub attack_vector: Option<String>,
    pub attack_complexity: Option<String>,
    pub privileges_required: Option<String>,
    pub user_interaction: Option<String>,

    // Impact inputs
    pub impact_safety: Option<String>,
    pub impact_financial: Option<String>,
    pub impact_operational: Option<String>,
    pub impact_privacy: Option<String>,

    // Computed classifications. Each enum carries both the ordinal value
    // and the display label. Written only by `assess`.
    pub attack_feasibility: Option<Feasibility>,
    pub impact_level: Option<ImpactLevel>,
    pub risk_level: Option<RiskLevel>,

    /// Explicit treatment choice. Never touched by recomputation.
    pub treatment_decision: Option<TreatmentDecision>,

    // Provenance
    pub is_ai_generated: bool,
    pub is_confirmed: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ThreatScenario {
    /// Build a threat from validated input and run the initial assessment.
    pub fn new(id: u64, project_id: u64, data: ThreatCreate, ai_generated: bool) -> Self {
        let mut threat = Self {
            id,
            project_id,
            asset_id: data.asset_id,
            threat_id: data.threat_id,
            security_attribute: data.security_attribute,
            stride_type: data.stride_type,
            threat_description: data.threat_description,
            damage_scenario: data.damage_scenario,
            attack_path: data.attack_path,
            source_reference: data.source_reference,
            wp29_mapping: data.wp29_mapping,
            attack_vector: data.attack_vector,
            attack_complexity: data.attack_complexity,
            privileges_required: data.privileges_required,
            user_interaction: data.user_interaction,
            impact_safety: data.impact_safety,
            impact_financial: data.impact_financial,
            impact_operational: data.impact_operational,
            impact_privacy: data.impact_privacy,
            attack_feasibility: None,
            impact_level: None,
            risk_level: None,
            treatment_decision: None,
            is_ai_generated: ai_generated,
            is_confirmed: false,
            created_at: Utc::now(),
            updated_at: None,
        };
        threat.assess();
        threat
    }

    /// Recompute the classifications from the current scoring inputs.
    ///
    /// A full recompute every time: feasibility from the four attack
    /// parameters, impact from the four damage dimensions, risk from the
    /// matrix. Deterministic, so running it twice with unchanged inputs
    /// yields identical fields.
    pub fn assess(&mut self) {
        self.attack_feasibility = scoring::feasibility(
            self.attack_vector.as_deref(),
            self.attack_complexity.as_deref(),
            self.privileges_required.as_deref(),
            self.user_interaction.as_deref(),
        );

        self.impact_level = scoring::impact(
            self.impact_safety.as_deref(),
            self.impact_financial.as_deref(),
            self.impact_operational.as_deref(),
            self.impact_privacy.as_deref(),
        );

        self.risk_level = scoring::risk_level(
            self.attack_feasibility.map(|f| f.value()),
            self.impact_level.map(|i| i.value()),
        );
    }

    /// Apply a partial update, re-assessing when a scoring input changed.
    ///
    /// Returns true if the assessment was recomputed.
    pub fn apply(&mut self, update: ThreatUpdate) -> bool {
        if let Some(threat_id) = update.threat_id {
            self.threat_id = threat_id;
        }
        if let Some(attr) = update.security_attribute {
            self.security_attribute = attr;
        }
        if let Some(stride) = update.stride_type {
            self.stride_type = stride;
        }
        if let Some(desc) = update.threat_description {
            self.threat_description = desc;
        }
        if let Some(damage) = update.damage_scenario {
            self.damage_scenario = Some(damage);
        }
        if let Some(path) = update.attack_path {
            self.attack_path = Some(path);
        }
        if let Some(source) = update.source_reference {
            self.source_reference = Some(source);
        }
        if let Some(mapping) = update.wp29_mapping {
            self.wp29_mapping = Some(mapping);
        }
        if let Some(decision) = update.treatment_decision {
            self.treatment_decision = Some(decision);
        }
        if let Some(confirmed) = update.is_confirmed {
            self.is_confirmed = confirmed;
        }

        let mut touched = false;
        let mut patch = |field: &mut Option<String>, value: Option<Option<String>>| {
            if let Some(value) = value {
                *field = value;
                touched = true;
            }
        };
        patch(&mut self.attack_vector, update.attack_vector);
        patch(&mut self.attack_complexity, update.attack_complexity);
        patch(&mut self.privileges_required, update.privileges_required);
        patch(&mut self.user_interaction, update.user_interaction);
        patch(&mut self.impact_safety, update.impact_safety);
        patch(&mut self.impact_financial, update.impact_financial);
        patch(&mut self.impact_operational, update.impact_operational);
        patch(&mut self.impact_privacy, update.impact_privacy);

        if touched {
            self.assess();
        }
        self.updated_at = Some(Utc::now());
        touched
    }

    /// Treatment suggested for the current risk level. Does not modify the
    /// record.
    pub fn suggested_treatment(&self) -> TreatmentDecision {
        scoring::suggest_treatment(self.risk_level)
    }
}

/// Validated input for creating a threat scenario.
///
/// Carries only the raw inputs; the computed classifications are populated
/// by the assessment on create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatCreate {
    pub asset_id: u64,
    pub threat_id: String,
    pub security_attribute: String,
    pub stride_type: StrideType,
    pub threat_description: String,
    #[serde(default)]
    pub damage_scenario: Option<String>,
    #[serde(default)]
    pub attack_path: Option<String>,
    #[serde(default)]
    pub source_reference: Option<String>,
    #[serde(default)]
    pub wp29_mapping: Option<String>,
    #[serde(default)]
    pub attack_vector: Option<String>,
    #[serde(default)]
    pub attack_complexity: Option<String>,
    #[serde(default)]
    pub privileges_required: Option<String>,
    #[serde(default)]
    pub user_interaction: Option<String>,
    #[serde(default)]
    pub impact_safety: Option<String>,
    #[serde(default)]
    pub impact_financial: Option<String>,
    #[serde(default)]
    pub impact_operational: Option<String>,
    #[serde(default)]
    pub impact_privacy: Option<String>,
}

/// Partial update for a threat scenario.
///
/// Scoring inputs use two-level options: the outer level marks the field as
/// touched, the inner level is the new value, so a parameter can be cleared
/// (`Some(None)`) as well as set. Clearing an attack parameter makes the
/// feasibility undefined again.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreatUpdate {
    pub threat_id: Option<String>,
    pub security_attribute: Option<String>,
    pub stride_type: Option<StrideType>,
    pub threat_description: Option<String>,
    pub damage_scenario: Option<String>,
    pub attack_path: Option<String>,
    pub source_reference: Option<String>,
    pub wp29_mapping: Option<String>,

    pub attack_vector: Option<Option<String>>,
    pub attack_complexity: Option<Option<String>>,
    pub privileges_required: Option<Option<String>>,
    pub user_interaction: Option<Option<String>>,
    pub impact_safety: Option<Option<String>>,
    pub impact_financial: Option<Option<String>>,
    pub impact_operational: Option<Option<String>>,
    pub impact_privacy: Option<Option<String>>,

    pub treatment_decision: Option<TreatmentDecision>,
    pub is_confirmed: Option<bool>,
}

/// A security mitigation attached to a threat scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityMitigation {
    pub id: u64,
    /// Storage key of the mitigated threat
    pub threat_id: u64,
    pub security_goal: Option<String>,
    pub security_requirement: Option<String>,
    /// UN R155 / WP.29 control-catalog mapping code
    pub wp29_control_mapping: Option<String>,
    pub implementation_status: ImplementationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SecurityMitigation {
    pub fn new(id: u64, threat_id: u64, data: MitigationCreate) -> Self {
        Self {
            id,
            threat_id,
            security_goal: data.security_goal,
            security_requirement: data.security_requirement,
            wp29_control_mapping: data.wp29_control_mapping,
            implementation_status: data.implementation_status,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Apply a partial update. Only supplied fields change.
    pub fn apply(&mut self, update: MitigationUpdate) {
        if let Some(goal) = update.security_goal {
            self.security_goal = Some(goal);
        }
        if let Some(requirement) = update.security_requirement {
            self.security_requirement = Some(requirement);
        }
        if let Some(mapping) = update.wp29_control_mapping {
            self.wp29_control_mapping = Some(mapping);
        }
        if let Some(status) = update.implementation_status {
            self.implementation_status = status;
        }
        self.updated_at = Some(Utc::now());
    }
}

/// Validated input for creating a mitigation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MitigationCreate {
    #[serde(default)]
    pub security_goal: Option<String>,
    #[serde(default)]
    pub security_requirement: Option<String>,
    #[serde(default)]
    pub wp29_control_mapping: Option<String>,
    #[serde(default)]
    pub implementation_status: ImplementationStatus,
}

/// Partial update for a mitigation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MitigationUpdate {
    pub security_goal: Option<String>,
    pub security_requirement: Option<String>,
    pub wp29_control_mapping: Option<String>,
    pub implementation_status: Option<ImplementationStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network_threat() -> ThreatCreate {
        ThreatCreate {
            asset_id: 1,
            threat_id: "T-001".to_string(),
            security_attribute: "Confidentiality".to_string(),
            stride_type: StrideType::InformationDisclosure,
            threat_description: "Eavesdropping on telematics traffic".to_string(),
            damage_scenario: None,
            attack_path: None,
            source_reference: None,
            wp29_mapping: None,
            attack_vector: Some("Network".to_string()),
            attack_complexity: Some("Low".to_string()),
            privileges_required: Some("None".to_string()),
            user_interaction: Some("None".to_string()),
            impact_safety: Some("S0".to_string()),
            impact_financial: Some("F1".to_string()),
            impact_operational: Some("O1".to_string()),
            impact_privacy: Some("P2".to_string()),
        }
    }

    #[test]
    fn test_create_assesses_immediately() {
        let threat = ThreatScenario::new(1, 1, network_threat(), false);

        // Sum 3+1+2+1=7, max impact P2=2, matrix[3][2]=4
        assert_eq!(threat.attack_feasibility, Some(Feasibility::High));
        assert_eq!(threat.impact_level, Some(ImpactLevel::Major));
        assert_eq!(threat.risk_level, Some(RiskLevel::High));
        assert_eq!(threat.suggested_treatment(), TreatmentDecision::Reduce);
        assert_eq!(threat.treatment_decision, None);
    }

    #[test]
    fn test_partial_inputs_leave_assessment_undefined() {
        let mut data = network_threat();
        data.user_interaction = None;
        data.impact_safety = None;
        data.impact_financial = None;
        data.impact_operational = None;
        data.impact_privacy = None;

        let threat = ThreatScenario::new(1, 1, data, false);
        assert_eq!(threat.attack_feasibility, None);
        assert_eq!(threat.impact_level, None);
        assert_eq!(threat.risk_level, None);
    }

    #[test]
    fn test_update_of_scoring_input_recomputes() {
        let mut threat = ThreatScenario::new(1, 1, network_threat(), false);

        let recomputed = threat.apply(ThreatUpdate {
            attack_vector: Some(Some("Physical".to_string())),
            ..Default::default()
        });

        assert!(recomputed);
        // Sum drops to 0+1+2+1=4, impact stays Major
        assert_eq!(threat.attack_feasibility, Some(Feasibility::Low));
        assert_eq!(threat.risk_level, Some(RiskLevel::Low));
    }

    #[test]
    fn test_update_without_scoring_input_keeps_assessment() {
        let mut threat = ThreatScenario::new(1, 1, network_threat(), false);
        let before = (threat.attack_feasibility, threat.impact_level, threat.risk_level);

        let recomputed = threat.apply(ThreatUpdate {
            threat_description: Some("Refined description".to_string()),
            ..Default::default()
        });

        assert!(!recomputed);
        assert_eq!(
            (threat.attack_feasibility, threat.impact_level, threat.risk_level),
            before
        );
    }

    #[test]
    fn test_clearing_parameter_undefines_feasibility() {
        let mut threat = ThreatScenario::new(1, 1, network_threat(), false);

        threat.apply(ThreatUpdate {
            user_interaction: Some(None),
            ..Default::default()
        });

        assert_eq!(threat.attack_feasibility, None);
        assert_eq!(threat.risk_level, None);
        // Impact inputs are untouched
        assert_eq!(threat.impact_level, Some(ImpactLevel::Major));
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut threat = ThreatScenario::new(1, 1, network_threat(), false);
        let first = (threat.attack_feasibility, threat.impact_level, threat.risk_level);
        threat.assess();
        threat.assess();
        assert_eq!(
            (threat.attack_feasibility, threat.impact_level, threat.risk_level),
            first
        );
    }

    #[test]
    fn test_treatment_decision_survives_recompute() {
        let mut threat = ThreatScenario::new(1, 1, network_threat(), false);
        threat.apply(ThreatUpdate {
            treatment_decision: Some(TreatmentDecision::Transfer),
            ..Default::default()
        });

        threat.apply(ThreatUpdate {
            impact_privacy: Some(Some("P3".to_string())),
            ..Default::default()
        });

        assert_eq!(threat.treatment_decision, Some(TreatmentDecision::Transfer));
        assert_eq!(threat.impact_level, Some(ImpactLevel::Severe));
    }

    #[test]
    fn test_unknown_labels_still_assess() {
        let mut data = network_threat();
        data.attack_vector = Some("Teleport".to_string());

        // Unknown label scores 0: sum 0+1+2+1=4
        let threat = ThreatScenario::new(1, 1, data, false);
        assert_eq!(threat.attack_feasibility, Some(Feasibility::Low));
    }

    #[test]
    fn test_mitigation_lifecycle() {
        let mut mitigation = SecurityMitigation::new(
            1,
            1,
            MitigationCreate {
                security_goal: Some("Protect telematics traffic".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(mitigation.implementation_status, ImplementationStatus::Planned);

        mitigation.apply(MitigationUpdate {
            implementation_status: Some(ImplementationStatus::Implemented),
            ..Default::default()
        });
        assert_eq!(
            mitigation.implementation_status,
            ImplementationStatus::Implemented
        );
        assert!(mitigation.updated_at.is_some());
    }
}
