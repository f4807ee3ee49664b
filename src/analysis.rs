/// AI-Assisted Threat Identification Boundary
///
/// The external completion service is consumed as an opaque producer of
/// candidate threat records. Its raw text responses are parsed here,
/// normalized, and routed through the same validated create path as manual
/// records, so machine-suggested threats are assessed and deduplicated
/// before they are trusted.
///
/// Batch analysis over many assets runs a task per asset: failures are
/// captured per item and never abort the remaining assets.
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::asset::Asset;
use crate::store::{ProjectStore, StoreError};
use crate::threat::{MitigationCreate, ThreatCreate};
use crate::types::{ImplementationStatus, StrideType};

/// Failures at the analysis boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// The producer itself failed (transport, quota, refusal)
    Producer(String),
    /// The response could not be parsed as candidate records
    InvalidResponse(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::Producer(msg) => write!(f, "Candidate producer failed: {}", msg),
            AnalysisError::InvalidResponse(msg) => {
                write!(f, "Failed to parse candidate response: {}", msg)
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

/// External service proposing threat scenarios for an asset.
///
/// Implementations wrap a text/vision completion client; the engine only
/// sees the raw response text.
#[async_trait]
pub trait CandidateProducer: Send + Sync {
    async fn propose_threats(&self, asset: &Asset) -> Result<String, AnalysisError>;
}

/// One candidate threat with its optional mitigation, ready for the
/// validated create path
#[derive(Debug, Clone)]
pub struct ThreatCandidate {
    pub threat: ThreatCreate,
    pub mitigation: Option<MitigationCreate>,
}

/// Raw candidate record as produced by the completion service
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCandidate {
    threat_id: Option<String>,
    stride_type: Option<String>,
    security_attribute: Option<String>,
    threat_description: Option<String>,
    damage_scenario: Option<String>,
    attack_path: Option<String>,
    source_reference: Option<String>,
    wp29_mapping: Option<String>,
    attack_vector: Option<String>,
    attack_complexity: Option<String>,
    privileges_required: Option<String>,
    user_interaction: Option<String>,
    impact_safety: Option<String>,
    impact_financial: Option<String>,
    impact_operational: Option<String>,
    impact_privacy: Option<String>,
    security_goal: Option<String>,
    security_requirement: Option<String>,
    wp29_control: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateResponse {
    threats: Vec<RawCandidate>,
}

/// Strip a markdown code fence if the model wrapped its JSON in one
fn extract_json(response: &str) -> &str {
    let content = response.trim();

    if let Some(idx) = content.find("```json") {
        let rest = &content[idx + 7..];
        if let Some(end) = rest.find("```") {
            return rest[..end].trim();
        }
    } else if let Some(idx) = content.find("```") {
        let rest = &content[idx + 3..];
        if let Some(end) = rest.find("```") {
            return rest[..end].trim();
        }
    }

    content
}

/// Parse a raw producer response into candidate threats for an asset.
///
/// Missing identifiers and attributes are defaulted: STRIDE types may
/// arrive as letters or full names (unrecognized ones fall back to
/// Spoofing), the security attribute defaults from the STRIDE type, and
/// the threat id defaults to a T-{index} sequence.
pub fn parse_candidates(response: &str, asset_pk: u64) -> Result<Vec<ThreatCandidate>, AnalysisError> {
    let parsed: CandidateResponse = serde_json::from_str(extract_json(response))
        .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?;

    let candidates = parsed
        .threats
        .into_iter()
        .enumerate()
        .map(|(index, raw)| build_candidate(raw, asset_pk, index + 1))
        .collect();

    Ok(candidates)
}

fn build_candidate(raw: RawCandidate, asset_pk: u64, index: usize) -> ThreatCandidate {
    let stride_type = raw
        .stride_type
        .as_deref()
        .and_then(StrideType::from_label)
        .unwrap_or(StrideType::Spoofing);

    let security_attribute = raw
        .security_attribute
        .unwrap_or_else(|| stride_type.default_security_attribute().to_string());

    let threat_id = raw
        .threat_id
        .unwrap_or_else(|| format!("T-{:03}", index));

    let mitigation = if raw.security_goal.is_some()
        || raw.security_requirement.is_some()
        || raw.wp29_control.is_some()
    {
        Some(MitigationCreate {
            security_goal: raw.security_goal,
            security_requirement: raw.security_requirement,
            wp29_control_mapping: raw.wp29_control,
            implementation_status: ImplementationStatus::Planned,
        })
    } else {
        None
    };

    ThreatCandidate {
        threat: ThreatCreate {
            asset_id: asset_pk,
            threat_id,
            security_attribute,
            stride_type,
            threat_description: raw.threat_description.unwrap_or_default(),
            damage_scenario: raw.damage_scenario,
            attack_path: raw.attack_path,
            source_reference: raw.source_reference,
            wp29_mapping: raw.wp29_mapping,
            attack_vector: raw.attack_vector,
            attack_complexity: raw.attack_complexity,
            privileges_required: raw.privileges_required,
            user_interaction: raw.user_interaction,
            impact_safety: raw.impact_safety,
            impact_financial: raw.impact_financial,
            impact_operational: raw.impact_operational,
            impact_privacy: raw.impact_privacy,
        },
        mitigation,
    }
}

/// Outcome of a batch analysis over many assets
#[derive(Debug, Default)]
pub struct BatchAnalysis {
    /// Parsed candidates per asset
    pub proposals: HashMap<u64, Vec<ThreatCandidate>>,
    /// Per-asset failures; the other assets complete regardless
    pub failures: HashMap<u64, AnalysisError>,
}

/// Propose threats for many assets concurrently, one task per asset.
///
/// Best-effort semantics: each asset's result is captured independently and
/// a failing asset never rolls back or aborts the rest.
pub async fn analyze_assets(
    producer: Arc<dyn CandidateProducer>,
    assets: Vec<Asset>,
) -> BatchAnalysis {
    let mut tasks = JoinSet::new();

    for asset in assets {
        let producer = Arc::clone(&producer);
        tasks.spawn(async move {
            let result = match producer.propose_threats(&asset).await {
                Ok(response) => parse_candidates(&response, asset.id),
                Err(e) => Err(e),
            };
            (asset.id, result)
        });
    }

    let mut batch = BatchAnalysis::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((asset_pk, Ok(candidates))) => {
                batch.proposals.insert(asset_pk, candidates);
            }
            Ok((asset_pk, Err(e))) => {
                batch.failures.insert(asset_pk, e);
            }
            Err(e) => {
                // Task panicked; the asset id is lost with it
                batch
                    .failures
                    .insert(u64::MAX, AnalysisError::Producer(e.to_string()));
            }
        }
    }

    batch
}

/// Outcome of ingesting candidates into the store
#[derive(Debug, Default)]
pub struct IngestOutcome {
    /// Storage keys of the created threats
    pub created: Vec<u64>,
    /// Candidates rejected by store validation, by threat id
    pub rejected: Vec<(String, StoreError)>,
}

/// Route candidates through the validated create path.
///
/// Created threats are marked AI-generated and unconfirmed; rejected
/// candidates (duplicate ids, vanished assets) are collected rather than
/// aborting the batch.
pub fn ingest_candidates(
    store: &mut ProjectStore,
    candidates: Vec<ThreatCandidate>,
) -> IngestOutcome {
    let mut outcome = IngestOutcome::default();

    for candidate in candidates {
        let threat_id = candidate.threat.threat_id.clone();
        match store.create_threat(candidate.threat, true) {
            Ok(threat_pk) => {
                if let Some(mitigation) = candidate.mitigation {
                    match store.add_mitigation(threat_pk, mitigation) {
                        Ok(_) => {}
                        Err(e) => outcome.rejected.push((threat_id.clone(), e)),
                    }
                }
                outcome.created.push(threat_pk);
            }
            Err(e) => outcome.rejected.push((threat_id, e)),
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetCreate;
    use crate::store::Project;

    const SAMPLE_RESPONSE: &str = r#"{
        "threats": [
            {
                "threat_id": "T-101",
                "stride_type": "Tampering",
                "threat_description": "Malicious firmware flashing over OBD",
                "attack_vector": "Physical",
                "attack_complexity": "Low",
                "privileges_required": "Low",
                "user_interaction": "None",
                "impact_safety": "S3",
                "impact_financial": "F2",
                "impact_operational": "O2",
                "impact_privacy": "P0",
                "security_goal": "Only authentic firmware runs",
                "wp29_control": "M10"
            },
            {
                "stride_type": "I",
                "threat_description": "Leak of stored trip data"
            }
        ]
    }"#;

    #[test]
    fn test_parse_candidates() {
        let candidates = parse_candidates(SAMPLE_RESPONSE, 7).unwrap();
        assert_eq!(candidates.len(), 2);

        let first = &candidates[0];
        assert_eq!(first.threat.threat_id, "T-101");
        assert_eq!(first.threat.stride_type, StrideType::Tampering);
        assert_eq!(first.threat.security_attribute, "Integrity");
        assert_eq!(first.threat.asset_id, 7);
        assert!(first.mitigation.is_some());

        let second = &candidates[1];
        assert_eq!(second.threat.threat_id, "T-002");
        assert_eq!(second.threat.stride_type, StrideType::InformationDisclosure);
        assert_eq!(second.threat.security_attribute, "Confidentiality");
        assert!(second.mitigation.is_none());
    }

    #[test]
    fn test_parse_fenced_response() {
        let fenced = format!("Here are the threats:\n```json\n{}\n```", SAMPLE_RESPONSE);
        let candidates = parse_candidates(&fenced, 1).unwrap();
        assert_eq!(candidates.len(), 2);

        let bare_fence = format!("```\n{}\n```", SAMPLE_RESPONSE);
        let candidates = parse_candidates(&bare_fence, 1).unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_parse_invalid_response() {
        let err = parse_candidates("the model refused", 1).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidResponse(_)));
    }

    #[test]
    fn test_unrecognized_stride_defaults_to_spoofing() {
        let response = r#"{"threats": [{"stride_type": "Hijacking", "threat_description": "x"}]}"#;
        let candidates = parse_candidates(response, 1).unwrap();
        assert_eq!(candidates[0].threat.stride_type, StrideType::Spoofing);
        assert_eq!(candidates[0].threat.security_attribute, "Authenticity");
    }

    struct StubProducer;

    #[async_trait]
    impl CandidateProducer for StubProducer {
        async fn propose_threats(&self, asset: &Asset) -> Result<String, AnalysisError> {
            if asset.name == "broken" {
                return Err(AnalysisError::Producer("quota exceeded".to_string()));
            }
            Ok(SAMPLE_RESPONSE.to_string())
        }
    }

    fn asset(id: u64, name: &str) -> Asset {
        Asset::new(
            id,
            1,
            AssetCreate {
                asset_id: format!("A-{:03}", id),
                name: name.to_string(),
                category: "ECU".to_string(),
                ..Default::default()
            },
            false,
        )
    }

    #[tokio::test]
    async fn test_batch_analysis_is_best_effort() {
        let assets = vec![asset(1, "Gateway"), asset(2, "broken"), asset(3, "Brake ECU")];

        let batch = analyze_assets(Arc::new(StubProducer), assets).await;

        assert_eq!(batch.proposals.len(), 2);
        assert_eq!(batch.proposals[&1].len(), 2);
        assert_eq!(batch.proposals[&3].len(), 2);
        assert_eq!(batch.failures.len(), 1);
        assert!(matches!(batch.failures[&2], AnalysisError::Producer(_)));
    }

    #[test]
    fn test_ingest_candidates_marks_provenance_and_assesses() {
        let mut store = ProjectStore::new(Project::new(1, "Test"));
        let asset_pk = store
            .create_asset(
                AssetCreate {
                    asset_id: "A-001".to_string(),
                    name: "Gateway".to_string(),
                    category: "ECU".to_string(),
                    ..Default::default()
                },
                false,
            )
            .unwrap();

        let candidates = parse_candidates(SAMPLE_RESPONSE, asset_pk).unwrap();
        let outcome = ingest_candidates(&mut store, candidates);

        assert_eq!(outcome.created.len(), 2);
        assert!(outcome.rejected.is_empty());

        let first = store.threat(outcome.created[0]).unwrap();
        assert!(first.is_ai_generated);
        assert!(!first.is_confirmed);
        // Assessment ran on the way in: sum 0+1+1+1=3, impact S3
        assert_eq!(first.attack_feasibility.map(|f| f.value()), Some(1));
        assert_eq!(first.impact_level.map(|i| i.value()), Some(3));
        assert_eq!(first.risk_level.map(|r| r.level()), Some(3));
        assert_eq!(store.mitigations_for(first.id).len(), 1);
    }

    #[test]
    fn test_ingest_rejects_duplicates_without_aborting() {
        let mut store = ProjectStore::new(Project::new(1, "Test"));
        let asset_pk = store
            .create_asset(
                AssetCreate {
                    asset_id: "A-001".to_string(),
                    name: "Gateway".to_string(),
                    category: "ECU".to_string(),
                    ..Default::default()
                },
                false,
            )
            .unwrap();

        let candidates = parse_candidates(SAMPLE_RESPONSE, asset_pk).unwrap();
        ingest_candidates(&mut store, candidates.clone());
        let outcome = ingest_candidates(&mut store, candidates);

        // Same ids again: everything is rejected, nothing panics
        assert!(outcome.created.is_empty());
        assert_eq!(outcome.rejected.len(), 2);
    }
}
