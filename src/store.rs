/// Project Store (storage boundary)
///
/// Owned, in-memory collections for one project's records: assets, threats,
/// relations, mitigations, all keyed by numeric id in flat maps. The store
/// enforces the multi-entity consistency rules the pure scoring functions
/// cannot see: project membership of relation endpoints, identifier
/// uniqueness, and explicit cascade deletion. Every threat write that
/// touches a scoring input routes through the assessment lifecycle, so
/// computed classifications can never go stale.
///
/// The surrounding application is expected to serialize writes per record;
/// the store itself assumes last-writer-wins at the field level.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::asset::{Asset, AssetCreate, AssetRelation, AssetRelationCreate, AssetUpdate};
use crate::assessment_log::{AssessmentEvent, AssessmentLog};
use crate::graph::AssetGraph;
use crate::rollup::{self, RiskRollup};
use crate::threat::{
    MitigationCreate, MitigationUpdate, SecurityMitigation, ThreatCreate, ThreatScenario,
    ThreatUpdate,
};
use crate::types::{ProjectStatus, RiskLevel, StrideType, TreatmentDecision};

/// A TARA analysis project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            code: None,
            description: None,
            status: ProjectStatus::default(),
            created_at: Utc::now(),
        }
    }
}

/// Validation and lookup failures at the storage boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    AssetNotFound { asset_pk: u64 },
    ThreatNotFound { threat_pk: u64 },
    MitigationNotFound { mitigation_pk: u64 },
    DuplicateAssetId { asset_id: String },
    DuplicateThreatId { threat_id: String },
    RelationOutsideProject { asset_pk: u64 },
    SelfLoopRelation { asset_pk: u64 },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::AssetNotFound { asset_pk } => {
                write!(f, "Asset {} not found in project", asset_pk)
            }
            StoreError::ThreatNotFound { threat_pk } => {
                write!(f, "Threat {} not found in project", threat_pk)
            }
            StoreError::MitigationNotFound { mitigation_pk } => {
                write!(f, "Mitigation {} not found", mitigation_pk)
            }
            StoreError::DuplicateAssetId { asset_id } => {
                write!(f, "Asset ID '{}' already exists in this project", asset_id)
            }
            StoreError::DuplicateThreatId { threat_id } => {
                write!(f, "Threat ID '{}' already exists in this project", threat_id)
            }
            StoreError::RelationOutsideProject { asset_pk } => {
                write!(f, "Relation endpoint {} does not belong to this project", asset_pk)
            }
            StoreError::SelfLoopRelation { asset_pk } => {
                write!(f, "Relation from asset {} to itself is not allowed", asset_pk)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Records removed by an asset deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetCascade {
    pub threats_removed: usize,
    pub relations_removed: usize,
    pub mitigations_removed: usize,
}

/// Filter for asset listings
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    pub category: Option<String>,
    pub confirmed: Option<bool>,
}

/// Filter for threat listings
#[derive(Debug, Clone, Default)]
pub struct ThreatFilter {
    pub asset_pk: Option<u64>,
    pub stride_type: Option<StrideType>,
    pub risk_level: Option<RiskLevel>,
    pub confirmed: Option<bool>,
}

/// In-memory store for one project's TARA records
pub struct ProjectStore {
    project: Project,
    assets: HashMap<u64, Asset>,
    threats: HashMap<u64, ThreatScenario>,
    relations: HashMap<u64, AssetRelation>,
    mitigations: HashMap<u64, SecurityMitigation>,
    next_id: u64,
    log: Option<AssessmentLog>,
}

impl ProjectStore {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            assets: HashMap::new(),
            threats: HashMap::new(),
            relations: HashMap::new(),
            mitigations: HashMap::new(),
            next_id: 0,
            log: None,
        }
    }

    /// Create a store with an attached assessment log
    pub fn with_log(project: Project, log: AssessmentLog) -> Self {
        log.log_event(AssessmentEvent::ProjectOpened {
            project_id: project.id,
            name: project.name.clone(),
        });
        let mut store = Self::new(project);
        store.log = Some(log);
        store
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn set_status(&mut self, status: ProjectStatus) {
        self.project.status = status;
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn log(&self, event: AssessmentEvent) {
        if let Some(log) = &self.log {
            log.log_event(event);
        }
    }

    // ---- assets ----

    /// Create an asset. The human-readable asset_id must be unique within
    /// the project.
    pub fn create_asset(&mut self, data: AssetCreate, ai_generated: bool) -> Result<u64, StoreError> {
        if self.assets.values().any(|a| a.asset_id == data.asset_id) {
            return Err(StoreError::DuplicateAssetId {
                asset_id: data.asset_id,
            });
        }

        let id = self.next_id();
        let asset = Asset::new(id, self.project.id, data, ai_generated);
        self.log(AssessmentEvent::AssetCreated {
            asset_pk: id,
            asset_id: asset.asset_id.clone(),
            ai_generated,
        });
        self.assets.insert(id, asset);
        Ok(id)
    }

    pub fn asset(&self, asset_pk: u64) -> Option<&Asset> {
        self.assets.get(&asset_pk)
    }

    pub fn update_asset(&mut self, asset_pk: u64, update: AssetUpdate) -> Result<(), StoreError> {
        if let Some(new_id) = &update.asset_id {
            if self
                .assets
                .values()
                .any(|a| a.id != asset_pk && &a.asset_id == new_id)
            {
                return Err(StoreError::DuplicateAssetId {
                    asset_id: new_id.clone(),
                });
            }
        }

        let asset = self
            .assets
            .get_mut(&asset_pk)
            .ok_or(StoreError::AssetNotFound { asset_pk })?;
        asset.apply(update);
        Ok(())
    }

    /// Confirm an AI-generated asset
    pub fn confirm_asset(&mut self, asset_pk: u64) -> Result<(), StoreError> {
        let asset = self
            .assets
            .get_mut(&asset_pk)
            .ok_or(StoreError::AssetNotFound { asset_pk })?;
        asset.is_confirmed = true;
        asset.updated_at = Some(Utc::now());
        self.log(AssessmentEvent::AssetConfirmed { asset_pk });
        Ok(())
    }

    /// Delete an asset together with every threat scoped to it (and their
    /// mitigations) and every relation naming it as source or target.
    pub fn delete_asset(&mut self, asset_pk: u64) -> Result<AssetCascade, StoreError> {
        if !self.assets.contains_key(&asset_pk) {
            return Err(StoreError::AssetNotFound { asset_pk });
        }

        let threat_pks: Vec<u64> = self
            .threats
            .values()
            .filter(|t| t.asset_id == asset_pk)
            .map(|t| t.id)
            .collect();

        let mut mitigations_removed = 0;
        for threat_pk in &threat_pks {
            self.threats.remove(threat_pk);
            mitigations_removed += self.remove_mitigations_of(*threat_pk);
        }

        let relation_pks: Vec<u64> = self
            .relations
            .values()
            .filter(|r| r.source_asset_id == asset_pk || r.target_asset_id == asset_pk)
            .map(|r| r.id)
            .collect();
        for relation_pk in &relation_pks {
            self.relations.remove(relation_pk);
        }

        self.assets.remove(&asset_pk);

        let cascade = AssetCascade {
            threats_removed: threat_pks.len(),
            relations_removed: relation_pks.len(),
            mitigations_removed,
        };
        self.log(AssessmentEvent::AssetDeleted {
            asset_pk,
            threats_removed: cascade.threats_removed,
            relations_removed: cascade.relations_removed,
        });
        Ok(cascade)
    }

    /// Assets matching the filter, ordered by asset_id
    pub fn list_assets(&self, filter: &AssetFilter) -> Vec<&Asset> {
        let mut assets: Vec<&Asset> = self
            .assets
            .values()
            .filter(|a| match &filter.category {
                Some(category) => &a.category == category,
                None => true,
            })
            .filter(|a| match filter.confirmed {
                Some(confirmed) => a.is_confirmed == confirmed,
                None => true,
            })
            .collect();
        assets.sort_by(|a, b| a.asset_id.cmp(&b.asset_id));
        assets
    }

    // ---- relations ----

    /// Add a typed directed edge between two assets of this project.
    ///
    /// Both endpoints must exist in the project; self-loops are rejected.
    pub fn create_relation(&mut self, data: AssetRelationCreate) -> Result<u64, StoreError> {
        if !self.assets.contains_key(&data.source_asset_id) {
            return Err(StoreError::RelationOutsideProject {
                asset_pk: data.source_asset_id,
            });
        }
        if !self.assets.contains_key(&data.target_asset_id) {
            return Err(StoreError::RelationOutsideProject {
                asset_pk: data.target_asset_id,
            });
        }
        if data.source_asset_id == data.target_asset_id {
            return Err(StoreError::SelfLoopRelation {
                asset_pk: data.source_asset_id,
            });
        }

        let id = self.next_id();
        self.log(AssessmentEvent::RelationAdded {
            relation_pk: id,
            source_asset_pk: data.source_asset_id,
            target_asset_pk: data.target_asset_id,
            relation_type: data.relation_type.clone(),
        });
        self.relations.insert(
            id,
            AssetRelation {
                id,
                project_id: self.project.id,
                source_asset_id: data.source_asset_id,
                target_asset_id: data.target_asset_id,
                relation_type: data.relation_type,
                protocol: data.protocol,
                description: data.description,
            },
        );
        Ok(id)
    }

    pub fn relations(&self) -> Vec<&AssetRelation> {
        let mut relations: Vec<&AssetRelation> = self.relations.values().collect();
        relations.sort_by_key(|r| r.id);
        relations
    }

    // ---- threats ----

    /// Create a threat against an existing asset of this project.
    ///
    /// The assessment runs before the record is stored, so the computed
    /// classifications are populated from the moment it exists.
    pub fn create_threat(&mut self, data: ThreatCreate, ai_generated: bool) -> Result<u64, StoreError> {
        if !self.assets.contains_key(&data.asset_id) {
            return Err(StoreError::AssetNotFound {
                asset_pk: data.asset_id,
            });
        }
        if self.threats.values().any(|t| t.threat_id == data.threat_id) {
            return Err(StoreError::DuplicateThreatId {
                threat_id: data.threat_id,
            });
        }

        let id = self.next_id();
        let threat = ThreatScenario::new(id, self.project.id, data, ai_generated);
        self.log(AssessmentEvent::ThreatCreated {
            threat_pk: id,
            threat_id: threat.threat_id.clone(),
            ai_generated,
        });
        self.log_assessment(&threat);
        self.threats.insert(id, threat);
        Ok(id)
    }

    pub fn threat(&self, threat_pk: u64) -> Option<&ThreatScenario> {
        self.threats.get(&threat_pk)
    }

    /// Update a threat, recomputing the assessment when a scoring input
    /// changed.
    pub fn update_threat(&mut self, threat_pk: u64, update: ThreatUpdate) -> Result<(), StoreError> {
        if let Some(new_id) = &update.threat_id {
            if self
                .threats
                .values()
                .any(|t| t.id != threat_pk && &t.threat_id == new_id)
            {
                return Err(StoreError::DuplicateThreatId {
                    threat_id: new_id.clone(),
                });
            }
        }

        let decision = update.treatment_decision;
        let threat = self
            .threats
            .get_mut(&threat_pk)
            .ok_or(StoreError::ThreatNotFound { threat_pk })?;
        let recomputed = threat.apply(update);

        if recomputed {
            let snapshot = threat.clone();
            self.log_assessment(&snapshot);
        }
        if let Some(decision) = decision {
            self.log(AssessmentEvent::TreatmentRecorded {
                threat_pk,
                decision: decision.to_string(),
            });
        }
        Ok(())
    }

    /// Confirm an AI-generated threat
    pub fn confirm_threat(&mut self, threat_pk: u64) -> Result<(), StoreError> {
        let threat = self
            .threats
            .get_mut(&threat_pk)
            .ok_or(StoreError::ThreatNotFound { threat_pk })?;
        threat.is_confirmed = true;
        threat.updated_at = Some(Utc::now());
        self.log(AssessmentEvent::ThreatConfirmed { threat_pk });
        Ok(())
    }

    /// Delete a threat together with its mitigations.
    ///
    /// Returns the number of mitigations removed.
    pub fn delete_threat(&mut self, threat_pk: u64) -> Result<usize, StoreError> {
        if self.threats.remove(&threat_pk).is_none() {
            return Err(StoreError::ThreatNotFound { threat_pk });
        }
        let mitigations_removed = self.remove_mitigations_of(threat_pk);
        self.log(AssessmentEvent::ThreatDeleted {
            threat_pk,
            mitigations_removed,
        });
        Ok(mitigations_removed)
    }

    /// Record the advisor's suggestion as the treatment decision, unless an
    /// explicit decision is already present. Returns the decision in effect.
    pub fn apply_suggested_treatment(
        &mut self,
        threat_pk: u64,
    ) -> Result<TreatmentDecision, StoreError> {
        let threat = self
            .threats
            .get_mut(&threat_pk)
            .ok_or(StoreError::ThreatNotFound { threat_pk })?;

        if let Some(decision) = threat.treatment_decision {
            return Ok(decision);
        }

        let suggested = threat.suggested_treatment();
        threat.treatment_decision = Some(suggested);
        threat.updated_at = Some(Utc::now());
        self.log(AssessmentEvent::TreatmentRecorded {
            threat_pk,
            decision: suggested.to_string(),
        });
        Ok(suggested)
    }

    /// Threats matching the filter, ordered by threat_id
    pub fn list_threats(&self, filter: &ThreatFilter) -> Vec<&ThreatScenario> {
        let mut threats: Vec<&ThreatScenario> = self
            .threats
            .values()
            .filter(|t| match filter.asset_pk {
                Some(asset_pk) => t.asset_id == asset_pk,
                None => true,
            })
            .filter(|t| match filter.stride_type {
                Some(stride) => t.stride_type == stride,
                None => true,
            })
            .filter(|t| match filter.risk_level {
                Some(risk) => t.risk_level == Some(risk),
                None => true,
            })
            .filter(|t| match filter.confirmed {
                Some(confirmed) => t.is_confirmed == confirmed,
                None => true,
            })
            .collect();
        threats.sort_by(|a, b| a.threat_id.cmp(&b.threat_id));
        threats
    }

    // ---- mitigations ----

    pub fn add_mitigation(
        &mut self,
        threat_pk: u64,
        data: MitigationCreate,
    ) -> Result<u64, StoreError> {
        if !self.threats.contains_key(&threat_pk) {
            return Err(StoreError::ThreatNotFound { threat_pk });
        }

        let id = self.next_id();
        self.mitigations
            .insert(id, SecurityMitigation::new(id, threat_pk, data));
        Ok(id)
    }

    pub fn mitigation(&self, mitigation_pk: u64) -> Option<&SecurityMitigation> {
        self.mitigations.get(&mitigation_pk)
    }

    pub fn update_mitigation(
        &mut self,
        mitigation_pk: u64,
        update: MitigationUpdate,
    ) -> Result<(), StoreError> {
        let mitigation = self
            .mitigations
            .get_mut(&mitigation_pk)
            .ok_or(StoreError::MitigationNotFound { mitigation_pk })?;
        mitigation.apply(update);
        Ok(())
    }

    pub fn delete_mitigation(&mut self, mitigation_pk: u64) -> Result<(), StoreError> {
        self.mitigations
            .remove(&mitigation_pk)
            .map(|_| ())
            .ok_or(StoreError::MitigationNotFound { mitigation_pk })
    }

    /// Mitigations attached to a threat, ordered by id
    pub fn mitigations_for(&self, threat_pk: u64) -> Vec<&SecurityMitigation> {
        let mut mitigations: Vec<&SecurityMitigation> = self
            .mitigations
            .values()
            .filter(|m| m.threat_id == threat_pk)
            .collect();
        mitigations.sort_by_key(|m| m.id);
        mitigations
    }

    fn remove_mitigations_of(&mut self, threat_pk: u64) -> usize {
        let mitigation_pks: Vec<u64> = self
            .mitigations
            .values()
            .filter(|m| m.threat_id == threat_pk)
            .map(|m| m.id)
            .collect();
        for mitigation_pk in &mitigation_pks {
            self.mitigations.remove(mitigation_pk);
        }
        mitigation_pks.len()
    }

    fn log_assessment(&self, threat: &ThreatScenario) {
        self.log(AssessmentEvent::ThreatAssessed {
            threat_pk: threat.id,
            feasibility: threat.attack_feasibility.map(|f| f.label().to_string()),
            impact: threat.impact_level.map(|i| i.label().to_string()),
            risk_level: threat.risk_level.map(|r| r.level()),
        });
    }

    // ---- aggregate views ----

    /// Visualization-ready asset relationship graph
    pub fn asset_graph(&self) -> AssetGraph {
        let mut assets: Vec<&Asset> = self.assets.values().collect();
        assets.sort_by_key(|a| a.id);
        AssetGraph::build(assets, self.relations())
    }

    /// Risk rollup over every threat of the project
    pub fn risk_rollup(&self) -> RiskRollup {
        rollup::risk_rollup(self.threats.values())
    }

    /// Formatted risk report for the project
    pub fn render_report(&self) -> String {
        let threats = self.list_threats(&ThreatFilter::default());
        rollup::render_report(&self.project.name, &threats)
    }
}

impl fmt::Debug for ProjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectStore")
            .field("project", &self.project.name)
            .field("assets", &self.assets.len())
            .field("threats", &self.threats.len())
            .field("relations", &self.relations.len())
            .field("mitigations", &self.mitigations.len())
            .finish()
    }
}
