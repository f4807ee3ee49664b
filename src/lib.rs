pub mod analysis;
pub mod asset;
pub mod assessment_log;
pub mod graph;
pub mod rollup;
pub mod scoring;
pub mod store;
pub mod threat;
pub mod types;

pub use analysis::{AnalysisError, BatchAnalysis, CandidateProducer, ThreatCandidate};
pub use asset::{Asset, AssetCreate, AssetRelation, AssetRelationCreate, AssetUpdate};
pub use assessment_log::{AssessmentEvent, AssessmentLog};
pub use graph::AssetGraph;
pub use rollup::RiskRollup;
pub use store::{AssetFilter, Project, ProjectStore, StoreError, ThreatFilter};
pub use threat::{
    MitigationCreate, MitigationUpdate, SecurityMitigation, ThreatCreate, ThreatScenario,
    ThreatUpdate,
};
pub use types::{
    Feasibility, ImpactLevel, ImplementationStatus, ProjectStatus, RiskLevel, StrideType,
    TreatmentDecision,
};
