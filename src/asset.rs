/// Asset Catalog Records (ISO 21434 asset identification)
///
/// Assets are the protected items of the analyzed vehicle system: ECUs,
/// buses, interfaces, data stores. Each carries the six security-attribute
/// flags used to drive threat identification, plus provenance flags that
/// distinguish machine-suggested records from human-confirmed ones.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An identified asset within a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Storage key, unique across the project store
    pub id: u64,
    /// Owning project
    pub project_id: u64,
    /// Human-readable asset identifier, unique within the project
    pub asset_id: String,
    pub name: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub description: Option<String>,
    pub remarks: Option<String>,

    // Security attributes
    pub authenticity: bool,
    pub integrity: bool,
    pub non_repudiation: bool,
    pub confidentiality: bool,
    pub availability: bool,
    pub authorization: bool,

    // Provenance
    pub is_ai_generated: bool,
    pub is_confirmed: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Asset {
    pub fn new(id: u64, project_id: u64, data: AssetCreate, ai_generated: bool) -> Self {
        Self {
            id,
            project_id,
            asset_id: data.asset_id,
            name: data.name,
            category: data.category,
            subcategory: data.subcategory,
            description: data.description,
            remarks: data.remarks,
            authenticity: data.authenticity,
            integrity: data.integrity,
            non_repudiation: data.non_repudiation,
            confidentiality: data.confidentiality,
            availability: data.availability,
            authorization: data.authorization,
            is_ai_generated: ai_generated,
            is_confirmed: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Apply a partial update. Only supplied fields change.
    pub fn apply(&mut self, update: AssetUpdate) {
        if let Some(asset_id) = update.asset_id {
            self.asset_id = asset_id;
        }
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(subcategory) = update.subcategory {
            self.subcategory = Some(subcategory);
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(remarks) = update.remarks {
            self.remarks = Some(remarks);
        }
        if let Some(v) = update.authenticity {
            self.authenticity = v;
        }
        if let Some(v) = update.integrity {
            self.integrity = v;
        }
        if let Some(v) = update.non_repudiation {
            self.non_repudiation = v;
        }
        if let Some(v) = update.confidentiality {
            self.confidentiality = v;
        }
        if let Some(v) = update.availability {
            self.availability = v;
        }
        if let Some(v) = update.authorization {
            self.authorization = v;
        }
        if let Some(v) = update.is_confirmed {
            self.is_confirmed = v;
        }
        self.updated_at = Some(Utc::now());
    }
}

/// Validated input for creating an asset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetCreate {
    pub asset_id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub authenticity: bool,
    #[serde(default)]
    pub integrity: bool,
    #[serde(default)]
    pub non_repudiation: bool,
    #[serde(default)]
    pub confidentiality: bool,
    #[serde(default)]
    pub availability: bool,
    #[serde(default)]
    pub authorization: bool,
}

/// Partial update for an asset. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetUpdate {
    pub asset_id: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub description: Option<String>,
    pub remarks: Option<String>,
    pub authenticity: Option<bool>,
    pub integrity: Option<bool>,
    pub non_repudiation: Option<bool>,
    pub confidentiality: Option<bool>,
    pub availability: Option<bool>,
    pub authorization: Option<bool>,
    pub is_confirmed: Option<bool>,
}

/// Typed directed edge between two assets of the same project.
///
/// Multiple edges between the same pair with different types are allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRelation {
    pub id: u64,
    pub project_id: u64,
    pub source_asset_id: u64,
    pub target_asset_id: u64,
    /// Free-form relation type, e.g. "connects_to"
    pub relation_type: String,
    /// Carrier protocol, e.g. "CAN", "Ethernet"
    pub protocol: Option<String>,
    pub description: Option<String>,
}

/// Validated input for creating an asset relation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRelationCreate {
    pub source_asset_id: u64,
    pub target_asset_id: u64,
    pub relation_type: String,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
