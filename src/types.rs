use colored::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Threat types (STRIDE model adapted for automotive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrideType {
    /// Spoofing (impersonation)
    #[serde(rename = "S")]
    Spoofing,
    /// Tampering (data modification)
    #[serde(rename = "T")]
    Tampering,
    /// Repudiation (denial of actions)
    #[serde(rename = "R")]
    Repudiation,
    /// Information disclosure
    #[serde(rename = "I")]
    InformationDisclosure,
    /// Denial of service
    #[serde(rename = "D")]
    DenialOfService,
    /// Elevation of privilege
    #[serde(rename = "E")]
    ElevationOfPrivilege,
}

impl StrideType {
    /// Single-letter code used in threat records
    pub fn letter(&self) -> &'static str {
        match self {
            StrideType::Spoofing => "S",
            StrideType::Tampering => "T",
            StrideType::Repudiation => "R",
            StrideType::InformationDisclosure => "I",
            StrideType::DenialOfService => "D",
            StrideType::ElevationOfPrivilege => "E",
        }
    }

    /// Parse a STRIDE type from a single-letter code or full name
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "S" | "Spoofing" => Some(StrideType::Spoofing),
            "T" | "Tampering" => Some(StrideType::Tampering),
            "R" | "Repudiation" => Some(StrideType::Repudiation),
            "I" | "Information Disclosure" => Some(StrideType::InformationDisclosure),
            "D" | "Denial of Service" => Some(StrideType::DenialOfService),
            "E" | "Elevation of Privilege" => Some(StrideType::ElevationOfPrivilege),
            _ => None,
        }
    }

    /// Security attribute conventionally threatened by this STRIDE type
    pub fn default_security_attribute(&self) -> &'static str {
        match self {
            StrideType::Spoofing => "Authenticity",
            StrideType::Tampering => "Integrity",
            StrideType::Repudiation => "Non-repudiation",
            StrideType::InformationDisclosure => "Confidentiality",
            StrideType::DenialOfService => "Availability",
            StrideType::ElevationOfPrivilege => "Authorization",
        }
    }
}

impl fmt::Display for StrideType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrideType::Spoofing => write!(f, "Spoofing"),
            StrideType::Tampering => write!(f, "Tampering"),
            StrideType::Repudiation => write!(f, "Repudiation"),
            StrideType::InformationDisclosure => write!(f, "Information Disclosure"),
            StrideType::DenialOfService => write!(f, "Denial of Service"),
            StrideType::ElevationOfPrivilege => write!(f, "Elevation of Privilege"),
        }
    }
}

/// Attack feasibility classification (ISO 21434)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Feasibility {
    #[serde(rename = "Very Low")]
    VeryLow,
    Low,
    Medium,
    High,
}

impl Feasibility {
    /// Ordinal value (0-3)
    pub fn value(&self) -> u8 {
        match self {
            Feasibility::VeryLow => 0,
            Feasibility::Low => 1,
            Feasibility::Medium => 2,
            Feasibility::High => 3,
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Feasibility::VeryLow => "Very Low",
            Feasibility::Low => "Low",
            Feasibility::Medium => "Medium",
            Feasibility::High => "High",
        }
    }
}

impl fmt::Display for Feasibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Impact classification derived from the worst affected dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ImpactLevel {
    Negligible,
    Moderate,
    Major,
    Severe,
}

impl ImpactLevel {
    /// Ordinal value (0-3)
    pub fn value(&self) -> u8 {
        match self {
            ImpactLevel::Negligible => 0,
            ImpactLevel::Moderate => 1,
            ImpactLevel::Major => 2,
            ImpactLevel::Severe => 3,
        }
    }

    /// Map an ordinal back to its classification (values above 3 saturate)
    pub fn from_value(value: u8) -> Self {
        match value {
            0 => ImpactLevel::Negligible,
            1 => ImpactLevel::Moderate,
            2 => ImpactLevel::Major,
            _ => ImpactLevel::Severe,
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            ImpactLevel::Negligible => "Negligible",
            ImpactLevel::Moderate => "Moderate",
            ImpactLevel::Major => "Major",
            ImpactLevel::Severe => "Severe",
        }
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Risk level (ISO 21434 risk matrix, levels 1-5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Acceptable,
    Low,
    Medium,
    High,
    Severe,
}

impl RiskLevel {
    /// Canonical level (1-5), used for comparisons and sorting
    pub fn level(&self) -> u8 {
        match self {
            RiskLevel::Acceptable => 1,
            RiskLevel::Low => 2,
            RiskLevel::Medium => 3,
            RiskLevel::High => 4,
            RiskLevel::Severe => 5,
        }
    }

    /// Parse a level (1-5) back to its classification
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(RiskLevel::Acceptable),
            2 => Some(RiskLevel::Low),
            3 => Some(RiskLevel::Medium),
            4 => Some(RiskLevel::High),
            5 => Some(RiskLevel::Severe),
            _ => None,
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Acceptable => "Acceptable",
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Severe => "Severe",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Acceptable => write!(f, "{}", "ACCEPTABLE".green()),
            RiskLevel::Low => write!(f, "{}", "LOW".cyan()),
            RiskLevel::Medium => write!(f, "{}", "MEDIUM".yellow()),
            RiskLevel::High => write!(f, "{}", "HIGH".bright_red()),
            RiskLevel::Severe => write!(f, "{}", "SEVERE".red().bold()),
        }
    }
}

/// Risk treatment decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreatmentDecision {
    Accept,
    Reduce,
    Avoid,
    Transfer,
}

impl TreatmentDecision {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Accept" => Some(TreatmentDecision::Accept),
            "Reduce" => Some(TreatmentDecision::Reduce),
            "Avoid" => Some(TreatmentDecision::Avoid),
            "Transfer" => Some(TreatmentDecision::Transfer),
            _ => None,
        }
    }
}

impl fmt::Display for TreatmentDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreatmentDecision::Accept => write!(f, "Accept"),
            TreatmentDecision::Reduce => write!(f, "Reduce"),
            TreatmentDecision::Avoid => write!(f, "Avoid"),
            TreatmentDecision::Transfer => write!(f, "Transfer"),
        }
    }
}

/// Implementation state of a security mitigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationStatus {
    Planned,
    InProgress,
    Implemented,
    Verified,
}

impl ImplementationStatus {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "planned" => Some(ImplementationStatus::Planned),
            "in_progress" => Some(ImplementationStatus::InProgress),
            "implemented" => Some(ImplementationStatus::Implemented),
            "verified" => Some(ImplementationStatus::Verified),
            _ => None,
        }
    }
}

impl Default for ImplementationStatus {
    fn default() -> Self {
        ImplementationStatus::Planned
    }
}

impl fmt::Display for ImplementationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImplementationStatus::Planned => write!(f, "planned"),
            ImplementationStatus::InProgress => write!(f, "in_progress"),
            ImplementationStatus::Implemented => write!(f, "implemented"),
            ImplementationStatus::Verified => write!(f, "verified"),
        }
    }
}

/// Analysis project lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Draft,
    Analyzing,
    Paused,
    Completed,
    Archived,
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::Draft
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectStatus::Draft => write!(f, "draft"),
            ProjectStatus::Analyzing => write!(f, "analyzing"),
            ProjectStatus::Paused => write!(f, "paused"),
            ProjectStatus::Completed => write!(f, "completed"),
            ProjectStatus::Archived => write!(f, "archived"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_from_label() {
        assert_eq!(StrideType::from_label("S"), Some(StrideType::Spoofing));
        assert_eq!(StrideType::from_label("Spoofing"), Some(StrideType::Spoofing));
        assert_eq!(
            StrideType::from_label("Denial of Service"),
            Some(StrideType::DenialOfService)
        );
        assert_eq!(StrideType::from_label("X"), None);
    }

    #[test]
    fn test_stride_default_attribute() {
        assert_eq!(
            StrideType::InformationDisclosure.default_security_attribute(),
            "Confidentiality"
        );
        assert_eq!(
            StrideType::ElevationOfPrivilege.default_security_attribute(),
            "Authorization"
        );
    }

    #[test]
    fn test_risk_level_roundtrip() {
        for level in 1..=5u8 {
            let risk = RiskLevel::from_level(level).unwrap();
            assert_eq!(risk.level(), level);
        }
        assert_eq!(RiskLevel::from_level(0), None);
        assert_eq!(RiskLevel::from_level(6), None);
    }

    #[test]
    fn test_ordinal_orderings() {
        assert!(Feasibility::VeryLow < Feasibility::High);
        assert!(ImpactLevel::Negligible < ImpactLevel::Severe);
        assert!(RiskLevel::Acceptable < RiskLevel::Severe);
    }

    #[test]
    fn test_impact_from_value_saturates() {
        assert_eq!(ImpactLevel::from_value(3), ImpactLevel::Severe);
        assert_eq!(ImpactLevel::from_value(7), ImpactLevel::Severe);
    }

    #[test]
    fn test_serde_labels() {
        assert_eq!(
            serde_json::to_string(&Feasibility::VeryLow).unwrap(),
            "\"Very Low\""
        );
        assert_eq!(serde_json::to_string(&RiskLevel::Acceptable).unwrap(), "\"Acceptable\"");
        assert_eq!(
            serde_json::to_string(&ImplementationStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(serde_json::to_string(&StrideType::Tampering).unwrap(), "\"T\"");
    }
}
