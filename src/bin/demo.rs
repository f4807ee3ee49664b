use colored::*;
use std::sync::Arc;
use tara_engine::analysis::{self, AnalysisError, CandidateProducer};
use tara_engine::asset::{Asset, AssetCreate, AssetRelationCreate};
use tara_engine::store::{Project, ProjectStore, ThreatFilter};
use tara_engine::threat::ThreatCreate;
use tara_engine::types::StrideType;

/// Canned producer standing in for the completion service
struct CannedProducer;

#[async_trait::async_trait]
impl CandidateProducer for CannedProducer {
    async fn propose_threats(&self, asset: &Asset) -> Result<String, AnalysisError> {
        Ok(format!(
            r#"```json
{{
    "threats": [
        {{
            "threat_id": "T-{id}01",
            "stride_type": "Tampering",
            "threat_description": "Malicious reflash of {name} firmware",
            "attack_vector": "Physical",
            "attack_complexity": "Low",
            "privileges_required": "Low",
            "user_interaction": "None",
            "impact_safety": "S3",
            "impact_financial": "F2",
            "impact_operational": "O2",
            "impact_privacy": "P0",
            "security_goal": "Only authentic firmware runs on {name}",
            "wp29_control": "M10"
        }}
    ]
}}
```"#,
            id = asset.id,
            name = asset.name,
        ))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "{}",
        "═══════════════════════════════════════════════════════════════"
            .cyan()
            .bold()
    );
    println!(
        "{}",
        "     TARA Engine Demo - Threat Analysis & Risk Assessment      "
            .cyan()
            .bold()
    );
    println!(
        "{}",
        "═══════════════════════════════════════════════════════════════"
            .cyan()
            .bold()
    );
    println!();

    println!("{} Opening project store...", "→".green());
    let mut store = ProjectStore::new(Project::new(1, "Demo Vehicle Platform"));

    println!("{} Registering assets...", "→".green());
    let telematics = store.create_asset(
        AssetCreate {
            asset_id: "A-001".to_string(),
            name: "Telematics ECU".to_string(),
            category: "ECU".to_string(),
            subcategory: Some("Connectivity".to_string()),
            confidentiality: true,
            integrity: true,
            ..Default::default()
        },
        false,
    )?;
    let gateway = store.create_asset(
        AssetCreate {
            asset_id: "A-002".to_string(),
            name: "Central Gateway".to_string(),
            category: "ECU".to_string(),
            subcategory: Some("Network".to_string()),
            integrity: true,
            availability: true,
            ..Default::default()
        },
        false,
    )?;
    let brake = store.create_asset(
        AssetCreate {
            asset_id: "A-003".to_string(),
            name: "Brake Controller".to_string(),
            category: "ECU".to_string(),
            subcategory: Some("Chassis".to_string()),
            integrity: true,
            availability: true,
            ..Default::default()
        },
        false,
    )?;
    println!("{} 3 assets registered", "✓".green());

    println!("{} Wiring the asset graph...", "→".green());
    store.create_relation(AssetRelationCreate {
        source_asset_id: telematics,
        target_asset_id: gateway,
        relation_type: "connects_to".to_string(),
        protocol: Some("Ethernet".to_string()),
        description: None,
    })?;
    store.create_relation(AssetRelationCreate {
        source_asset_id: gateway,
        target_asset_id: brake,
        relation_type: "routes_to".to_string(),
        protocol: Some("CAN".to_string()),
        description: None,
    })?;
    let graph = store.asset_graph();
    println!(
        "{} Graph ready: {} nodes, {} edges",
        "✓".green(),
        graph.node_count(),
        graph.edge_count()
    );
    println!();

    println!("{} Recording a manual threat...", "→".green());
    let threat = store.create_threat(
        ThreatCreate {
            asset_id: telematics,
            threat_id: "T-001".to_string(),
            security_attribute: "Confidentiality".to_string(),
            stride_type: StrideType::InformationDisclosure,
            threat_description: "Remote eavesdropping on telematics traffic".to_string(),
            damage_scenario: Some("Trip and location data exposed".to_string()),
            attack_path: Some("Cellular link -> telematics stack".to_string()),
            source_reference: None,
            wp29_mapping: Some("4.3.2".to_string()),
            attack_vector: Some("Network".to_string()),
            attack_complexity: Some("Low".to_string()),
            privileges_required: Some("None".to_string()),
            user_interaction: Some("None".to_string()),
            impact_safety: Some("S0".to_string()),
            impact_financial: Some("F1".to_string()),
            impact_operational: Some("O1".to_string()),
            impact_privacy: Some("P2".to_string()),
        },
        false,
    )?;
    let recorded = store.apply_suggested_treatment(threat)?;
    println!("{} Threat T-001 assessed, treatment: {}", "✓".green(), recorded);
    println!();

    println!("{} Running AI-assisted analysis over all assets...", "→".green());
    let assets: Vec<Asset> = store
        .list_assets(&Default::default())
        .into_iter()
        .cloned()
        .collect();
    let batch = analysis::analyze_assets(Arc::new(CannedProducer), assets).await;
    println!(
        "{} Batch complete: {} assets analyzed, {} failures",
        "✓".green(),
        batch.proposals.len(),
        batch.failures.len()
    );

    for (_, candidates) in batch.proposals {
        let outcome = analysis::ingest_candidates(&mut store, candidates);
        for rejected in &outcome.rejected {
            println!("  {} candidate {} rejected: {}", "!".yellow(), rejected.0, rejected.1);
        }
    }
    println!(
        "{} {} threats on record",
        "✓".green(),
        store.list_threats(&ThreatFilter::default()).len()
    );
    println!();

    println!("{}", store.render_report());

    Ok(())
}
