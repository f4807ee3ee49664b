/// Asset Relationship Graph (ISO 21434 item definition support)
///
/// Directed multigraph over a project's assets: nodes are assets, edges are
/// typed relations (bus links, protocol connections). Built on demand from
/// flat record collections; traversal goes through adjacency maps rather
/// than object back-references. No cycle restriction, no edge-uniqueness
/// constraint.
use serde::Serialize;
use std::collections::HashMap;

use crate::asset::{Asset, AssetRelation};

/// Graph node carrying the asset fields needed for visualization
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub category: String,
    pub subcategory: Option<String>,
}

/// Graph edge carrying the relation fields needed for visualization
#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation_type: String,
    pub protocol: Option<String>,
}

/// Visualization-ready view of a project's asset graph
#[derive(Debug, Clone, Serialize)]
pub struct AssetGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    #[serde(skip)]
    outgoing: HashMap<u64, Vec<u64>>,
    #[serde(skip)]
    incoming: HashMap<u64, Vec<u64>>,
}

impl AssetGraph {
    /// Build the graph view from a project's assets and relations.
    pub fn build<'a, A, R>(assets: A, relations: R) -> Self
    where
        A: IntoIterator<Item = &'a Asset>,
        R: IntoIterator<Item = &'a AssetRelation>,
    {
        let mut nodes = Vec::new();
        for asset in assets {
            nodes.push(GraphNode {
                id: asset.id.to_string(),
                name: asset.name.clone(),
                category: asset.category.clone(),
                subcategory: asset.subcategory.clone(),
            });
        }

        let mut edges = Vec::new();
        let mut outgoing: HashMap<u64, Vec<u64>> = HashMap::new();
        let mut incoming: HashMap<u64, Vec<u64>> = HashMap::new();
        for relation in relations {
            edges.push(GraphEdge {
                source: relation.source_asset_id.to_string(),
                target: relation.target_asset_id.to_string(),
                relation_type: relation.relation_type.clone(),
                protocol: relation.protocol.clone(),
            });
            outgoing
                .entry(relation.source_asset_id)
                .or_default()
                .push(relation.target_asset_id);
            incoming
                .entry(relation.target_asset_id)
                .or_default()
                .push(relation.source_asset_id);
        }

        Self {
            nodes,
            edges,
            outgoing,
            incoming,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Assets reachable from this asset over one outgoing edge
    pub fn neighbors_out(&self, asset_id: u64) -> &[u64] {
        self.outgoing.get(&asset_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Assets pointing at this asset over one incoming edge
    pub fn neighbors_in(&self, asset_id: u64) -> &[u64] {
        self.incoming.get(&asset_id).map(Vec::as_slice).unwrap_or(&[])
    }
}
