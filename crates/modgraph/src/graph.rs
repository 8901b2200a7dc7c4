//! Serializable view of a resolved dependency graph.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use crate::manifest::Visibility;
use crate::registry::ModuleLookup;
use crate::resolver::{Resolution, Target};

/// A module in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub id: String,
    pub kind: Target,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub editor_only: bool,
    /// Transitive public closure; omitted for host modules, unresolved
    /// names and members of a public cycle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_closure: Option<Vec<String>>,
}

/// A dependency from a manifest to a module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub visibility: Visibility,
    /// Condition of the block that contributed the edge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Nodes sorted by identifier, edges by (from, to, visibility).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    pub config: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cycles: Vec<Vec<String>>,
}

impl DependencyGraph {
    pub fn from_resolution(resolution: &Resolution, registry: &dyn ModuleLookup) -> Self {
        let mut nodes: BTreeMap<String, Node> = BTreeMap::new();
        let mut edges = Vec::new();

        for module in resolution.modules.values() {
            nodes.insert(
                module.name.clone(),
                Node {
                    id: module.name.clone(),
                    kind: Target::Manifest,
                    editor_only: false,
                    public_closure: module
                        .public_closure
                        .as_ref()
                        .map(|c| c.iter().cloned().collect()),
                },
            );
        }

        for module in resolution.modules.values() {
            for dep in module.dependencies() {
                nodes.entry(dep.name.clone()).or_insert_with(|| Node {
                    id: dep.name.clone(),
                    kind: dep.target,
                    editor_only: dep.target == Target::Host && registry.is_editor_only(&dep.name),
                    public_closure: None,
                });
                edges.push(Edge {
                    from: module.name.clone(),
                    to: dep.name.clone(),
                    visibility: dep.visibility,
                    condition: dep.condition.as_ref().map(ToString::to_string),
                });
            }
        }
        edges.sort();

        Self {
            config: resolution.config.label(),
            nodes: nodes.into_values().collect(),
            edges,
            cycles: resolution.cycles.clone(),
        }
    }

    /// Pretty-printed JSON with a trailing newline.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Graphviz rendering. Private edges are dashed, conditional edges
    /// carry their condition as a label.
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph modules {{");
        let _ = writeln!(out, "  label=\"{}\";", self.config);
        let _ = writeln!(out, "  node [shape=box];");
        for node in &self.nodes {
            let style = match node.kind {
                Target::Manifest => "solid",
                Target::Host if node.editor_only => "dotted",
                Target::Host => "rounded",
                Target::Unresolved => "dashed",
            };
            let color = if node.kind == Target::Unresolved { ", color=red" } else { "" };
            let _ = writeln!(out, "  \"{}\" [style={style}{color}];", node.id);
        }
        for edge in &self.edges {
            let mut attrs = Vec::new();
            if edge.visibility == Visibility::Private {
                attrs.push("style=dashed".to_string());
            }
            if let Some(condition) = &edge.condition {
                attrs.push(format!("label=\"{condition}\""));
            }
            let attrs = if attrs.is_empty() {
                String::new()
            } else {
                format!(" [{}]", attrs.join(", "))
            };
            let _ = writeln!(out, "  \"{}\" -> \"{}\"{attrs};", edge.from, edge.to);
        }
        out.push_str("}\n");
        out
    }
}
