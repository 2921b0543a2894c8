//! Mermaid flowchart rendering of a [`Graph`].

use crate::error::RenderError;
use crate::graph::Graph;
use crate::types::{DisplayField, ResourceKind};
use crate::utils::{sanitize_id, sanitize_label, short_hash};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;
use tracing::debug;

const INDENT: &str = "    ";
const FIELD_CLASS: &str = "field";

fn class_for(kind: &ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Deployment
        | ResourceKind::StatefulSet
        | ResourceKind::DaemonSet
        | ResourceKind::Job => "workload",
        ResourceKind::ReplicaSet => "replicaset",
        ResourceKind::Pod => "pod",
        ResourceKind::Service => "service",
        ResourceKind::Other(_) => "other",
    }
}

fn class_style(class: &str) -> &'static str {
    match class {
        "workload" => "fill:#326ce5,stroke:#1b3f8b,color:#fff",
        "replicaset" => "fill:#e8eefc,stroke:#326ce5",
        "pod" => "fill:#d9f2e6,stroke:#2e8b57",
        "service" => "fill:#fff4d6,stroke:#d4a017",
        FIELD_CLASS => "fill:#f7f7f7,stroke:#bbb,font-size:11px",
        _ => "fill:#eee,stroke:#999",
    }
}

/// Render `graph` as a Mermaid flowchart.
///
/// Display fields keyed by node ids that are not part of the graph are
/// ignored. Fails only when an edge points at an id with no node.
pub fn render(
    graph: &Graph,
    display_fields: &BTreeMap<String, Vec<DisplayField>>,
) -> Result<String, RenderError> {
    for edge in graph.edges() {
        for end in [&edge.from, &edge.to] {
            if !graph.contains(end) {
                return Err(RenderError::DanglingEdge {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    missing: end.clone(),
                });
            }
        }
    }
    for id in display_fields.keys().filter(|id| !graph.contains(id)) {
        debug!("Ignoring display fields for unknown node {}", id);
    }

    let mut taken: HashSet<String> = graph.nodes().iter().map(|n| n.id.clone()).collect();
    let mut classes: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
    let mut out = String::from("flowchart TD\n");

    let mut links = Vec::new();
    for node in graph.nodes() {
        let _ = writeln!(out, "{INDENT}{}[\"{}\"]", node.id, sanitize_label(&node.label));
        classes
            .entry(class_for(&node.kind))
            .or_default()
            .push(node.id.clone());

        for (i, field) in display_fields.get(&node.id).into_iter().flatten().enumerate() {
            let leaf = field_id(&node.id, i, &mut taken);
            let text = format!("{}: {}", field.label, field.value);
            let _ = writeln!(out, "{INDENT}{}[\"{}\"]", leaf, sanitize_label(&text));
            links.push(format!("{INDENT}{} -.- {}", node.id, leaf));
            classes.entry(FIELD_CLASS).or_default().push(leaf);
        }
    }

    for link in links {
        out.push_str(&link);
        out.push('\n');
    }
    for edge in graph.edges() {
        let _ = writeln!(out, "{INDENT}{} --> {}", edge.from, edge.to);
    }

    for class in classes.keys() {
        let _ = writeln!(out, "{INDENT}classDef {} {}", class, class_style(class));
    }
    for (class, ids) in &classes {
        let _ = writeln!(out, "{INDENT}class {} {}", ids.join(","), class);
    }

    Ok(out)
}

// Leaf ids carry an `f_` prefix; primary ids always start with a kind name.
fn field_id(parent: &str, index: usize, taken: &mut HashSet<String>) -> String {
    let base = sanitize_id(&format!("f_{}_{}", parent, index));
    let mut candidate = base.clone();
    let mut salt = 0u32;
    while taken.contains(&candidate) {
        let (index_str, salt_str) = (index.to_string(), salt.to_string());
        let digest = short_hash(&[parent, index_str.as_str(), salt_str.as_str()]);
        candidate = format!("{}_{}", base, digest);
        salt += 1;
    }
    taken.insert(candidate.clone());
    candidate
}
