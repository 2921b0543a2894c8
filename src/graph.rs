//! Per-workload topology graph.
//!
//! The graph holds the workload as its root node, the pods it owns through
//! owner references (optionally via their ReplicaSets) and the services
//! whose selector matches at least one of those pods.

use crate::types::{DisplayField, ResourceKind, ResourceRecord};
use crate::utils::{sanitize_id, sanitize_label, selector_matches, short_hash};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub kind: ResourceKind,
    pub name: String,
}

/// Directed edge, ordered by `(from, to)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Draw Deployment -> ReplicaSet -> Pod instead of Deployment -> Pod.
    pub show_replica_sets: bool,
}

type Identity = (ResourceKind, String, String);

#[derive(Debug, Default, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    identities: HashMap<Identity, String>,
    edges: BTreeSet<Edge>,
    fields: BTreeMap<String, Vec<DisplayField>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record as a node, returning its id. Adding the same
    /// (kind, namespace, name) twice returns the existing id.
    pub fn add_record(&mut self, record: &ResourceRecord) -> String {
        let identity = (
            record.kind.clone(),
            record.namespace.clone(),
            record.name.clone(),
        );
        if let Some(id) = self.identities.get(&identity) {
            return id.clone();
        }

        let id = self.allocate_id(&identity);
        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(Node {
            id: id.clone(),
            label: sanitize_label(&node_label(&record.kind, &record.name)),
            kind: record.kind.clone(),
            name: record.name.clone(),
        });
        if !record.display_fields.is_empty() {
            self.fields
                .insert(id.clone(), record.display_fields.clone());
        }
        self.identities.insert(identity, id.clone());
        id
    }

    fn allocate_id(&self, identity: &Identity) -> String {
        let (kind, namespace, name) = identity;
        let base = format!("{}_{}", sanitize_id(kind.as_str()), sanitize_id(name));
        if !self.index.contains_key(&base) {
            return base;
        }
        let mut salt = 0u32;
        loop {
            let salt_str = salt.to_string();
            let digest = short_hash(&[kind.as_str(), namespace.as_str(), name.as_str(), salt_str.as_str()]);
            let candidate = format!("{}_{}", base, digest);
            if !self.index.contains_key(&candidate) {
                return candidate;
            }
            salt += 1;
        }
    }

    /// Insert an edge; self-edges are dropped and duplicates collapse.
    /// Returns whether the edge was new.
    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return false;
        }
        self.edges.insert(Edge {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Display fields of every node that has any, keyed by node id.
    pub fn display_fields(&self) -> &BTreeMap<String, Vec<DisplayField>> {
        &self.fields
    }
}

fn node_label(kind: &ResourceKind, name: &str) -> String {
    match kind {
        ResourceKind::Pod => name.to_string(),
        _ => format!("{}: {}", kind, name),
    }
}

pub fn build_graph(
    workload: &ResourceRecord,
    pods: &[ResourceRecord],
    services: &[ResourceRecord],
    replica_sets: &[ResourceRecord],
) -> Graph {
    build_graph_with(
        workload,
        pods,
        services,
        replica_sets,
        &BuildOptions::default(),
    )
}

pub fn build_graph_with(
    workload: &ResourceRecord,
    pods: &[ResourceRecord],
    services: &[ResourceRecord],
    replica_sets: &[ResourceRecord],
    options: &BuildOptions,
) -> Graph {
    let mut graph = Graph::new();
    let root = graph.add_record(workload);

    // (intermediate replica set, pod)
    let mut owned: Vec<(Option<&ResourceRecord>, &ResourceRecord)> = Vec::new();
    match &workload.kind {
        ResourceKind::Deployment => {
            for rs in sorted_unique(replica_sets.iter().filter(|rs| rs.is_owned_by(workload))) {
                owned.extend(pods.iter().filter(|p| p.is_owned_by(rs)).map(|p| (Some(rs), p)));
            }
        }
        kind if kind.owns_pods_directly() => {
            owned.extend(pods.iter().filter(|p| p.is_owned_by(workload)).map(|p| (None, p)));
        }
        kind => debug!("{} {} does not own pods", kind, workload.name),
    }
    owned.sort_by(|a, b| a.1.name.cmp(&b.1.name));
    owned.dedup_by(|a, b| a.1.name == b.1.name);

    if options.show_replica_sets {
        for rs in sorted_unique(owned.iter().filter_map(|(rs, _)| *rs)) {
            let rs_id = graph.add_record(rs);
            graph.add_edge(&root, &rs_id);
        }
    }

    let mut pod_ids = Vec::with_capacity(owned.len());
    for (rs, pod) in &owned {
        let pod_id = graph.add_record(pod);
        let parent = match rs {
            Some(rs) if options.show_replica_sets => graph.add_record(rs),
            _ => root.clone(),
        };
        graph.add_edge(&parent, &pod_id);
        pod_ids.push((pod_id, *pod));
    }

    for service in sorted_unique(services.iter()) {
        if service.namespace != workload.namespace {
            continue;
        }
        let matched: Vec<&String> = pod_ids
            .iter()
            .filter(|(_, pod)| selector_matches(&service.selector, &pod.labels))
            .map(|(id, _)| id)
            .collect();
        if matched.is_empty() {
            continue;
        }
        let service_id = graph.add_record(service);
        for pod_id in matched {
            graph.add_edge(&service_id, pod_id);
        }
    }

    debug!(
        "Built graph for {} {}/{}: {} nodes, {} edges",
        workload.kind,
        workload.namespace,
        workload.name,
        graph.nodes().len(),
        graph.edge_count()
    );
    graph
}

fn sorted_unique<'a>(records: impl Iterator<Item = &'a ResourceRecord>) -> Vec<&'a ResourceRecord> {
    let mut records: Vec<&ResourceRecord> = records.collect();
    records.sort_by(|a, b| a.name.cmp(&b.name));
    records.dedup_by(|a, b| a.name == b.name);
    records
}
