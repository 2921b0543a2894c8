//! Per-namespace glue: raw snapshot -> records -> one document per workload.

use crate::document::{assemble, title_for};
use crate::error::{ModelError, TopologyError};
use crate::graph::{BuildOptions, build_graph_with};
use crate::kubernetes::NamespaceSnapshot;
use crate::model::normalize_all;
use crate::render::render;
use crate::types::{ResourceKind, ResourceRecord};
use crate::utils::selector_matches;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub build: BuildOptions,
    /// Omit the display-field leaves from every diagram.
    pub hide_fields: bool,
}

/// Normalized records of one namespace.
#[derive(Debug, Clone, Default)]
pub struct NamespaceRecords {
    pub namespace: String,
    pub workloads: Vec<ResourceRecord>,
    pub pods: Vec<ResourceRecord>,
    pub services: Vec<ResourceRecord>,
    pub replica_sets: Vec<ResourceRecord>,
    /// Records dropped because they lacked a name or namespace.
    pub skipped: Vec<ModelError>,
}

impl NamespaceRecords {
    pub fn from_snapshot(snapshot: &NamespaceSnapshot) -> Self {
        let mut skipped = Vec::new();

        let replica_sets = normalize_all(&snapshot.replica_sets, &mut skipped);
        let mut workloads = normalize_all(&snapshot.deployments, &mut skipped);
        workloads.extend(normalize_all(&snapshot.stateful_sets, &mut skipped));
        workloads.extend(normalize_all(&snapshot.daemon_sets, &mut skipped));
        workloads.extend(normalize_all(&snapshot.jobs, &mut skipped));
        // Standalone replica sets; owned ones are drawn under their deployment.
        workloads.extend(
            replica_sets
                .iter()
                .filter(|rs| rs.owner_refs.is_empty())
                .cloned(),
        );

        Self {
            namespace: snapshot.namespace.clone(),
            workloads,
            pods: normalize_all(&snapshot.pods, &mut skipped),
            services: normalize_all(&snapshot.services, &mut skipped),
            replica_sets,
            skipped,
        }
    }

    /// Keep only workloads whose labels carry every `selector` entry.
    pub fn retain_workloads(&mut self, selector: &BTreeMap<String, String>) {
        if selector.is_empty() {
            return;
        }
        self.workloads
            .retain(|w| selector_matches(selector, &w.labels));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadDocument {
    pub namespace: String,
    pub name: String,
    pub kind: ResourceKind,
    pub text: String,
}

pub fn document_for(
    workload: &ResourceRecord,
    records: &NamespaceRecords,
    options: &RenderOptions,
) -> Result<WorkloadDocument, TopologyError> {
    let graph = build_graph_with(
        workload,
        &records.pods,
        &records.services,
        &records.replica_sets,
        &options.build,
    );
    let empty = BTreeMap::new();
    let fields = if options.hide_fields {
        &empty
    } else {
        graph.display_fields()
    };
    let diagram = render(&graph, fields)?;

    Ok(WorkloadDocument {
        namespace: workload.namespace.clone(),
        name: workload.name.clone(),
        kind: workload.kind.clone(),
        text: assemble(&title_for(workload), &diagram),
    })
}

/// One result per workload, in workload order.
pub fn render_namespace(
    records: &NamespaceRecords,
    options: &RenderOptions,
) -> Vec<Result<WorkloadDocument, TopologyError>> {
    records
        .workloads
        .iter()
        .map(|w| document_for(w, records, options))
        .collect()
}
