//! Normalization of typed cluster objects into [`ResourceRecord`]s.
//!
//! Each supported kind implements [`RawResource`], which fixes the selector
//! and the handful of spec/status fields worth drawing next to the node.

use crate::error::ModelError;
use crate::types::{DisplayField, OwnerRef, ResourceKind, ResourceRecord};
use k8s_openapi::Metadata;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Container, Pod, PodTemplateSpec, Service};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;
use tracing::warn;

pub trait RawResource: Metadata<Ty = ObjectMeta> {
    fn kind() -> ResourceKind;

    fn selector(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn display_fields(&self) -> Vec<DisplayField>;
}

/// Normalize a typed object; only a missing name or namespace is an error.
pub fn normalize<T: RawResource>(raw: &T) -> Result<ResourceRecord, ModelError> {
    let meta = raw.metadata();
    let name = required(meta.name.as_deref(), T::kind(), "name")?;
    let namespace = required(meta.namespace.as_deref(), T::kind(), "namespace")?;

    let mut owner_refs: Vec<(bool, OwnerRef)> = meta
        .owner_references
        .iter()
        .flatten()
        .map(|r| {
            (
                r.controller.unwrap_or(false),
                OwnerRef {
                    kind: ResourceKind::parse(&r.kind),
                    name: r.name.clone(),
                },
            )
        })
        .collect();
    // stable: keeps the relative order of the remaining references
    owner_refs.sort_by_key(|(controller, _)| !controller);

    Ok(ResourceRecord {
        kind: T::kind(),
        name,
        namespace,
        labels: meta.labels.clone().unwrap_or_default(),
        annotations: meta.annotations.clone().unwrap_or_default(),
        owner_refs: owner_refs.into_iter().map(|(_, r)| r).collect(),
        selector: raw.selector(),
        display_fields: raw.display_fields(),
    })
}

/// Normalize a batch, logging and dropping records that fail.
pub fn normalize_all<T: RawResource>(
    raws: &[T],
    skipped: &mut Vec<ModelError>,
) -> Vec<ResourceRecord> {
    let mut records = Vec::with_capacity(raws.len());
    for raw in raws {
        match normalize(raw) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Skipping record: {}", e);
                skipped.push(e);
            }
        }
    }
    records
}

fn required(
    value: Option<&str>,
    kind: ResourceKind,
    field: &'static str,
) -> Result<String, ModelError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ModelError::MalformedRecord { kind, field }),
    }
}

impl RawResource for Deployment {
    fn kind() -> ResourceKind {
        ResourceKind::Deployment
    }

    fn selector(&self) -> BTreeMap<String, String> {
        self.spec
            .as_ref()
            .map(|s| match_labels(&s.selector))
            .unwrap_or_default()
    }

    fn display_fields(&self) -> Vec<DisplayField> {
        let mut fields = Vec::new();
        if let Some(spec) = &self.spec {
            push_opt(&mut fields, "replicas", spec.replicas);
        }
        if let Some(status) = &self.status {
            fields.push(DisplayField::new(
                "status",
                format!(
                    "{} ready, {} available, {} updated",
                    status.ready_replicas.unwrap_or(0),
                    status.available_replicas.unwrap_or(0),
                    status.updated_replicas.unwrap_or(0)
                ),
            ));
            push_conditions(
                &mut fields,
                status.conditions.iter().flatten().map(|c| c.type_.as_str()),
            );
        }
        if let Some(spec) = &self.spec {
            template_fields(&spec.template, &mut fields);
        }
        fields
    }
}

impl RawResource for StatefulSet {
    fn kind() -> ResourceKind {
        ResourceKind::StatefulSet
    }

    fn selector(&self) -> BTreeMap<String, String> {
        self.spec
            .as_ref()
            .map(|s| match_labels(&s.selector))
            .unwrap_or_default()
    }

    fn display_fields(&self) -> Vec<DisplayField> {
        let mut fields = Vec::new();
        if let Some(spec) = &self.spec {
            push_opt(&mut fields, "replicas", spec.replicas);
        }
        if let Some(status) = &self.status {
            fields.push(DisplayField::new(
                "status",
                format!(
                    "{} ready, {} current",
                    status.ready_replicas.unwrap_or(0),
                    status.current_replicas.unwrap_or(0)
                ),
            ));
            push_conditions(
                &mut fields,
                status.conditions.iter().flatten().map(|c| c.type_.as_str()),
            );
        }
        if let Some(spec) = &self.spec {
            template_fields(&spec.template, &mut fields);
        }
        fields
    }
}

impl RawResource for DaemonSet {
    fn kind() -> ResourceKind {
        ResourceKind::DaemonSet
    }

    fn selector(&self) -> BTreeMap<String, String> {
        self.spec
            .as_ref()
            .map(|s| match_labels(&s.selector))
            .unwrap_or_default()
    }

    fn display_fields(&self) -> Vec<DisplayField> {
        let mut fields = Vec::new();
        if let Some(status) = &self.status {
            fields.push(DisplayField::new(
                "status",
                format!(
                    "{}/{} scheduled, {} ready",
                    status.current_number_scheduled,
                    status.desired_number_scheduled,
                    status.number_ready
                ),
            ));
            push_conditions(
                &mut fields,
                status.conditions.iter().flatten().map(|c| c.type_.as_str()),
            );
        }
        if let Some(spec) = &self.spec {
            template_fields(&spec.template, &mut fields);
        }
        fields
    }
}

impl RawResource for ReplicaSet {
    fn kind() -> ResourceKind {
        ResourceKind::ReplicaSet
    }

    fn selector(&self) -> BTreeMap<String, String> {
        self.spec
            .as_ref()
            .map(|s| match_labels(&s.selector))
            .unwrap_or_default()
    }

    fn display_fields(&self) -> Vec<DisplayField> {
        let mut fields = Vec::new();
        if let Some(spec) = &self.spec {
            push_opt(&mut fields, "replicas", spec.replicas);
        }
        if let Some(status) = &self.status {
            fields.push(DisplayField::new(
                "status",
                format!(
                    "{} ready, {} available",
                    status.ready_replicas.unwrap_or(0),
                    status.available_replicas.unwrap_or(0)
                ),
            ));
            push_conditions(
                &mut fields,
                status.conditions.iter().flatten().map(|c| c.type_.as_str()),
            );
        }
        if let Some(template) = self.spec.as_ref().and_then(|s| s.template.as_ref()) {
            template_fields(template, &mut fields);
        }
        fields
    }
}

impl RawResource for Job {
    fn kind() -> ResourceKind {
        ResourceKind::Job
    }

    fn selector(&self) -> BTreeMap<String, String> {
        self.spec
            .as_ref()
            .and_then(|s| s.selector.as_ref())
            .map(match_labels)
            .unwrap_or_default()
    }

    fn display_fields(&self) -> Vec<DisplayField> {
        let mut fields = Vec::new();
        if let Some(spec) = &self.spec {
            push_opt(&mut fields, "completions", spec.completions);
            push_opt(&mut fields, "parallelism", spec.parallelism);
        }
        if let Some(status) = &self.status {
            fields.push(DisplayField::new(
                "status",
                format!(
                    "{} active, {} succeeded, {} failed",
                    status.active.unwrap_or(0),
                    status.succeeded.unwrap_or(0),
                    status.failed.unwrap_or(0)
                ),
            ));
            push_conditions(
                &mut fields,
                status.conditions.iter().flatten().map(|c| c.type_.as_str()),
            );
        }
        if let Some(spec) = &self.spec {
            template_fields(&spec.template, &mut fields);
        }
        fields
    }
}

impl RawResource for Pod {
    fn kind() -> ResourceKind {
        ResourceKind::Pod
    }

    fn display_fields(&self) -> Vec<DisplayField> {
        let mut fields = Vec::new();
        if let Some(status) = &self.status {
            if let Some(phase) = &status.phase {
                fields.push(DisplayField::new("phase", phase.clone()));
            }
            let restarts: i64 = status
                .container_statuses
                .iter()
                .flatten()
                .map(|cs| i64::from(cs.restart_count))
                .sum();
            if restarts > 0 {
                fields.push(DisplayField::new("restarts", restarts.to_string()));
            }
        }
        if let Some(spec) = &self.spec {
            if let Some(node) = &spec.node_name {
                fields.push(DisplayField::new("node", node.clone()));
            }
            for c in &spec.containers {
                if let Some(image) = &c.image {
                    fields.push(DisplayField::new(format!("{}.image", c.name), image.clone()));
                }
            }
        }
        fields
    }
}

impl RawResource for Service {
    fn kind() -> ResourceKind {
        ResourceKind::Service
    }

    fn selector(&self) -> BTreeMap<String, String> {
        self.spec
            .as_ref()
            .and_then(|s| s.selector.clone())
            .unwrap_or_default()
    }

    fn display_fields(&self) -> Vec<DisplayField> {
        let mut fields = Vec::new();
        let Some(spec) = &self.spec else {
            return fields;
        };
        if let Some(type_) = &spec.type_ {
            fields.push(DisplayField::new("type", type_.clone()));
        }
        if let Some(selector) = spec.selector.as_ref().filter(|s| !s.is_empty()) {
            fields.push(DisplayField::new("selector", join_pairs(selector, "=")));
        }
        let ports: Vec<String> = spec
            .ports
            .iter()
            .flatten()
            .map(|p| {
                let target = match &p.target_port {
                    Some(IntOrString::Int(port)) => port.to_string(),
                    Some(IntOrString::String(name)) => name.clone(),
                    None => p.port.to_string(),
                };
                let protocol = p.protocol.as_deref().unwrap_or("TCP");
                match &p.name {
                    Some(name) => format!("{}:{}->{}/{}", name, p.port, target, protocol),
                    None => format!("{}->{}/{}", p.port, target, protocol),
                }
            })
            .collect();
        if !ports.is_empty() {
            fields.push(DisplayField::new("ports", ports.join(", ")));
        }
        fields
    }
}

fn match_labels(selector: &LabelSelector) -> BTreeMap<String, String> {
    selector.match_labels.clone().unwrap_or_default()
}

fn push_opt(fields: &mut Vec<DisplayField>, label: &str, value: Option<i32>) {
    if let Some(value) = value {
        fields.push(DisplayField::new(label, value.to_string()));
    }
}

fn push_conditions<'a>(fields: &mut Vec<DisplayField>, types: impl Iterator<Item = &'a str>) {
    let types: Vec<&str> = types.collect();
    if !types.is_empty() {
        fields.push(DisplayField::new("conditions", types.join(", ")));
    }
}

fn join_pairs<V: AsRef<str>>(map: &BTreeMap<String, V>, sep: &str) -> String {
    map.iter()
        .map(|(k, v)| format!("{}{}{}", k, sep, v.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn quantities(map: Option<&BTreeMap<String, Quantity>>) -> Option<String> {
    let map = map.filter(|m| !m.is_empty())?;
    Some(
        map.iter()
            .map(|(k, q)| format!("{}={}", k, q.0))
            .collect::<Vec<_>>()
            .join(", "),
    )
}

fn template_fields(template: &PodTemplateSpec, fields: &mut Vec<DisplayField>) {
    for c in template.spec.iter().flat_map(|s| &s.containers) {
        container_fields(c, fields);
    }
}

// Env values can carry secrets; only names are surfaced.
fn container_fields(c: &Container, fields: &mut Vec<DisplayField>) {
    let label = |suffix: &str| format!("{}.{}", c.name, suffix);

    if let Some(image) = &c.image {
        fields.push(DisplayField::new(label("image"), image.clone()));
    }
    if let Some(policy) = &c.image_pull_policy {
        fields.push(DisplayField::new(label("pullPolicy"), policy.clone()));
    }
    let env: Vec<&str> = c.env.iter().flatten().map(|e| e.name.as_str()).collect();
    if !env.is_empty() {
        fields.push(DisplayField::new(label("env"), env.join(", ")));
    }
    let mounts: Vec<&str> = c
        .volume_mounts
        .iter()
        .flatten()
        .map(|m| m.name.as_str())
        .collect();
    if !mounts.is_empty() {
        fields.push(DisplayField::new(label("mounts"), mounts.join(", ")));
    }
    if let Some(resources) = &c.resources {
        if let Some(requests) = quantities(resources.requests.as_ref()) {
            fields.push(DisplayField::new(label("requests"), requests));
        }
        if let Some(limits) = quantities(resources.limits.as_ref()) {
            fields.push(DisplayField::new(label("limits"), limits));
        }
    }
}
