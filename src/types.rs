use std::collections::BTreeMap;
use std::fmt;

/// Kind of a cluster object as far as the topology is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Deployment,
    StatefulSet,
    DaemonSet,
    ReplicaSet,
    Job,
    Pod,
    Service,
    Other(String),
}

impl ResourceKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "Deployment" => Self::Deployment,
            "StatefulSet" => Self::StatefulSet,
            "DaemonSet" => Self::DaemonSet,
            "ReplicaSet" => Self::ReplicaSet,
            "Job" => Self::Job,
            "Pod" => Self::Pod,
            "Service" => Self::Service,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Deployment => "Deployment",
            Self::StatefulSet => "StatefulSet",
            Self::DaemonSet => "DaemonSet",
            Self::ReplicaSet => "ReplicaSet",
            Self::Job => "Job",
            Self::Pod => "Pod",
            Self::Service => "Service",
            Self::Other(kind) => kind,
        }
    }

    /// Controllers that own pods directly through an owner reference.
    pub fn owns_pods_directly(&self) -> bool {
        matches!(
            self,
            Self::StatefulSet | Self::DaemonSet | Self::ReplicaSet | Self::Job
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRef {
    pub kind: ResourceKind,
    pub name: String,
}

/// One `label: value` pair surfaced in the diagram next to its node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayField {
    pub label: String,
    pub value: String,
}

impl DisplayField {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Normalized view of a single cluster object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub kind: ResourceKind,
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    /// Controller reference first, then the remaining references in order.
    pub owner_refs: Vec<OwnerRef>,
    pub selector: BTreeMap<String, String>,
    pub display_fields: Vec<DisplayField>,
}

impl ResourceRecord {
    /// The owner reference treated as authoritative for ownership resolution.
    pub fn controller_ref(&self) -> Option<&OwnerRef> {
        self.owner_refs.first()
    }

    pub fn is_owned_by(&self, owner: &ResourceRecord) -> bool {
        self.namespace == owner.namespace
            && self
                .controller_ref()
                .is_some_and(|r| r.kind == owner.kind && r.name == owner.name)
    }
}
