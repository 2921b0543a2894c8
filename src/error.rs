use crate::types::ResourceKind;
use thiserror::Error;

/// Raised by the resource adapter when an object lacks its identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("malformed {kind} record: metadata.{field} is missing")]
    MalformedRecord {
        kind: ResourceKind,
        field: &'static str,
    },
}

/// Raised by the renderer when a graph breaks its own invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("edge {from} --> {to} references unknown node {missing}")]
    DanglingEdge {
        from: String,
        to: String,
        missing: String,
    },
}

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Render(#[from] RenderError),
}
