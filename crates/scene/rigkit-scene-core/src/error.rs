use rigkit_api_core::AttrPathError;
use rigkit_graph_core::GraphError;
use thiserror::Error;

/// Failures raised by scene primitives.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("node '{0}' does not exist")]
    NodeNotFound(String),

    #[error("a node or container named '{0}' already exists")]
    NameTaken(String),

    #[error("namespace '{0}' does not exist")]
    NamespaceNotFound(String),

    #[error("namespace '{0}' already exists")]
    NamespaceExists(String),

    #[error("node '{node}' has no attribute '{attribute}'")]
    AttributeNotFound { node: String, attribute: String },

    #[error("node '{node}' already has an attribute named '{attribute}'")]
    AttributeExists { node: String, attribute: String },

    #[error("attribute '{path}' expects a {expected} value")]
    TypeMismatch { path: String, expected: &'static str },

    #[error("attribute '{0}' is read-only")]
    ReadOnly(String),

    #[error("attribute '{path}' is not published by locked container '{container}'")]
    Unpublished { path: String, container: String },

    #[error("container '{0}' does not exist")]
    ContainerNotFound(String),

    #[error("container '{container}' is locked; cannot modify '{node}'")]
    ContainerLocked { container: String, node: String },

    #[error("container '{container}' has no published attribute '{alias}'")]
    AliasNotFound { container: String, alias: String },

    #[error("container '{container}' already publishes '{alias}'")]
    AliasTaken { container: String, alias: String },

    #[error("cannot parent '{node}' under '{parent}': {reason}")]
    InvalidParent {
        node: String,
        parent: String,
        reason: &'static str,
    },

    #[error("'{node}' is not a {expected}")]
    WrongKind { node: String, expected: &'static str },

    #[error("'{start}' is not an ancestor of '{end}'")]
    InvalidIkChain { start: String, end: String },

    #[error("template '{0}' is not registered")]
    TemplateNotFound(String),

    #[error("template '{template}' has no {missing}")]
    TemplateIncomplete {
        template: String,
        missing: &'static str,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Path(#[from] AttrPathError),
}
