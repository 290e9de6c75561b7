use rigkit_api_core::AttrPathError;
use rigkit_scene_core::SceneError;
use thiserror::Error;

/// Failures raised by rigging operations.
///
/// Structural errors abort the single operation that raised them; lock batches report
/// [`RigError::LockAborted`] naming the module that stopped the batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RigError {
    #[error("'{name}' is not a valid module name: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("a module named '{0}' already exists")]
    NameConflict(String),

    #[error("invalid joint chain: {0}")]
    InvalidChain(String),

    #[error("chain '{root}' .. '{end}' has zero length")]
    DegenerateChain { root: String, end: String },

    #[error("'{target}' cannot be used as a hook target: {reason}")]
    InvalidHookTarget { target: String, reason: String },

    #[error("module type '{0}' is not in the catalog")]
    ModuleTypeNotFound(String),

    #[error("module '{0}' does not exist")]
    ModuleNotFound(String),

    #[error("module '{0}' is locked")]
    ModuleLocked(String),

    #[error("lock aborted at module '{module}': {reason}")]
    LockAborted { module: String, reason: String },

    #[error("selection contains no module transforms or groups")]
    EmptySelection,

    #[error("'{0}' is not a group")]
    GroupNotFound(String),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Path(#[from] AttrPathError),
}
