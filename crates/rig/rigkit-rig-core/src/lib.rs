//! rigkit-rig-core: procedural rigging modules.
//!
//! A module is installed as an editable blueprint rig (joints, translation and orientation
//! controls, stretchy IK segments and a hook chain) inside its own namespace and container.
//! Locking replaces the blueprint with frozen joints that blend between an animation input and
//! the recorded creation pose.
//!
//! [`Rigger`] is the entry point for UIs and scripts; the modules below are its building blocks.

pub mod blueprint;
pub mod boundary;
pub mod catalog;
pub mod chain;
pub mod command;
pub mod config;
pub mod controls;
pub mod error;
pub mod grouping;
pub mod hook;
pub mod ids;
pub mod layout;
pub mod lock;
pub mod module;
pub mod namespace;
pub mod rigger;
pub mod selection;
pub mod stretchy;

pub use blueprint::{ChainBlueprint, HingeJoint, ModuleBlueprint, SingleJoint, SingleJointSegment};
pub use boundary::{EncapsulationBoundary, UnlockGuard};
pub use catalog::{ModuleCatalog, ModuleInfo};
pub use chain::{Axis, ChainAxisSpec, JointDescriptor};
pub use command::{Command, CommandReport};
pub use config::RigConfig;
pub use error::RigError;
pub use grouping::AnchorMode;
pub use hook::HookOutcome;
pub use ids::{ControlId, ControlKind, JointId, ModuleId};
pub use layout::ModuleLayout;
pub use lock::{JointOrientations, LockPhaseRecord, LockReport, LockState};
pub use module::InstalledModule;
pub use namespace::NamespaceRegistry;
pub use rigger::{ModuleRecord, Rigger};
pub use selection::{Routed, SelectionRouter};
pub use stretchy::{StretchyIk, StretchyOptions};
