//! rigkit-scene-core: the [`SceneHost`] capability trait and [`Scene`], an in-memory host with
//! a DAG, attribute connections evaluated through the dependency network, containers,
//! constraints and IK handles.

mod attrs;
pub mod config;
pub mod constraint;
mod container;
pub mod error;
pub mod host;
pub mod ik;
pub mod math;
mod network;
pub mod node;
mod scene;
pub mod template;
mod transform;

pub use attrs::{CONVERSION_FACTOR, CONVERSION_INPUT, UTILITY_OUTPUT};
pub use config::SceneConfig;
pub use constraint::{ConstraintKind, ConstraintOptions, TARGET_PLUGS};
pub use container::Container;
pub use error::SceneError;
pub use host::SceneHost;
pub use math::RotateOrder;
pub use network::EvalReport;
pub use node::{AttrUnit, NodeKind};
pub use scene::Scene;
pub use template::{ImportedTemplate, Template, TemplateLibrary};

pub use rigkit_api_core::{AttrPath, Value};
pub use rigkit_graph_core::NodeType;
