//! rigkit-api-core: values, attribute paths and write batches shared by the
//! dependency network and the scene host.

pub mod attr_path;
pub mod coercion;
pub mod value;
pub mod write_ops;

pub use attr_path::{split_namespace, AttrPath, AttrPathError};
pub use value::{Value, ValueKind};
pub use write_ops::{WriteBatch, WriteOp};
