pub mod error;
pub mod types;
pub mod topo;
pub mod eval;

pub use error::GraphError;
pub use types::*;
pub use topo::topo_order;
pub use eval::{evaluate_all, eval_node, GraphRuntime, StagedInput};
