//! Scene evaluation configuration.

use serde::{Deserialize, Serialize};

/// Budget for the settle loop run by [`Scene::evaluate`](crate::Scene::evaluate).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Upper bound on network/constraint/IK passes per evaluation.
    pub max_passes: usize,
    /// Largest channel change still considered settled.
    pub tolerance: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            max_passes: 32,
            tolerance: 1e-7,
        }
    }
}
