//! JSON-scriptable commands over a [`Rigger`].

use glam::DVec3;
use log::debug;
use rigkit_api_core::{AttrPath, Value};
use rigkit_scene_core::SceneHost;
use serde::{Deserialize, Serialize};

use crate::error::RigError;
use crate::grouping::AnchorMode;
use crate::ids::ModuleId;
use crate::rigger::Rigger;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Install {
        type_id: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        hook_target: Option<String>,
    },
    Lock {
        /// Every blueprint module when absent.
        #[serde(default)]
        modules: Option<Vec<ModuleId>>,
    },
    Rehook {
        module: ModuleId,
        #[serde(default)]
        target: Option<String>,
    },
    Group {
        selection: Vec<String>,
        #[serde(default)]
        anchor: AnchorMode,
        name: String,
    },
    Ungroup {
        groups: Vec<String>,
    },
    Rename {
        module: ModuleId,
        name: String,
    },
    Delete {
        module: ModuleId,
    },
    SetAttr {
        path: AttrPath,
        value: Value,
    },
    /// Place a node at a world position.
    Move {
        node: String,
        position: [f64; 3],
    },
    Evaluate,
}

/// Outcome of one command, with a human-readable reason on failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandReport {
    pub ok: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl CommandReport {
    fn success(message: impl Into<String>, value: Option<serde_json::Value>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            value,
        }
    }

    fn failure(err: &RigError) -> Self {
        Self {
            ok: false,
            message: err.to_string(),
            value: None,
        }
    }
}

fn json<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok()
}

impl<H: SceneHost> Rigger<H> {
    pub fn dispatch(&mut self, command: Command) -> CommandReport {
        debug!("dispatch {command:?}");
        match self.run(command) {
            Ok((message, value)) => CommandReport::success(message, value),
            Err(err) => CommandReport::failure(&err),
        }
    }

    fn run(
        &mut self,
        command: Command,
    ) -> Result<(String, Option<serde_json::Value>), RigError> {
        match command {
            Command::Install {
                type_id,
                name,
                hook_target,
            } => {
                let installed = self.install(&type_id, name.as_deref(), hook_target.as_deref())?;
                Ok((format!("installed {}", installed.module), json(&installed)))
            }
            Command::Lock { modules } => {
                let report = self.lock(modules.as_deref())?;
                Ok((format!("locked {} modules", report.locked.len()), json(&report)))
            }
            Command::Rehook { module, target } => {
                let outcome = self.rehook(&module, target.as_deref())?;
                Ok((format!("rehook {module}"), json(&outcome)))
            }
            Command::Group {
                selection,
                anchor,
                name,
            } => {
                let group = self.group(&selection, anchor, &name)?;
                Ok((format!("created {group}"), json(&group)))
            }
            Command::Ungroup { groups } => {
                self.ungroup(&groups)?;
                Ok((format!("ungrouped {}", groups.join(", ")), None))
            }
            Command::Rename { module, name } => {
                let renamed = self.rename(&module, &name)?;
                Ok((format!("renamed {module} to {renamed}"), json(&renamed)))
            }
            Command::Delete { module } => {
                self.delete(&module)?;
                Ok((format!("deleted {module}"), None))
            }
            Command::SetAttr { path, value } => {
                self.host_mut().set_attr(&path, value)?;
                Ok((format!("set {path}"), None))
            }
            Command::Move { node, position } => {
                self.host_mut()
                    .set_world_position(&node, DVec3::from_array(position))?;
                Ok((format!("moved {node}"), None))
            }
            Command::Evaluate => {
                let report = self.host_mut().evaluate()?;
                Ok((format!("evaluated in {} passes", report.passes), json(&report)))
            }
        }
    }
}
