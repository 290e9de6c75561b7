//! Routing of host selection notifications.
//!
//! Normally selections go to the listener. An interactive hook pick suspends the listener
//! until the next notification, which names the new hook target.

use serde::{Deserialize, Serialize};

use crate::ids::ModuleId;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "module", rename_all = "snake_case")]
pub enum RouterState {
    #[default]
    Listening,
    Picking(ModuleId),
    /// The pick completed and its rehook is running.
    Rehooking,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Routed {
    Listener(Vec<String>),
    CompletePick {
        module: ModuleId,
        target: Option<String>,
    },
    Ignored,
}

#[derive(Clone, Debug, Default)]
pub struct SelectionRouter {
    state: RouterState,
}

impl SelectionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RouterState {
        &self.state
    }

    pub fn begin_pick(&mut self, module: ModuleId) {
        self.state = RouterState::Picking(module);
    }

    pub fn notify(&mut self, selection: &[String]) -> Routed {
        match std::mem::replace(&mut self.state, RouterState::Rehooking) {
            RouterState::Listening => {
                self.state = RouterState::Listening;
                Routed::Listener(selection.to_vec())
            }
            RouterState::Picking(module) => Routed::CompletePick {
                module,
                target: selection.last().cloned(),
            },
            RouterState::Rehooking => Routed::Ignored,
        }
    }

    /// Reinstate the listener after a completed pick.
    pub fn finish_pick(&mut self) {
        self.state = RouterState::Listening;
    }

    /// Abandon a pending pick; returns the module that was picking.
    pub fn cancel(&mut self) -> Option<ModuleId> {
        match std::mem::take(&mut self.state) {
            RouterState::Picking(module) => Some(module),
            _ => None,
        }
    }
}
