//! [`Rigger`]: the surface a UI drives. It owns the scene host, the catalog and the lifecycle
//! state of every installed module.

use indexmap::IndexMap;
use log::{info, warn};
use rigkit_scene_core::{Scene, SceneHost, TemplateLibrary};
use serde::{Deserialize, Serialize};

use crate::blueprint::ModuleBlueprint;
use crate::boundary::EncapsulationBoundary;
use crate::catalog::ModuleCatalog;
use crate::config::RigConfig;
use crate::error::RigError;
use crate::grouping::{self, AnchorMode};
use crate::hook::{self, HookOutcome};
use crate::ids::ModuleId;
use crate::layout::ModuleLayout;
use crate::lock::{self, LockReport, LockState};
use crate::module::{self, InstalledModule};
use crate::namespace::NamespaceRegistry;
use crate::selection::{Routed, SelectionRouter};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub type_id: String,
    pub state: LockState,
}

pub struct Rigger<H: SceneHost = Scene> {
    host: H,
    catalog: ModuleCatalog,
    config: RigConfig,
    registry: NamespaceRegistry,
    modules: IndexMap<ModuleId, ModuleRecord>,
    router: SelectionRouter,
    current_module: Option<ModuleId>,
}

impl Rigger<Scene> {
    /// A rigger over a fresh in-memory scene, loading `config.templates` when set.
    pub fn new(catalog: ModuleCatalog, config: RigConfig) -> anyhow::Result<Self> {
        let mut scene = Scene::new(config.scene.clone());
        if let Some(dir) = &config.templates {
            scene = scene.with_templates(TemplateLibrary::load_dir(dir)?);
        }
        Ok(Self::with_host(scene, catalog, config))
    }
}

impl<H: SceneHost> Rigger<H> {
    pub fn with_host(host: H, catalog: ModuleCatalog, config: RigConfig) -> Self {
        Self {
            host,
            catalog,
            config,
            registry: NamespaceRegistry::new(),
            modules: IndexMap::new(),
            router: SelectionRouter::new(),
            current_module: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    /// Installed modules in install order.
    pub fn modules(&self) -> impl Iterator<Item = (&ModuleId, &ModuleRecord)> {
        self.modules.iter()
    }

    pub fn state(&self, module: &ModuleId) -> Option<LockState> {
        self.modules.get(module).map(|r| r.state)
    }

    fn record(&self, module: &ModuleId) -> Result<&ModuleRecord, RigError> {
        self.modules
            .get(module)
            .ok_or_else(|| RigError::ModuleNotFound(module.to_string()))
    }

    fn require_blueprint(&self, module: &ModuleId) -> Result<(), RigError> {
        match self.record(module)?.state {
            LockState::Blueprint => Ok(()),
            _ => Err(RigError::ModuleLocked(module.to_string())),
        }
    }

    /// Install a module; without a name the next `{default_name_base}{n}` is used.
    pub fn install(
        &mut self,
        type_id: &str,
        name: Option<&str>,
        hook_target: Option<&str>,
    ) -> Result<InstalledModule, RigError> {
        let blueprint = self.catalog.lookup(type_id)?;
        let name = match name {
            Some(name) => name.to_string(),
            None => self
                .registry
                .next_default_name(&self.config.default_name_base),
        };
        let installed = module::install(
            &mut self.host,
            &mut self.registry,
            blueprint,
            type_id,
            &name,
            hook_target,
            &self.config,
        )?;
        self.modules.insert(
            installed.module.clone(),
            ModuleRecord {
                type_id: type_id.to_string(),
                state: LockState::Blueprint,
            },
        );
        Ok(installed)
    }

    /// Lock `batch`, or every blueprint module when `None`.
    pub fn lock(&mut self, batch: Option<&[ModuleId]>) -> Result<LockReport, RigError> {
        let batch: Vec<ModuleId> = match batch {
            Some(batch) => batch.to_vec(),
            None => self
                .modules
                .iter()
                .filter(|(_, r)| r.state == LockState::Blueprint)
                .map(|(m, _)| m.clone())
                .collect(),
        };
        let mut entries: Vec<(ModuleId, &dyn ModuleBlueprint)> = Vec::with_capacity(batch.len());
        for module in &batch {
            let record = self
                .modules
                .get(module)
                .ok_or_else(|| RigError::ModuleNotFound(module.to_string()))?;
            entries.push((module.clone(), self.catalog.lookup(&record.type_id)?));
        }
        let states: IndexMap<ModuleId, LockState> = self
            .modules
            .iter()
            .map(|(m, r)| (m.clone(), r.state))
            .collect();
        let modules = &mut self.modules;
        let report = lock::lock_batch(
            &mut self.host,
            &entries,
            &states,
            &self.config,
            |module, state| {
                if let Some(record) = modules.get_mut(module) {
                    record.state = state;
                }
            },
        )?;
        grouping::prune_empty_groups(&mut self.host)?;
        Ok(report)
    }

    pub fn rehook(
        &mut self,
        module: &ModuleId,
        target: Option<&str>,
    ) -> Result<HookOutcome, RigError> {
        self.require_blueprint(module)?;
        hook::rehook(&mut self.host, &ModuleLayout::new(module), target)
    }

    pub fn group(
        &mut self,
        selection: &[String],
        mode: AnchorMode,
        name: &str,
    ) -> Result<String, RigError> {
        grouping::group_selection(&mut self.host, selection, mode, name)
    }

    pub fn ungroup(&mut self, groups: &[String]) -> Result<(), RigError> {
        grouping::ungroup(&mut self.host, groups)
    }

    /// Give a blueprint module a new name; returns its new id.
    pub fn rename(&mut self, module: &ModuleId, new_name: &str) -> Result<ModuleId, RigError> {
        self.require_blueprint(module)?;
        let old = EncapsulationBoundary::open(&self.host, &ModuleLayout::new(module).container())?;
        let was_locked = old.is_locked(&self.host);
        old.unlock(&mut self.host)?;
        let renamed = match self.registry.rename(&mut self.host, module, new_name) {
            Ok(renamed) => renamed,
            Err(err) => {
                if was_locked {
                    old.lock(&mut self.host)?;
                }
                return Err(err);
            }
        };
        if was_locked {
            EncapsulationBoundary::open(&self.host, &ModuleLayout::new(&renamed).container())?
                .lock(&mut self.host)?;
        }
        self.modules = self
            .modules
            .drain(..)
            .map(|(id, record)| {
                if id == *module {
                    (renamed.clone(), record)
                } else {
                    (id, record)
                }
            })
            .collect();
        if self.current_module.as_ref() == Some(module) {
            self.current_module = Some(renamed.clone());
        }
        Ok(renamed)
    }

    /// Remove a module and everything in its namespace.
    ///
    /// Blueprint modules hooked to it fall back to their default hook first.
    pub fn delete(&mut self, module: &ModuleId) -> Result<(), RigError> {
        self.record(module)?;
        let dependents: Vec<ModuleId> = self
            .modules
            .iter()
            .filter(|(m, r)| *m != module && r.state == LockState::Blueprint)
            .map(|(m, _)| m.clone())
            .filter(|m| {
                hook::current_target(&self.host, &ModuleLayout::new(m))
                    .and_then(|t| ModuleId::of_node(&t))
                    .as_ref()
                    == Some(module)
            })
            .collect();
        for dependent in &dependents {
            hook::rehook(&mut self.host, &ModuleLayout::new(dependent), None)?;
        }
        let container = ModuleLayout::new(module).container();
        if self.host.container_exists(&container) {
            self.host.set_container_locked(&container, false)?;
        }
        self.registry.release(&mut self.host, module)?;
        self.modules.shift_remove(module);
        if self.current_module.as_ref() == Some(module) {
            self.current_module = None;
        }
        grouping::prune_empty_groups(&mut self.host)?;
        info!("deleted {module}");
        Ok(())
    }

    /// The installed module owning `node`.
    pub fn module_of(&self, node: &str) -> Option<ModuleId> {
        ModuleId::of_node(node).filter(|m| self.modules.contains_key(m))
    }

    pub fn find_sub_modules(&self, group: &str) -> Result<Vec<ModuleId>, RigError> {
        grouping::find_sub_modules(&self.host, group)
    }

    /// Module of the most recently selected node.
    pub fn current_module(&self) -> Option<&ModuleId> {
        self.current_module.as_ref()
    }

    /// Route the next selection notification to a hook pick for `module`.
    pub fn begin_hook_pick(&mut self, module: &ModuleId) -> Result<(), RigError> {
        self.require_blueprint(module)?;
        self.router.begin_pick(module.clone());
        Ok(())
    }

    pub fn cancel_hook_pick(&mut self) -> Option<ModuleId> {
        self.router.cancel()
    }

    /// Host selection notification. Returns the rehook outcome when it completed a pick.
    pub fn on_selection_changed(
        &mut self,
        selection: &[String],
    ) -> Option<Result<HookOutcome, RigError>> {
        match self.router.notify(selection) {
            Routed::Listener(selection) => {
                self.current_module = selection.last().and_then(|n| self.module_of(n));
                None
            }
            Routed::CompletePick { module, target } => {
                let outcome = match target {
                    Some(target) => self.rehook(&module, Some(&target)),
                    None => {
                        warn!("hook pick for {module} ended with an empty selection");
                        Ok(HookOutcome::Unchanged)
                    }
                };
                self.router.finish_pick();
                Some(outcome)
            }
            Routed::Ignored => None,
        }
    }
}
