//! Pre-authored control templates.
//!
//! A template is a small JSON document describing a handful of nodes and, optionally, the
//! container that owns them. Importing a template prefixes every name so several copies can
//! coexist (`{joint}_translation_control`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glam::DVec3;
use indexmap::IndexMap;
use log::{debug, warn};
use rigkit_api_core::{AttrPath, Value};
use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::node::{AttrUnit, NodeKind};
use crate::scene::Scene;

const BUILTIN: [(&str, &str); 5] = [
    (
        "translation_control",
        include_str!("../templates/translation_control.json"),
    ),
    (
        "orientation_control",
        include_str!("../templates/orientation_control.json"),
    ),
    (
        "hierarchy_representation",
        include_str!("../templates/hierarchy_representation.json"),
    ),
    (
        "controlGroup_control",
        include_str!("../templates/controlGroup_control.json"),
    ),
    ("group_control", include_str!("../templates/group_control.json")),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateNodeKind {
    Transform,
    Locator,
    Joint,
}

impl From<TemplateNodeKind> for NodeKind {
    fn from(kind: TemplateNodeKind) -> Self {
        match kind {
            TemplateNodeKind::Transform => NodeKind::Transform,
            TemplateNodeKind::Locator => NodeKind::Locator,
            TemplateNodeKind::Joint => NodeKind::Joint,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateAttr {
    pub name: String,
    pub value: Value,
    #[serde(default)]
    pub unit: AttrUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateNode {
    pub name: String,
    pub kind: TemplateNodeKind,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub translate: Option<[f64; 3]>,
    #[serde(default)]
    pub attributes: Vec<TemplateAttr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    #[serde(default)]
    pub container: Option<String>,
    pub nodes: Vec<TemplateNode>,
}

/// Names created by one template import.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportedTemplate {
    /// Library id the nodes were imported from.
    pub template: String,
    pub container: Option<String>,
    /// Full node names in template order; the first is the template's root.
    pub nodes: Vec<String>,
}

impl ImportedTemplate {
    pub fn root(&self) -> Option<&str> {
        self.nodes.first().map(String::as_str)
    }

    pub fn require_root(&self) -> Result<&str, SceneError> {
        self.root().ok_or_else(|| self.incomplete("nodes"))
    }

    pub fn require_container(&self) -> Result<&str, SceneError> {
        self.container
            .as_deref()
            .ok_or_else(|| self.incomplete("container"))
    }

    fn incomplete(&self, missing: &'static str) -> SceneError {
        SceneError::TemplateIncomplete {
            template: self.template.clone(),
            missing,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: IndexMap<String, Template>,
}

impl TemplateLibrary {
    /// The control templates shipped with the crate.
    pub fn builtin() -> Self {
        let mut library = Self::default();
        for (id, raw) in BUILTIN {
            match serde_json::from_str::<Template>(raw) {
                Ok(template) => library.insert(id, template),
                Err(err) => warn!("built-in template {id} failed to parse: {err}"),
            }
        }
        library
    }

    /// Built-ins overlaid with every `*.json` file in `dir`, keyed by file stem.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut library = Self::builtin();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("failed to read template directory {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read template {}", path.display()))?;
            let template: Template = serde_json::from_str(&text)
                .with_context(|| format!("failed to parse template {}", path.display()))?;
            library.insert(&id, template);
        }
        Ok(library)
    }

    pub fn insert(&mut self, id: &str, template: Template) {
        self.templates.insert(id.to_string(), template);
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}

impl Scene {
    pub(crate) fn import_template_impl(
        &mut self,
        id: &str,
        prefix: &str,
    ) -> Result<ImportedTemplate, SceneError> {
        let template = self
            .templates
            .get(id)
            .cloned()
            .ok_or_else(|| SceneError::TemplateNotFound(id.to_string()))?;
        let container = template.container.as_ref().map(|c| format!("{prefix}{c}"));
        for name in template
            .nodes
            .iter()
            .map(|n| format!("{prefix}{}", n.name))
            .chain(container.clone())
        {
            self.check_new_name(&name)?;
        }

        let mut imported = ImportedTemplate {
            template: id.to_string(),
            container: container.clone(),
            nodes: Vec::with_capacity(template.nodes.len()),
        };
        for node in &template.nodes {
            let name = format!("{prefix}{}", node.name);
            let parent = node.parent.as_ref().map(|p| format!("{prefix}{p}"));
            self.create_node_impl(&name, node.kind.into(), parent.as_deref())?;
            if let Some(t) = node.translate {
                self.node_mut(&name)?.translate = DVec3::from_array(t);
            }
            for attr in &node.attributes {
                self.add_attr_impl(
                    &AttrPath::attr(&name, &attr.name)?,
                    attr.value.clone(),
                    attr.unit,
                )?;
            }
            imported.nodes.push(name);
        }
        if let Some(container) = &container {
            self.create_container_impl(container)?;
            self.add_to_container_impl(container, &imported.nodes, false)?;
        }
        debug!("imported template {id} as {prefix}*");
        Ok(imported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_parse() {
        let library = TemplateLibrary::builtin();
        let ids: Vec<&str> = library.ids().collect();
        assert_eq!(ids.len(), BUILTIN.len());
        assert!(library.get("translation_control").is_some());
    }

    #[test]
    fn import_prefixes_nodes_and_container() {
        let mut scene = Scene::default();
        scene.add_namespace_impl("m").unwrap();
        let imported = scene
            .import_template_impl("translation_control", "m:root_joint_")
            .unwrap();
        assert_eq!(imported.root(), Some("m:root_joint_translation_control"));
        assert_eq!(
            imported.container.as_deref(),
            Some("m:root_joint_translation_control_container")
        );
        assert_eq!(
            scene.owner_of("m:root_joint_translation_control_shape"),
            Some("m:root_joint_translation_control_container")
        );
    }

    #[test]
    fn incomplete_imports_name_the_missing_part() {
        let mut scene = Scene::default();
        scene.templates.insert(
            "bare",
            Template {
                name: "bare".to_string(),
                container: None,
                nodes: Vec::new(),
            },
        );
        let imported = scene.import_template_impl("bare", "x_").unwrap();
        assert_eq!(
            imported.require_root().unwrap_err(),
            SceneError::TemplateIncomplete {
                template: "bare".to_string(),
                missing: "nodes",
            }
        );
        assert!(matches!(
            imported.require_container(),
            Err(SceneError::TemplateIncomplete { missing: "container", .. })
        ));

        let imported = scene.import_template_impl("group_control", "g_").unwrap();
        assert_eq!(imported.require_root().unwrap(), "g_group_control");
    }

    #[test]
    fn import_refuses_clashing_names() {
        let mut scene = Scene::default();
        scene.import_template_impl("group_control", "a_").unwrap();
        let err = scene.import_template_impl("group_control", "a_").unwrap_err();
        assert_eq!(err, SceneError::NameTaken("a_group_control".to_string()));
        assert!(matches!(
            scene.import_template_impl("missing", ""),
            Err(SceneError::TemplateNotFound(_))
        ));
    }
}
