//! Encapsulation boundaries: named containers owning a module's nodes.
//!
//! A locked boundary refuses structural edits and writes to unpublished attributes. Rig code
//! that has to reach inside brackets the work with [`EncapsulationBoundary::unlocked`], whose
//! guard re-locks on every exit path.

use std::ops::{Deref, DerefMut};

use log::{debug, warn};
use rigkit_api_core::AttrPath;
use rigkit_scene_core::{SceneError, SceneHost};

use crate::error::RigError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncapsulationBoundary {
    name: String,
}

/// A published attribute, addressable as `{container}.{alias}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Published {
    pub container: String,
    pub alias: String,
}

impl Published {
    pub fn path(&self) -> Result<AttrPath, RigError> {
        Ok(AttrPath::attr(&self.container, &self.alias)?)
    }
}

impl EncapsulationBoundary {
    pub fn create(host: &mut dyn SceneHost, name: &str) -> Result<Self, RigError> {
        host.create_container(name)?;
        Ok(Self {
            name: name.to_string(),
        })
    }

    /// Handle for a boundary that already exists.
    pub fn open(host: &dyn SceneHost, name: &str) -> Result<Self, RigError> {
        if !host.container_exists(name) {
            return Err(SceneError::ContainerNotFound(name.to_string()).into());
        }
        Ok(Self {
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_entities(
        &self,
        host: &mut dyn SceneHost,
        entities: &[String],
        include_hidden_branches: bool,
    ) -> Result<(), RigError> {
        host.add_to_container(&self.name, entities, include_hidden_branches)?;
        Ok(())
    }

    pub fn publish(
        &self,
        host: &mut dyn SceneHost,
        target: &AttrPath,
        alias: &str,
    ) -> Result<Published, RigError> {
        host.publish(&self.name, target, alias)?;
        Ok(Published {
            container: self.name.clone(),
            alias: alias.to_string(),
        })
    }

    /// Re-publish an alias of an inner boundary under the same alias.
    pub fn republish(
        &self,
        host: &mut dyn SceneHost,
        inner: &Published,
    ) -> Result<Published, RigError> {
        self.publish(host, &inner.path()?, &inner.alias)
    }

    pub fn unpublish(&self, host: &mut dyn SceneHost, alias: &str) -> Result<(), RigError> {
        host.unpublish(&self.name, alias)?;
        Ok(())
    }

    pub fn lock(&self, host: &mut dyn SceneHost) -> Result<(), RigError> {
        host.set_container_locked(&self.name, true)?;
        Ok(())
    }

    pub fn unlock(&self, host: &mut dyn SceneHost) -> Result<(), RigError> {
        host.set_container_locked(&self.name, false)?;
        Ok(())
    }

    pub fn is_locked(&self, host: &dyn SceneHost) -> bool {
        host.is_container_locked(&self.name)
    }

    pub fn unlocked<'a>(&self, host: &'a mut dyn SceneHost) -> Result<UnlockGuard<'a>, RigError> {
        unlock_all(host, std::slice::from_ref(&self.name))
    }
}

/// Unlock every locked container in `containers` until the guard drops.
///
/// Containers that were already unlocked are left alone on drop.
pub fn unlock_all<'a>(
    host: &'a mut dyn SceneHost,
    containers: &[String],
) -> Result<UnlockGuard<'a>, RigError> {
    let mut guard = UnlockGuard {
        host,
        relock: Vec::new(),
    };
    for container in containers {
        if guard.host.is_container_locked(container) && !guard.relock.contains(container) {
            guard.host.set_container_locked(container, false)?;
            guard.relock.push(container.clone());
        }
    }
    Ok(guard)
}

/// Scoped unlock; dereferences to the scene so work happens through the guard.
pub struct UnlockGuard<'a> {
    host: &'a mut dyn SceneHost,
    relock: Vec<String>,
}

impl UnlockGuard<'_> {
    /// Containers this guard will re-lock.
    pub fn relocks(&self) -> &[String] {
        &self.relock
    }
}

impl<'a> Deref for UnlockGuard<'a> {
    type Target = dyn SceneHost + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.host
    }
}

impl<'a> DerefMut for UnlockGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.host
    }
}

impl Drop for UnlockGuard<'_> {
    fn drop(&mut self) {
        for container in self.relock.drain(..).rev() {
            if !self.host.container_exists(&container) {
                debug!("container {container} vanished while unlocked");
                continue;
            }
            if let Err(err) = self.host.set_container_locked(&container, true) {
                warn!("failed to re-lock {container}: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigkit_scene_core::{NodeKind, Scene, Value};

    fn locked_scene() -> (Scene, EncapsulationBoundary) {
        let mut scene = Scene::default();
        let boundary = EncapsulationBoundary::create(&mut scene, "box").unwrap();
        scene.create_node("inner", NodeKind::Transform, None).unwrap();
        boundary
            .add_entities(&mut scene, &["inner".to_string()], false)
            .unwrap();
        boundary.lock(&mut scene).unwrap();
        (scene, boundary)
    }

    #[test]
    fn guard_relocks_after_work() {
        let (mut scene, boundary) = locked_scene();
        assert!(scene.rename("inner", "renamed").is_err());
        {
            let mut guard = boundary.unlocked(&mut scene).unwrap();
            assert_eq!(guard.relocks(), ["box".to_string()]);
            guard.rename("inner", "renamed").unwrap();
        }
        assert!(boundary.is_locked(&scene));
        assert!(scene.exists("renamed"));
    }

    #[test]
    fn guard_relocks_on_error_paths() {
        let (mut scene, boundary) = locked_scene();
        let attempt = |scene: &mut Scene| -> Result<(), RigError> {
            let mut guard = boundary.unlocked(scene)?;
            guard.create_node("child", NodeKind::Locator, Some("inner"))?;
            guard.create_node("child", NodeKind::Locator, Some("inner"))?;
            Ok(())
        };
        assert!(attempt(&mut scene).is_err());
        assert!(boundary.is_locked(&scene));
        assert!(scene.exists("child"));
    }

    #[test]
    fn guard_leaves_unlocked_boundaries_alone() {
        let mut scene = Scene::default();
        let boundary = EncapsulationBoundary::create(&mut scene, "open").unwrap();
        {
            let guard = boundary.unlocked(&mut scene).unwrap();
            assert!(guard.relocks().is_empty());
        }
        assert!(!boundary.is_locked(&scene));
    }

    #[test]
    fn nested_publication_resolves_through_inner_alias() {
        let mut scene = Scene::default();
        let outer = EncapsulationBoundary::create(&mut scene, "outer").unwrap();
        let inner = EncapsulationBoundary::create(&mut scene, "inner_box").unwrap();
        scene.create_node("ctrl", NodeKind::Transform, None).unwrap();
        inner
            .add_entities(&mut scene, &["ctrl".to_string()], false)
            .unwrap();
        outer
            .add_entities(&mut scene, &["inner_box".to_string()], false)
            .unwrap();
        let published = inner
            .publish(&mut scene, &AttrPath::parse("ctrl.translate").unwrap(), "ctrl_T")
            .unwrap();
        let outer_alias = outer.republish(&mut scene, &published).unwrap();
        assert_eq!(outer_alias.path().unwrap().to_string(), "outer.ctrl_T");
        outer.lock(&mut scene).unwrap();

        scene
            .set_attr(
                &AttrPath::parse("ctrl.translate").unwrap(),
                Value::vec3(1.0, 2.0, 3.0),
            )
            .unwrap();
        assert!(scene
            .set_attr(&AttrPath::parse("ctrl.rotate").unwrap(), Value::vec3(1.0, 0.0, 0.0))
            .is_err());
    }

    #[test]
    fn open_requires_existing_container() {
        let scene = Scene::default();
        assert!(matches!(
            EncapsulationBoundary::open(&scene, "missing"),
            Err(RigError::Scene(SceneError::ContainerNotFound(_)))
        ));
    }
}
