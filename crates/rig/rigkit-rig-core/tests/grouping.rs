use glam::DVec3;
use rigkit_rig_core::{AnchorMode, ModuleCatalog, ModuleId, RigConfig, RigError, Rigger};
use rigkit_scene_core::SceneHost;

fn two_modules() -> Rigger {
    let mut rig = Rigger::new(ModuleCatalog::builtin(), RigConfig::default()).unwrap();
    rig.install("SingleJoint", Some("a"), None).unwrap();
    rig.install("SingleJointSegment", Some("b"), None).unwrap();
    rig.host_mut()
        .set_world_position("SingleJointSegment__b:module_transform", DVec3::new(0.0, 6.0, 0.0))
        .unwrap();
    rig.host_mut().evaluate().unwrap();
    rig
}

fn transforms() -> Vec<String> {
    vec![
        "SingleJoint__a:module_transform".to_string(),
        "SingleJointSegment__b:module_transform".to_string(),
    ]
}

#[test]
fn grouping_locked_modules_relocks_their_boundaries() {
    let mut rig = two_modules();
    let group = rig.group(&transforms(), AnchorMode::LastSelected, "torso").unwrap();
    assert_eq!(group, "Group__torso");
    let scene = rig.host();
    assert!((scene.world_position(&group).unwrap() - DVec3::new(0.0, 6.0, 0.0)).length() < 1e-9);
    assert_eq!(scene.parent_of("SingleJoint__a:module_transform").as_deref(), Some("Group__torso"));
    assert!(
        (scene.world_position("SingleJointSegment__b:module_transform").unwrap()
            - DVec3::new(0.0, 6.0, 0.0))
        .length()
            < 1e-9
    );
    assert!(scene.is_container_locked("SingleJoint__a:module_container"));
    assert!(scene.is_container_locked("SingleJointSegment__b:module_container"));

    let mut modules = rig.find_sub_modules(&group).unwrap();
    modules.sort();
    assert_eq!(
        modules,
        [ModuleId::new("SingleJoint", "a"), ModuleId::new("SingleJointSegment", "b")]
    );
}

#[test]
fn moving_a_group_carries_its_modules() {
    let mut rig = two_modules();
    let group = rig.group(&transforms(), AnchorMode::AveragePosition, "torso").unwrap();
    rig.host_mut()
        .set_world_position(&group, DVec3::new(10.0, 3.0, 0.0))
        .unwrap();
    rig.host_mut().evaluate().unwrap();
    let joint = rig.host().world_position("SingleJoint__a:joint").unwrap();
    assert!((joint - DVec3::new(10.0, 0.0, 0.0)).length() < 1e-6);
}

#[test]
fn ungroup_restores_world_parenting() {
    let mut rig = two_modules();
    rig.group(&transforms(), AnchorMode::LastSelected, "torso").unwrap();
    rig.ungroup(&["Group__torso".to_string()]).unwrap();
    let scene = rig.host();
    assert!(!scene.exists("Group__torso"));
    assert_eq!(scene.parent_of("SingleJoint__a:module_transform"), None);
    assert!(!scene.container_exists("Group_container"));
    assert!(scene.is_container_locked("SingleJoint__a:module_container"));
    assert_eq!(
        rig.ungroup(&["Group__torso".to_string()]).unwrap_err(),
        RigError::GroupNotFound("Group__torso".to_string())
    );
}

#[test]
fn deleting_last_member_removes_group() {
    let mut rig = two_modules();
    rig.group(
        &["SingleJoint__a:module_transform".to_string()],
        AnchorMode::LastSelected,
        "solo",
    )
    .unwrap();
    rig.delete(&ModuleId::new("SingleJoint", "a")).unwrap();
    assert!(!rig.host().exists("Group__solo"));
}

#[test]
fn locking_removes_groups_left_without_module_transforms() {
    let mut rig = two_modules();
    rig.group(&transforms(), AnchorMode::LastSelected, "torso").unwrap();
    rig.lock(None).unwrap();
    assert!(!rig.host().exists("Group__torso"));
}
