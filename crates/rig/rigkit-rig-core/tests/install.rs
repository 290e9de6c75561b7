use glam::{DQuat, DVec3};
use rigkit_rig_core::{
    HookOutcome, LockState, ModuleCatalog, ModuleId, RigConfig, RigError, Rigger,
};
use rigkit_scene_core::{AttrPath, SceneHost, Value};

fn rigger() -> Rigger {
    Rigger::new(ModuleCatalog::builtin(), RigConfig::default()).expect("rigger")
}

fn path(s: &str) -> AttrPath {
    AttrPath::parse(s).unwrap()
}

fn close(a: DVec3, b: DVec3) -> bool {
    (a - b).length() < 1e-6
}

#[test]
fn segment_install_builds_joints_controls_and_boundary() {
    let mut rig = rigger();
    let installed = rig.install("SingleJointSegment", Some("M"), None).unwrap();
    assert_eq!(installed.module.as_str(), "SingleJointSegment__M");
    assert_eq!(installed.hook_target, None);
    let scene = rig.host();

    let root = "SingleJointSegment__M:root_joint";
    let end = "SingleJointSegment__M:end_joint";
    assert_eq!(scene.parent_of(end).as_deref(), Some(root));
    assert_eq!(
        scene.parent_of(root).as_deref(),
        Some("SingleJointSegment__M:joints_grp")
    );
    assert!(close(scene.world_position(root).unwrap(), DVec3::ZERO));
    assert!(close(scene.world_position(end).unwrap(), DVec3::new(4.0, 0.0, 0.0)));
    assert!(scene.world_rotation(root).unwrap().angle_between(DQuat::IDENTITY) < 1e-9);

    for control in &installed.controls {
        let node = control.node();
        assert!(scene.exists(&node), "{node} missing");
        assert!(close(
            scene.world_position(&node).unwrap(),
            scene.world_position(&control.joint.node()).unwrap()
        ));
    }
    assert!(scene.exists("SingleJointSegment__M:root_joint_orientation_control"));

    let container = "SingleJointSegment__M:module_container";
    assert!(scene.is_container_locked(container));
    assert_eq!(scene.container_of(root).as_deref(), Some(container));
    let aliases: Vec<String> = scene
        .published(container)
        .into_iter()
        .map(|(alias, _)| alias)
        .collect();
    for expected in [
        "root_joint_R",
        "root_joint_rotateOrder",
        "end_joint_R",
        "moduleTransform_T",
        "moduleTransform_R",
        "moduleTransform_globalScale",
        "root_joint_T",
        "end_joint_T",
        "root_joint_orientation",
    ] {
        assert!(aliases.iter().any(|a| a == expected), "{expected} not published");
    }
}

#[test]
fn locked_boundary_rejects_unpublished_writes() {
    let mut rig = rigger();
    rig.install("SingleJointSegment", Some("M"), None).unwrap();
    let scene = rig.host_mut();
    assert!(scene
        .set_attr(&path("SingleJointSegment__M:root_joint.translateX"), Value::Float(1.0))
        .is_err());
    scene
        .set_attr(
            &path("SingleJointSegment__M:end_joint_translation_control.translateY"),
            Value::Float(1.0),
        )
        .unwrap();
}

#[test]
fn hinge_segments_share_one_pole() {
    let mut rig = rigger();
    rig.install("HingeJoint", Some("leg"), None).unwrap();
    let scene = rig.host();
    assert!(scene.exists("HingeJoint__leg:root_joint_translation_control_poleVectorLocator"));
    assert!(!scene.exists("HingeJoint__leg:hinge_joint_translation_control_poleVectorLocator"));
    assert!(scene.exists("HingeJoint__leg:root_joint_ikHandle"));
    assert!(scene.exists("HingeJoint__leg:hinge_joint_ikHandle"));
}

#[test]
fn hinge_install_keeps_every_joint_and_control_in_place() {
    let mut rig = rigger();
    rig.install("HingeJoint", Some("leg"), None).unwrap();
    let expected = [
        ("root_joint", DVec3::ZERO),
        ("hinge_joint", DVec3::new(4.0, 0.0, -1.0)),
        ("end_joint", DVec3::new(8.0, 0.0, 0.0)),
    ];
    for (joint, position) in expected {
        let node = format!("HingeJoint__leg:{joint}");
        let control = format!("{node}_translation_control");
        assert!(close(rig.host().world_position(&node).unwrap(), position), "{node}");
        assert!(close(rig.host().world_position(&control).unwrap(), position), "{control}");
    }

    rig.host_mut().evaluate().unwrap();
    for (joint, position) in expected {
        let node = format!("HingeJoint__leg:{joint}");
        assert!(close(rig.host().world_position(&node).unwrap(), position), "{node} after evaluate");
    }
}

#[test]
fn duplicate_name_conflicts_and_leaves_first_module_alone() {
    let mut rig = rigger();
    rig.install("SingleJointSegment", Some("arm"), None).unwrap();
    let before = rig.host().list_nodes(Some("SingleJointSegment__arm")).len();
    // names are unique across module types
    assert_eq!(
        rig.install("HingeJoint", Some("arm"), None).unwrap_err(),
        RigError::NameConflict("arm".to_string())
    );
    assert_eq!(
        rig.install("SingleJointSegment", Some("arm"), None).unwrap_err(),
        RigError::NameConflict("arm".to_string())
    );
    assert_eq!(rig.host().list_nodes(Some("SingleJointSegment__arm")).len(), before);
    assert!(!rig.host().namespace_exists("HingeJoint__arm"));
    assert_eq!(rig.modules().count(), 1);
}

#[test]
fn unknown_types_and_bad_names_are_rejected() {
    let mut rig = rigger();
    assert_eq!(
        rig.install("Tentacle", Some("t"), None).unwrap_err(),
        RigError::ModuleTypeNotFound("Tentacle".to_string())
    );
    assert!(matches!(
        rig.install("SingleJoint", Some("a__b"), None),
        Err(RigError::InvalidName { .. })
    ));
    assert!(rig.host().namespaces().is_empty());
}

#[test]
fn unnamed_installs_get_numbered_names() {
    let mut rig = rigger();
    let first = rig.install("SingleJoint", None, None).unwrap();
    let second = rig.install("SingleJoint", None, None).unwrap();
    assert_eq!(first.module.name(), "instance_1");
    assert_eq!(second.module.name(), "instance_2");
}

#[test]
fn invalid_install_hook_target_downgrades_to_default() {
    let mut rig = rigger();
    let installed = rig
        .install("SingleJoint", Some("a"), Some("SingleJoint__nope:joint_translation_control"))
        .unwrap();
    assert_eq!(installed.hook_target, None);
    assert_eq!(rig.state(&installed.module), Some(LockState::Blueprint));
}

#[test]
fn rehook_rejects_self_and_cycles_keeping_previous_hook() {
    let mut rig = rigger();
    let a = rig.install("SingleJointSegment", Some("a"), None).unwrap().module;
    let b = rig.install("SingleJoint", Some("b"), None).unwrap().module;
    let b_control = "SingleJoint__b:joint_translation_control";
    assert_eq!(
        rig.rehook(&a, Some(b_control)).unwrap(),
        HookOutcome::Rehooked {
            target: Some(b_control.to_string())
        }
    );
    assert_eq!(rig.rehook(&a, Some(b_control)).unwrap(), HookOutcome::Unchanged);

    let own = rig
        .rehook(&a, Some("SingleJointSegment__a:end_joint_translation_control"))
        .unwrap();
    assert!(matches!(own, HookOutcome::Rejected { .. }));
    let cycle = rig
        .rehook(&b, Some("SingleJointSegment__a:root_joint_translation_control"))
        .unwrap();
    assert!(matches!(cycle, HookOutcome::Rejected { .. }));

    let layout = rigkit_rig_core::ModuleLayout::new(&a);
    assert_eq!(
        rigkit_rig_core::hook::current_target(rig.host(), &layout).as_deref(),
        Some(b_control)
    );
    assert_eq!(
        rig.rehook(&a, None).unwrap(),
        HookOutcome::Rehooked { target: None }
    );
}

#[test]
fn rename_moves_namespace_and_keeps_hooks() {
    let mut rig = rigger();
    let a = rig.install("SingleJoint", Some("a"), None).unwrap().module;
    let b = rig
        .install("SingleJoint", Some("b"), Some("SingleJoint__a:joint_translation_control"))
        .unwrap()
        .module;
    let renamed = rig.rename(&a, "pelvis").unwrap();
    assert_eq!(renamed, ModuleId::new("SingleJoint", "pelvis"));
    assert!(!rig.host().namespace_exists("SingleJoint__a"));
    assert!(rig.host().is_container_locked("SingleJoint__pelvis:module_container"));
    assert_eq!(rig.state(&renamed), Some(LockState::Blueprint));
    assert_eq!(rig.state(&a), None);
    assert_eq!(
        rigkit_rig_core::hook::current_target(rig.host(), &rigkit_rig_core::ModuleLayout::new(&b))
            .as_deref(),
        Some("SingleJoint__pelvis:joint_translation_control")
    );

    assert_eq!(
        rig.rename(&b, "pelvis").unwrap_err(),
        RigError::NameConflict("pelvis".to_string())
    );
    assert!(rig.host().is_container_locked("SingleJoint__b:module_container"));
    rig.install("SingleJoint", Some("a"), None).unwrap();
}

#[test]
fn delete_releases_namespace_and_unhooks_dependents() {
    let mut rig = rigger();
    let a = rig.install("SingleJoint", Some("a"), None).unwrap().module;
    let b = rig
        .install("SingleJoint", Some("b"), Some("SingleJoint__a:joint_translation_control"))
        .unwrap()
        .module;
    rig.delete(&a).unwrap();
    assert!(!rig.host().namespace_exists("SingleJoint__a"));
    assert!(rig.host().list_nodes(Some("SingleJoint__a")).is_empty());
    assert_eq!(
        rigkit_rig_core::hook::current_target(rig.host(), &rigkit_rig_core::ModuleLayout::new(&b)),
        None
    );
    assert_eq!(
        rig.delete(&a).unwrap_err(),
        RigError::ModuleNotFound("SingleJoint__a".to_string())
    );
    rig.install("SingleJoint", Some("a"), None).unwrap();
}

#[test]
fn dragging_end_control_stretches_segment() {
    let mut rig = rigger();
    rig.install("SingleJointSegment", Some("M"), None).unwrap();
    let scene = rig.host_mut();
    scene
        .set_world_position(
            "SingleJointSegment__M:end_joint_translation_control",
            DVec3::new(8.0, 0.0, 0.0),
        )
        .unwrap();
    assert!(scene.evaluate().unwrap().settled);
    let Value::Float(tx) = scene
        .get_attr(&path("SingleJointSegment__M:end_joint.translateX"))
        .unwrap()
    else {
        panic!("translateX should be a float");
    };
    assert!((tx - 8.0).abs() < 1e-6);
}
