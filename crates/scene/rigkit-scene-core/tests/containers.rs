use rigkit_scene_core::{
    AttrPath, AttrUnit, NodeKind, NodeType, Scene, SceneError, SceneHost, Value,
};

fn path(s: &str) -> AttrPath {
    AttrPath::parse(s).unwrap()
}

fn module_scene() -> Scene {
    let mut scene = Scene::default();
    scene.add_namespace("m").unwrap();
    scene.create_container("m:module_container").unwrap();
    scene.create_node("m:grp", NodeKind::Transform, None).unwrap();
    scene.create_node("m:joint", NodeKind::Joint, Some("m:grp")).unwrap();
    scene
        .add_to_container("m:module_container", &["m:grp".to_string()], true)
        .unwrap();
    scene
}

#[test]
fn hidden_branches_join_the_container() {
    let scene = module_scene();
    assert_eq!(
        scene.container_members("m:module_container"),
        vec!["m:grp".to_string(), "m:joint".to_string()]
    );
    assert_eq!(scene.container_of("m:joint").as_deref(), Some("m:module_container"));
}

#[test]
fn locked_container_only_accepts_published_writes() {
    let mut scene = module_scene();
    scene
        .publish("m:module_container", &path("m:joint.translate"), "joint_T")
        .unwrap();
    scene.set_container_locked("m:module_container", true).unwrap();

    scene.set_attr(&path("m:joint.translateX"), Value::Float(2.0)).unwrap();
    assert!(matches!(
        scene.set_attr(&path("m:joint.rotateZ"), Value::Float(10.0)),
        Err(SceneError::Unpublished { .. })
    ));
    assert!(matches!(
        scene.create_node("m:extra", NodeKind::Locator, Some("m:joint")),
        Err(SceneError::ContainerLocked { .. })
    ));
    assert!(matches!(
        scene.rename("m:joint", "m:renamed"),
        Err(SceneError::ContainerLocked { .. })
    ));
    assert!(matches!(scene.delete("m:grp"), Err(SceneError::ContainerLocked { .. })));

    scene.set_container_locked("m:module_container", false).unwrap();
    scene.set_attr(&path("m:joint.rotateZ"), Value::Float(10.0)).unwrap();
}

#[test]
fn nested_aliases_resolve_transitively() {
    let mut scene = module_scene();
    scene.create_container("m:inner").unwrap();
    scene.create_node("m:ctrl", NodeKind::Transform, None).unwrap();
    scene.add_to_container("m:inner", &["m:ctrl".to_string()], false).unwrap();
    scene.publish("m:inner", &path("m:ctrl.translate"), "ctrl_T").unwrap();
    scene
        .add_to_container("m:module_container", &["m:inner".to_string()], false)
        .unwrap();
    scene
        .publish("m:module_container", &path("m:inner.ctrl_T"), "ctrl_T")
        .unwrap();

    assert_eq!(
        scene.resolve_published("m:module_container", "ctrl_T").unwrap(),
        path("m:ctrl.translate")
    );
    scene.set_container_locked("m:module_container", true).unwrap();
    scene.set_attr(&path("m:ctrl.translateY"), Value::Float(1.5)).unwrap();
    assert!(scene.set_attr(&path("m:ctrl.scaleY"), Value::Float(2.0)).is_err());
}

#[test]
fn node_aliases_count_as_published_attribute() {
    let mut scene = module_scene();
    scene.alias_attr("m:grp", "globalScale", "scaleY").unwrap();
    scene
        .publish("m:module_container", &path("m:grp.globalScale"), "grp_globalScale")
        .unwrap();
    scene.set_container_locked("m:module_container", true).unwrap();
    scene.set_attr(&path("m:grp.scaleY"), Value::Float(3.0)).unwrap();
    assert_eq!(scene.get_attr(&path("m:grp.globalScale")).unwrap(), Value::Float(3.0));
}

#[test]
fn attached_unit_conversions_follow_their_node() {
    let mut scene = module_scene();
    scene
        .add_attr(&path("m:joint.twist"), Value::Float(0.0), AttrUnit::Angular)
        .unwrap();
    scene.create_utility("m:mul", NodeType::Multiply).unwrap();
    scene.connect_attr(&path("m:joint.twist"), &path("m:mul.in_0")).unwrap();
    assert!(scene.exists("m:unitConversion1"));
    scene
        .add_to_container("m:module_container", &["m:mul".to_string()], false)
        .unwrap();
    assert_eq!(
        scene.container_of("m:unitConversion1").as_deref(),
        Some("m:module_container")
    );
}

#[test]
fn deleting_a_container_deletes_its_members() {
    let mut scene = module_scene();
    scene.create_node("m:outside", NodeKind::Locator, None).unwrap();
    scene.delete_container("m:module_container").unwrap();
    assert!(!scene.exists("m:grp"));
    assert!(!scene.exists("m:joint"));
    assert!(!scene.container_exists("m:module_container"));
    assert!(scene.exists("m:outside"));
}

#[test]
fn renaming_a_namespace_rewrites_references() {
    let mut scene = module_scene();
    scene
        .publish("m:module_container", &path("m:joint.translate"), "joint_T")
        .unwrap();
    scene.rename_namespace("m", "n").unwrap();
    assert!(scene.exists("n:joint"));
    assert_eq!(scene.parent_of("n:joint").as_deref(), Some("n:grp"));
    assert_eq!(
        scene.resolve_published("n:module_container", "joint_T").unwrap(),
        path("n:joint.translate")
    );
    assert!(!scene.namespace_exists("m"));
}

#[test]
fn removing_a_namespace_refuses_locked_containers() {
    let mut scene = module_scene();
    scene.set_container_locked("m:module_container", true).unwrap();
    assert!(scene.remove_namespace("m").is_err());
    scene.set_container_locked("m:module_container", false).unwrap();
    scene.remove_namespace("m").unwrap();
    assert!(scene.list_nodes(Some("m")).is_empty());
}
