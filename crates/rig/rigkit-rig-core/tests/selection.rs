use rigkit_rig_core::{HookOutcome, ModuleCatalog, ModuleId, RigConfig, Rigger};

fn rig_with_two_joints() -> Rigger {
    let mut rig = Rigger::new(ModuleCatalog::builtin(), RigConfig::default()).unwrap();
    rig.install("SingleJoint", Some("a"), None).unwrap();
    rig.install("SingleJoint", Some("b"), None).unwrap();
    rig
}

#[test]
fn selections_update_current_module() {
    let mut rig = rig_with_two_joints();
    assert!(rig
        .on_selection_changed(&["SingleJoint__b:joint_translation_control".to_string()])
        .is_none());
    assert_eq!(rig.current_module(), Some(&ModuleId::new("SingleJoint", "b")));
    rig.on_selection_changed(&["persp".to_string()]);
    assert_eq!(rig.current_module(), None);
}

#[test]
fn hook_pick_rehooks_to_last_selected_control() {
    let mut rig = rig_with_two_joints();
    let a = ModuleId::new("SingleJoint", "a");
    rig.begin_hook_pick(&a).unwrap();
    let outcome = rig
        .on_selection_changed(&[
            "persp".to_string(),
            "SingleJoint__b:joint_translation_control".to_string(),
        ])
        .expect("pick completes")
        .unwrap();
    assert_eq!(
        outcome,
        HookOutcome::Rehooked {
            target: Some("SingleJoint__b:joint_translation_control".to_string())
        }
    );
    // listener is back
    assert!(rig
        .on_selection_changed(&["SingleJoint__a:joint".to_string()])
        .is_none());
    assert_eq!(rig.current_module(), Some(&a));
}

#[test]
fn invalid_pick_is_rejected_and_cancel_restores_listener() {
    let mut rig = rig_with_two_joints();
    let a = ModuleId::new("SingleJoint", "a");
    rig.begin_hook_pick(&a).unwrap();
    let outcome = rig
        .on_selection_changed(&["SingleJoint__a:joint_translation_control".to_string()])
        .expect("pick completes")
        .unwrap();
    assert!(matches!(outcome, HookOutcome::Rejected { .. }));

    rig.begin_hook_pick(&a).unwrap();
    assert_eq!(rig.cancel_hook_pick(), Some(a));
    assert!(rig
        .on_selection_changed(&["SingleJoint__b:joint_translation_control".to_string()])
        .is_none());
}
