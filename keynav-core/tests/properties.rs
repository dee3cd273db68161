//! End-to-end behavior of the store, codec and dispatcher together

use keynav_core::codec::{self, fragment_count};
use keynav_core::testing::TestHarness;
use keynav_core::{
    assert_launched, assert_nothing_reported, assert_reported, restricted_view, Action, ActionKind,
    CapabilityFlags, MemorySettings, Payload, Store, StoreError,
};

fn assert_same_list(decoded: &[Option<Action>], original: &[Action]) {
    assert_eq!(decoded.len(), original.len());
    for (decoded, original) in decoded.iter().zip(original) {
        let decoded = decoded.as_ref().expect("every token decodes");
        assert_eq!(decoded, original);
        assert_eq!(decoded.name(), original.name());
        assert_eq!(decoded.keys(), original.keys());
        assert_eq!(decoded.activation_counts(), original.activation_counts());
        assert_eq!(decoded.is_locked(), original.is_locked());
        assert_eq!(decoded.payload(), original.payload());
        assert!(decoded.activation_counts().len() >= decoded.keys().len());
    }
}

#[test]
fn roundtrip_empty_single_and_repeated_kinds() {
    let empty: Vec<Action> = Vec::new();
    assert_same_list(&codec::decode_list(&codec::encode_list(&empty)), &empty);

    let single = vec![Action::new_cmd("one", "echo 1", false).bound_to(["1"])];
    assert_same_list(&codec::decode_list(&codec::encode_list(&single)), &single);

    let repeated = vec![
        Action::new_web("w1", vec!["a.example".into()]).bound_to(["a"]),
        Action::new_web("w2", vec!["b.example".into(), "c.example".into()]),
        Action::new_web("w3", vec![]).bound_to(["x", "y", "z"]),
    ];
    assert_same_list(&codec::decode_list(&codec::encode_list(&repeated)), &repeated);
}

#[test]
fn dispatch_fan_out() {
    let a = Action::new_default("A", vec!["app-a".into()]).bound_to(["a", "b"]);
    let b = Action::new_default("B", vec!["app-b".into()]).bound_to(["b"]);

    let mut harness = TestHarness::new();
    harness.add(a.clone());
    harness.add(b.clone());

    let result = harness.press("B");
    assert_eq!(result.matched, [a.id(), b.id()]);
    assert_launched!(harness.launcher(), "app-a");
    assert_launched!(harness.launcher(), "app-b");

    let store = harness.store();
    assert_eq!(store.find(a.id()).unwrap().activation_counts(), [0, 1]);
    assert_eq!(store.find(b.id()).unwrap().activation_counts(), [1]);
}

#[test]
fn website_prefix_survives_failed_launch() {
    let mut harness = TestHarness::new();
    let web = Action::new_web("site", vec!["example.com".into()]).bound_to(["w"]);
    harness.add(web.clone());
    harness.launcher_mut().fail_all();

    let result = harness.press("w");
    assert_eq!(result.failed, [web.id()]);
    assert_reported!(harness.reporter(), "WebsiteId:0");

    let stored = harness.store().find(web.id()).unwrap().clone();
    assert_eq!(
        stored.payload(),
        &Payload::Web {
            websites: vec!["http://example.com".into()]
        }
    );
}

#[test]
fn cmd_script_is_removed_even_if_launch_fails() {
    let mut harness = TestHarness::new();
    harness.add(Action::new_cmd("script", "echo hi", true).bound_to(["c"]));
    harness.launcher_mut().fail_all();

    let result = harness.press("c");
    assert!(result.all_succeeded());
    assert_nothing_reported!(harness.reporter());
    assert_eq!(harness.launcher().script_contents(), ["echo hi"]);

    let leftovers = std::fs::read_dir(harness.script_dir()).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[test]
fn remove_semantics() {
    let actions = vec![
        Action::new(ActionKind::Default, "a"),
        Action::new(ActionKind::Cmd, "b"),
        Action::new(ActionKind::Web, "c"),
    ];
    let mut harness = TestHarness::with_raw(codec::encode_list(&actions));

    let stranger = Action::new(ActionKind::Cmd, "b");
    assert_eq!(
        harness.store().remove(&stranger),
        Err(StoreError::NotFound { id: stranger.id() })
    );
    assert_eq!(fragment_count(&harness.raw()), 3);

    harness.store().remove(&actions[1]).unwrap();
    assert_eq!(fragment_count(&harness.raw()), 2);

    let remaining = [actions[0].clone(), actions[2].clone()];
    assert_same_list(&codec::decode_list(&harness.raw()), &remaining);
}

#[test]
fn restricted_view_hides_cmd() {
    let actions = vec![
        Action::new(ActionKind::Default, "d1"),
        Action::new(ActionKind::Default, "d2"),
        Action::new(ActionKind::Cmd, "c1"),
        Action::new(ActionKind::Cmd, "c2"),
        Action::new(ActionKind::Web, "w1"),
        Action::new(ActionKind::Web, "w2"),
    ];
    let mut flags = CapabilityFlags::default();
    flags.set_can_view(ActionKind::Cmd, false);

    let visible = restricted_view(&actions, &flags);
    assert_eq!(visible.len(), 4);
    assert!(visible.iter().all(|a| a.kind() != ActionKind::Cmd));
}

#[test]
fn store_reload_after_persisting_elsewhere() {
    let mut first = Store::new(MemorySettings::new());
    let action = Action::new_default("apps", vec!["x".into()]).bound_to(["k"]);
    first.add(action.clone());

    let mut second = Store::new(first.into_settings());
    let loaded = second.load().to_vec();
    assert_same_list(&loaded, &[action]);
}
