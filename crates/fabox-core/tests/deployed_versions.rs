//! Reading deployed versions back from slot stamps.

mod support;

use fabox_core::deploy::SlotFilter;
use fabox_core::fs::hash_tree;
use fabox_core::types::Slot;

use support::{Workspace, write_file};

fn deploy(ws: &Workspace, product: &str, label: &str) {
    let bundle = ws.build(product, label, label);
    ws.ctx
        .deploy_engine()
        .expect("engine should build")
        .deploy(&bundle)
        .expect("deploy should succeed");
}

fn lines(ws: &Workspace, filter: SlotFilter) -> Vec<String> {
    ws.ctx
        .deployed_versions()
        .list(filter)
        .expect("list should succeed")
        .iter()
        .map(|version| version.stamp.render())
        .collect()
}

#[test]
fn missing_deploy_root_lists_nothing() {
    let ws = Workspace::new();
    assert!(lines(&ws, SlotFilter::All).is_empty());
}

#[test]
fn filters_select_slots() {
    let ws = Workspace::new();
    deploy(&ws, "site", "a");
    deploy(&ws, "site", "b");
    deploy(&ws, "api", "x");
    ws.ctx
        .rollback_engine()
        .rollback("site")
        .expect("rollback should succeed");
    deploy(&ws, "site", "c");

    let live = lines(&ws, SlotFilter::Live);
    assert_eq!(live.len(), 2);
    assert!(live[0].starts_with("Tag: api_x - Build 001"));
    assert!(live[1].starts_with("Tag: site_c - Build 001"));

    let previous = lines(&ws, SlotFilter::Previous);
    assert_eq!(previous.len(), 1);
    assert!(previous[0].starts_with("Tag: site_a"));

    let all = lines(&ws, SlotFilter::All);
    assert_eq!(all.len(), 4);
    let mut sorted = all.clone();
    sorted.sort();
    assert_eq!(all, sorted);
}

#[test]
fn unstamped_and_hidden_directories_are_skipped() {
    let ws = Workspace::new();
    deploy(&ws, "site", "a");
    write_file(&ws.deploy_root().join("legacy/index.html"), "no stamp");
    write_file(
        &ws.deploy_root().join(".site_new/version.txt"),
        "Tag: site_z - Build 001 - Built: now",
    );

    let versions = ws
        .ctx
        .deployed_versions()
        .list(SlotFilter::All)
        .expect("list should succeed");

    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].product, "site");
    assert_eq!(versions[0].slot, Slot::Live);
    assert_eq!(versions[0].path, ws.live("site"));
}

#[test]
fn slot_states_report_each_position() {
    let ws = Workspace::new();
    deploy(&ws, "site", "a");
    deploy(&ws, "site", "b");

    let slots = ws
        .ctx
        .deployed_versions()
        .slots("site", false)
        .expect("slots should succeed");

    let summary: Vec<_> = slots
        .iter()
        .map(|state| (state.slot, state.present, state.stamp.as_ref().map(|s| s.tag.clone())))
        .collect();
    assert_eq!(
        summary,
        vec![
            (Slot::Live, true, Some("site_b".to_string())),
            (Slot::Previous, true, Some("site_a".to_string())),
            (Slot::Rollback, false, None),
        ]
    );
    assert!(slots.iter().all(|state| state.hash.is_none()));
}

#[test]
fn verify_hashes_present_slots() {
    let ws = Workspace::new();
    deploy(&ws, "site", "a");

    let slots = ws
        .ctx
        .deployed_versions()
        .slots("site", true)
        .expect("slots should succeed");

    let expected = hash_tree(&ws.live("site")).expect("hash should succeed");
    assert_eq!(slots[0].hash.as_deref(), Some(expected.as_str()));
    assert_eq!(slots[1].hash, None);
}
