//! Listing, numbering and resolving archived bundles.

mod support;

use tempfile::TempDir;

use fabox_core::bundle::{BuildNumber, BundleStore, BundleTag};
use fabox_core::error::{FaboxError, NotFoundKind};

use support::write_file;

fn store_with(names: &[&str]) -> (TempDir, BundleStore) {
    let temp = TempDir::new().expect("tempdir should succeed");
    let root = temp.path().join("tag");
    for name in names {
        write_file(&root.join(name), "archive");
    }
    std::fs::create_dir_all(&root).expect("create_dir_all should succeed");
    (temp, BundleStore::new(root))
}

fn filenames(store: &BundleStore, tag: Option<&BundleTag>) -> Vec<String> {
    store
        .list_bundles(tag)
        .expect("list should succeed")
        .iter()
        .map(|bundle| bundle.filename())
        .collect()
}

#[test]
fn empty_or_missing_store_lists_nothing() {
    let temp = TempDir::new().expect("tempdir should succeed");
    let store = BundleStore::new(temp.path().join("never-created"));
    assert!(store.list_bundles(None).expect("list should succeed").is_empty());
    assert!(store.tags().expect("tags should succeed").is_empty());
}

#[test]
fn sorted_by_tag_then_build() {
    let (_temp, store) = store_with(&[
        "site_220102--001.tar.gz",
        "site_220101--010.tar.gz",
        "api_1--001.zip",
        "site_220101--002.tar.gz",
        "site_220101--001.tar.gz",
    ]);

    assert_eq!(
        filenames(&store, None),
        vec![
            "api_1--001.zip",
            "site_220101--001.tar.gz",
            "site_220101--002.tar.gz",
            "site_220101--010.tar.gz",
            "site_220102--001.tar.gz",
        ]
    );
}

#[test]
fn tag_filter_keeps_only_that_tag() {
    let (_temp, store) = store_with(&[
        "site_220101--001.tar.gz",
        "site_220101x--001.tar.gz",
        "site_220102--001.tar.gz",
    ]);
    let tag = BundleTag::parse("site_220101").expect("tag should parse");

    assert_eq!(filenames(&store, Some(&tag)), vec!["site_220101--001.tar.gz"]);
}

#[test]
fn ignores_unrelated_and_malformed_entries() {
    let (temp, store) = store_with(&[
        "site_1--001.tar.gz",
        "notes.txt",
        "site_1.tar.gz",
        "site_1--1.tar.gz",
        "old_1--001.tar.bz2",
    ]);
    std::fs::create_dir_all(temp.path().join("tag").join("dir_1--002.tar.gz"))
        .expect("create_dir_all should succeed");

    assert_eq!(filenames(&store, None), vec!["site_1--001.tar.gz"]);
}

#[test]
fn next_build_continues_past_the_highest() {
    let (_temp, store) = store_with(&["site_1--001.tar.gz", "site_1--007.zip"]);
    let tag = BundleTag::parse("site_1").expect("tag should parse");
    let fresh = BundleTag::parse("site_2").expect("tag should parse");

    assert_eq!(store.next_build(&tag).expect("next"), BuildNumber::new(8));
    assert_eq!(store.next_build(&fresh).expect("next"), BuildNumber::FIRST);
}

#[test]
fn resolve_accepts_filename_or_tag() {
    let (_temp, store) = store_with(&["site_1--001.tar.gz", "site_1--002.tar.gz"]);

    let by_name = store.resolve("site_1--001.tar.gz").expect("resolve by name");
    assert_eq!(by_name.build, BuildNumber::FIRST);

    let by_tag = store.resolve("site_1").expect("resolve by tag");
    assert_eq!(by_tag.filename(), "site_1--002.tar.gz");

    assert!(matches!(
        store.resolve("site_1--003.tar.gz"),
        Err(FaboxError::NotFound {
            kind: NotFoundKind::Bundle,
            ..
        })
    ));
    assert!(matches!(
        store.resolve("site_9"),
        Err(FaboxError::NotFound {
            kind: NotFoundKind::Tag,
            ..
        })
    ));
}
