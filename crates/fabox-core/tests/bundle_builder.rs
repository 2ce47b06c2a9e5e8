//! Building bundles from product source trees.

mod support;

use tempfile::TempDir;

use fabox_core::archive;
use fabox_core::build::{BundleBuilder, VERSION_FILE, VersionStamp};
use fabox_core::bundle::BuildNumber;
use fabox_core::error::{BuildPhase, FaboxError, NotFoundKind};
use fabox_core::types::ArchiveFormat;

use support::{Workspace, read_file};

#[test]
fn first_build_of_a_tag_is_001() {
    let ws = Workspace::new();
    ws.add_product("site", &[("index.html", "hello")]);

    let report = ws
        .ctx
        .builder()
        .build("site", "220101")
        .expect("build should succeed");

    assert_eq!(report.bundle.filename(), "site_220101--001.tar.gz");
    assert_eq!(report.archive, ws.archive_root().join("site_220101--001.tar.gz"));
    assert!(report.archive.is_file());
    assert_eq!(report.stamp.tag, "site_220101");
    assert_eq!(report.stamp.build, "001");
}

#[test]
fn rebuilding_a_tag_numbers_contiguously() {
    let ws = Workspace::new();
    let builds: Vec<_> = (0..3)
        .map(|i| ws.build("site", "release", &format!("v{i}")).build)
        .collect();

    assert_eq!(
        builds,
        vec![BuildNumber::new(1), BuildNumber::new(2), BuildNumber::new(3)]
    );
    let listed = ws
        .ctx
        .bundle_store()
        .list_bundles(None)
        .expect("list should succeed");
    assert_eq!(listed.len(), 3);
}

#[test]
fn bundle_contents_are_stripped_and_stamped() {
    let ws = Workspace::new();
    ws.add_product(
        "site",
        &[
            ("index.html", "hello"),
            ("assets/app.js", "js"),
            (".git/HEAD", "ref"),
            ("assets/.idea/workspace.xml", "xml"),
            ("assets/.gitignore", "keep me"),
        ],
    );

    let report = ws
        .ctx
        .builder()
        .build("site", "220101")
        .expect("build should succeed");
    assert_eq!(report.stripped, 2);

    let out = TempDir::new().expect("tempdir should succeed");
    let extracted = out.path().join("site");
    archive::unpack(ArchiveFormat::TarGz, &report.archive, &extracted)
        .expect("unpack should succeed");

    assert_eq!(read_file(&extracted.join("index.html")), "hello");
    assert_eq!(read_file(&extracted.join("assets/app.js")), "js");
    assert!(extracted.join("assets/.gitignore").is_file());
    assert!(!extracted.join(".git").exists());
    assert!(!extracted.join("assets/.idea").exists());

    let stamp = VersionStamp::read_from_dir(&extracted)
        .expect("read stamp")
        .expect("bundle should carry a stamp");
    assert_eq!(stamp, report.stamp);
    assert!(read_file(&extracted.join(VERSION_FILE)).starts_with("Tag: site_220101 - Build 001 - Built: "));
}

#[test]
fn source_tree_is_left_untouched() {
    let ws = Workspace::new();
    ws.add_product("site", &[("index.html", "hello"), (".git/HEAD", "ref")]);

    ws.ctx.builder().build("site", "1").expect("build should succeed");

    assert!(ws.source_dir("site").join(".git/HEAD").is_file());
    assert!(!ws.source_dir("site").join(VERSION_FILE).exists());
}

#[test]
fn zip_builds_use_zip_extension() {
    let ws = Workspace::new();
    ws.add_product("site", &[("index.html", "hello")]);
    let builder = BundleBuilder::new(ws.ctx.catalog(), ws.ctx.bundle_store(), ArchiveFormat::Zip);

    let report = builder.build("site", "z").expect("build should succeed");
    assert_eq!(report.bundle.filename(), "site_z--001.zip");

    let next = builder.build("site", "z").expect("build should succeed");
    assert_eq!(next.bundle.filename(), "site_z--002.zip");
}

#[test]
fn unknown_product_is_not_found() {
    let ws = Workspace::new();
    let err = ws.ctx.builder().build("shop", "1").expect_err("build should fail");
    assert!(matches!(
        err,
        FaboxError::NotFound {
            kind: NotFoundKind::Product,
            ..
        }
    ));
}

#[test]
fn tag_names_that_break_naming_are_rejected() {
    let ws = Workspace::new();
    ws.add_product("site", &[("index.html", "hello")]);

    for name in ["a--b", "", "../up", "has space"] {
        let err = ws
            .ctx
            .builder()
            .build("site", name)
            .expect_err("build should fail");
        assert!(
            matches!(
                err,
                FaboxError::BuildFailure {
                    phase: BuildPhase::Validate,
                    ..
                }
            ),
            "{name:?}: {err}"
        );
    }
    assert!(
        ws.ctx
            .bundle_store()
            .list_bundles(None)
            .expect("list should succeed")
            .is_empty()
    );
}

#[test]
fn staging_area_is_removed_after_build() {
    let ws = Workspace::new();
    ws.add_product("site", &[("index.html", "hello")]);
    let work = ws.temp.path().join("work");
    let builder = ws.ctx.builder().with_work_dir(work.clone());

    builder.build("site", "1").expect("build should succeed");
    builder.build("shop", "1").expect_err("unknown product should fail");

    let leftovers: Vec<_> = std::fs::read_dir(&work)
        .expect("work dir should exist")
        .collect();
    assert!(leftovers.is_empty());
}
