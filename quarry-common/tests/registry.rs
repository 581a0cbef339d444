// Load-time validation: the registry is either fully valid or refuses to
// serve. Every structural defect must surface here, never at resolution
// time.

use std::fs;

use quarry_common::error::QuarryError;
use quarry_common::RecipeRegistry;

fn write_recipe(dir: &std::path::Path, file: &str, contents: &str) {
    fs::write(dir.join(file), contents).unwrap();
}

const ZLIB: &str = r#"{
    "name": "zlib",
    "description": "Massively spiffy yet delicately unobtrusive compression library",
    "homepage": "https://zlib.net",
    "installer": "autotools",
    "versions": [
        { "version": "1.3.1", "sha256": "9a93b2b7dfdac77ceba5a558a580e74667dd6fede4585b91eefb60f03b72df23" }
    ],
    "variants": [
        { "name": "shared", "kind": "bool", "default": true, "description": "Build shared libraries" }
    ]
}"#;

#[test]
fn loads_a_valid_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_recipe(dir.path(), "zlib.json", ZLIB);
    write_recipe(
        dir.path(),
        "pigz.json",
        r#"{
            "name": "pigz",
            "installer": "autotools",
            "versions": [ { "version": "2.8", "sha256": "eb872b4f0e1f0ebe59c9f7bd8c506c4204893ba6a8492de31df416f0d5170fd0" } ],
            "dependencies": [ { "target": "zlib", "constraint": ">=1.2", "classifiers": ["link", "run"] } ]
        }"#,
    );

    let registry = RecipeRegistry::load(dir.path()).unwrap();
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.names().collect::<Vec<_>>(), vec!["pigz", "zlib"]);
    assert_eq!(registry.get("zlib").unwrap().name, "zlib");
    assert!(matches!(
        registry.get("bzip2").unwrap_err(),
        QuarryError::NotFound(_)
    ));
}

#[test]
fn duplicate_recipe_names_fail() {
    let dir = tempfile::tempdir().unwrap();
    write_recipe(dir.path(), "zlib.json", ZLIB);
    write_recipe(dir.path(), "zlib-copy.json", ZLIB);
    assert!(matches!(
        RecipeRegistry::load(dir.path()).unwrap_err(),
        QuarryError::RecipeDefinition(_)
    ));
}

#[test]
fn dangling_edge_target_fails_at_load() {
    let dir = tempfile::tempdir().unwrap();
    write_recipe(
        dir.path(),
        "pigz.json",
        r#"{
            "name": "pigz",
            "installer": "autotools",
            "versions": [ { "version": "2.8", "sha256": "eb872b4f0e1f0ebe59c9f7bd8c506c4204893ba6a8492de31df416f0d5170fd0" } ],
            "dependencies": [ { "target": "zlib" } ]
        }"#,
    );
    let err = RecipeRegistry::load(dir.path()).unwrap_err();
    match err {
        QuarryError::RecipeDefinition(msg) => assert!(msg.contains("unknown recipe 'zlib'")),
        other => panic!("expected RecipeDefinition, got {other:?}"),
    }
}

#[test]
fn malformed_version_fails_at_load() {
    let dir = tempfile::tempdir().unwrap();
    write_recipe(
        dir.path(),
        "bad.json",
        r#"{
            "name": "bad",
            "installer": "autotools",
            "versions": [ { "version": "1..3", "sha256": "aa" } ]
        }"#,
    );
    assert!(matches!(
        RecipeRegistry::load(dir.path()).unwrap_err(),
        QuarryError::RecipeDefinition(_)
    ));
}

#[test]
fn malformed_condition_fails_at_load() {
    let dir = tempfile::tempdir().unwrap();
    write_recipe(dir.path(), "zlib.json", ZLIB);
    write_recipe(
        dir.path(),
        "hdf5.json",
        r#"{
            "name": "hdf5",
            "installer": "autotools",
            "versions": [ { "version": "1.14.3", "sha256": "09cdb287aa7a89148c1638dd20891fdbae08102cf433ef128fd345338aa237c7" } ],
            "dependencies": [
                {
                    "target": "zlib",
                    "when": { "type": "variant_equals", "variant": "mpi", "value": true }
                }
            ]
        }"#,
    );
    let err = RecipeRegistry::load(dir.path()).unwrap_err();
    match err {
        QuarryError::RecipeDefinition(msg) => {
            assert!(msg.contains("unknown variant 'mpi'"));
        }
        other => panic!("expected RecipeDefinition, got {other:?}"),
    }
}

#[test]
fn duplicate_variant_names_fail() {
    let dir = tempfile::tempdir().unwrap();
    write_recipe(
        dir.path(),
        "dup.json",
        r#"{
            "name": "dup",
            "installer": "autotools",
            "versions": [ { "version": "1.0", "sha256": "7c2e7e25f83c4b1b47d1bbf42522b1a0c5e2c5b0f2c7e7cc26c2e9d0e25b3a11" } ],
            "variants": [
                { "name": "shared", "kind": "bool", "default": true },
                { "name": "shared", "kind": "bool", "default": false }
            ]
        }"#,
    );
    assert!(matches!(
        RecipeRegistry::load(dir.path()).unwrap_err(),
        QuarryError::RecipeDefinition(_)
    ));
}

#[test]
fn empty_version_list_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_recipe(
        dir.path(),
        "hollow.json",
        r#"{ "name": "hollow", "installer": "cmake", "versions": [] }"#,
    );
    assert!(matches!(
        RecipeRegistry::load(dir.path()).unwrap_err(),
        QuarryError::RecipeDefinition(_)
    ));
}

#[test]
fn unknown_field_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_recipe(
        dir.path(),
        "typo.json",
        r#"{
            "name": "typo",
            "installer": "autotools",
            "verions": [ { "version": "1.0", "sha256": "00" } ]
        }"#,
    );
    assert!(matches!(
        RecipeRegistry::load(dir.path()).unwrap_err(),
        QuarryError::RecipeDefinition(_)
    ));
}
