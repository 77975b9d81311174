//! Manifest files on disk through to synthesis.

use std::io::Write;

use fleetform_manifest::{
    manifest_hash_from_path, synthesize, ContextOverrides, Manifest, STACK_NAME_ENV,
};
use tempfile::NamedTempFile;

const MANIFEST: &str = r#"
[context]
region = "us-west-2"
account_id = "123456789012"
stack_name = "render"

[fleet]
shapes = ["c5.large", "c5.xlarge", "c5.2xlarge"]
on_demand_percentage = 0
min_capacity = 2
max_capacity = 8

[fleet.network]
vpc_id = "vpc-1"
subnet_ids = ["subnet-a", "subnet-b"]

[deploy]
source_path = "/scripts/"
"#;

fn write(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn load_and_synthesize() {
    let file = write(MANIFEST);
    let manifest = Manifest::from_path(file.path()).unwrap();
    let stack = synthesize(&manifest, &ContextOverrides::default()).unwrap();

    assert_eq!(stack.context.stack_name(), "render");
    assert_eq!(stack.fleet.update_policy.min_in_service(), 2);
    assert!(!stack.fleet.distribution.is_on_demand_only());

    let pipeline = stack.pipeline.unwrap();
    assert_eq!(pipeline.key_prefix(), "scripts");
    assert_eq!(pipeline.bucket_name(), "render-deploy-123456789012-us-west-2");
}

#[test]
fn env_override_renames_stack() {
    let manifest = Manifest::parse(MANIFEST).unwrap();
    let overrides = ContextOverrides::from_lookup(|key| {
        (key == STACK_NAME_ENV).then(|| "render-staging".to_string())
    });

    let stack = synthesize(&manifest, &overrides).unwrap();
    assert_eq!(stack.context.stack_name(), "render-staging");
    assert_eq!(stack.fleet.cluster_name, "render-staging-cluster");
}

#[test]
fn hash_from_path_matches_contents() {
    let file = write(MANIFEST);
    let from_path = manifest_hash_from_path(file.path()).unwrap();
    let from_str = fleetform_manifest::manifest_hash_from_toml_str(MANIFEST).unwrap();
    assert_eq!(from_path, from_str);
}

#[test]
fn missing_file_names_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = Manifest::from_path(&path).unwrap_err();
    assert!(format!("{err:#}").contains("absent.toml"));
}

#[test]
fn invalid_fleet_fails_synthesis() {
    let single_shape_spot = MANIFEST.replace(
        r#"shapes = ["c5.large", "c5.xlarge", "c5.2xlarge"]"#,
        r#"shapes = ["c5.large"]"#,
    );
    let manifest = Manifest::parse(&single_shape_spot).unwrap();

    let err = synthesize(&manifest, &ContextOverrides::default()).unwrap_err();
    assert!(format!("{err:#}").contains("invalid fleet"));
}
