//! Manifest to backend, end to end.
//!
//! ## Running
//!
//! ```bash
//! cargo test -p fleetform-e2e --test synthesis
//! ```

use fleetform_manifest::{
    manifest_hash_from_toml_str, synthesize, ContextOverrides, Manifest, SynthesizedStack,
};
use fleetform_template::{InMemoryBackend, InfrastructureBackend};
use fleetform_testing as fixtures;

fn synthesize_fixture() -> SynthesizedStack {
    fixtures::init_tracing();
    let manifest = Manifest::parse(&fixtures::manifest_toml()).unwrap();
    synthesize(&manifest, &ContextOverrides::default()).unwrap()
}

#[test]
fn resynthesis_is_deterministic() {
    let a = synthesize_fixture();
    let b = synthesize_fixture();

    assert_eq!(a.digest, b.digest);
    assert_eq!(a.template.to_json().unwrap(), b.template.to_json().unwrap());
    assert_eq!(
        manifest_hash_from_toml_str(&fixtures::manifest_toml()).unwrap(),
        manifest_hash_from_toml_str(&fixtures::manifest_toml()).unwrap()
    );
}

#[test]
fn one_template_holds_fleet_and_pipeline() {
    let stack = synthesize_fixture();
    let pipeline = stack.pipeline.as_ref().unwrap();
    let handles = &stack.fleet.handles;

    assert!(stack.template.get(&handles.auto_scaling_group).is_some());
    assert!(stack.template.get(handles.scaling_plan.as_ref().unwrap()).is_some());
    assert!(stack.template.get(&pipeline.handles().trail).is_some());
    assert!(stack.template.get(&pipeline.handles().rule).is_some());

    let association = stack
        .template
        .get(pipeline.handles().association.as_ref().unwrap())
        .unwrap();
    assert_eq!(
        association.property("ScheduleExpression").unwrap(),
        "cron(0 10 ? * * *)"
    );

    let scheduled = pipeline.scheduled_dispatch().unwrap();
    assert_eq!(scheduled.targets, pipeline.targets());
    assert_eq!(
        pipeline.targets()[0].values,
        vec![stack.fleet.cluster_name.clone()]
    );
}

#[test]
fn upload_to_synthesized_bucket_dispatches() {
    let stack = synthesize_fixture();
    let pipeline = stack.pipeline.as_ref().unwrap();

    let event = fixtures::put_object_event(pipeline.bucket_name(), "scripts/bin/deploy.sh");
    let dispatch = pipeline.route(&event).unwrap();
    assert_eq!(dispatch.document_arn, pipeline.document_arn());
}

#[tokio::test]
async fn backend_ids_are_stable_across_redeploys() {
    let backend = InMemoryBackend::new();

    let first = synthesize_fixture().deploy(&backend).await.unwrap();
    let second = synthesize_fixture().deploy(&backend).await.unwrap();

    assert_eq!(first.stack_id, second.stack_id);
    assert_eq!(first.physical_ids, second.physical_ids);
    assert_eq!(first.digest, second.digest);
    assert!(first.changed);
    assert!(!second.changed);
    assert_eq!(second.revision, 2);
}

#[tokio::test]
async fn dyn_backend_accepts_stack() {
    let backend: Box<dyn InfrastructureBackend> = Box::new(InMemoryBackend::new());
    let stack = synthesize_fixture();

    let receipt = stack.deploy(backend.as_ref()).await.unwrap();
    assert_eq!(receipt.physical_ids.len(), stack.template.len());
}

#[test]
fn template_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let stack = synthesize_fixture();

    let path = stack.write_template(dir.path()).unwrap();
    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(on_disk["AWSTemplateFormatVersion"], "2010-09-09");
    assert!(on_disk["Resources"].as_object().unwrap().len() > 10);
}
