//! End-to-end scenarios.
//!
//! Each scenario plans a fleet (and where relevant a deploy pipeline) into a
//! fresh template and checks the emitted resources:
//!
//! - A: one on-demand shape emits a plain launch template reference
//! - B: two shapes with 20% on-demand emit a mixed-instances policy
//! - C: object writes to the deployment bucket dispatch exactly once
//! - D: minimum capacity drives min-in-service and the signal count
//!
//! ## Running
//!
//! ```bash
//! cargo test -p fleetform-e2e --test scenarios
//! ```

use fleetform_deploy::DeployEventPipeline;
use fleetform_events::{BusEvent, ObjectOperation};
use fleetform_fleet::{FleetError, FleetPlan, FleetPlanner, FleetSpec};
use fleetform_template::{Resource, Template};
use fleetform_testing as fixtures;
use serde_json::json;

fn plan(spec: FleetSpec) -> (Template, FleetPlan) {
    fixtures::init_tracing();
    let ctx = fixtures::context();
    let mut template = Template::new();
    let plan = FleetPlanner::new(&ctx, spec)
        .validate()
        .unwrap()
        .plan(&mut template)
        .unwrap();
    (template, plan)
}

fn group<'a>(template: &'a Template, plan: &FleetPlan) -> &'a Resource {
    template.get(&plan.handles.auto_scaling_group).unwrap()
}

#[test]
fn scenario_a_single_on_demand_shape() {
    let (template, plan) = plan(fixtures::on_demand_fleet());
    let asg = group(&template, &plan);

    assert!(asg.property("MixedInstancesPolicy").is_none());
    let launch = asg.property("LaunchTemplate").unwrap();
    assert_eq!(
        launch["LaunchTemplateId"],
        json!({"Ref": plan.handles.launch_template.as_str()})
    );
    assert_eq!(
        launch["Version"],
        json!({"Fn::GetAtt": [plan.handles.launch_template.as_str(), "LatestVersionNumber"]})
    );

    let lt = template.get(&plan.handles.launch_template).unwrap();
    assert_eq!(lt.properties["LaunchTemplateData"]["InstanceType"], "m5.large");
}

#[test]
fn scenario_b_mixed_shapes() {
    let (template, plan) = plan(fixtures::mixed_fleet());
    let asg = group(&template, &plan);

    assert!(asg.property("LaunchTemplate").is_none());
    let mixed = asg.property("MixedInstancesPolicy").unwrap();
    assert_eq!(
        mixed["InstancesDistribution"]["OnDemandPercentageAboveBaseCapacity"],
        20
    );
    assert_eq!(
        mixed["LaunchTemplate"]["Overrides"],
        json!([{"InstanceType": "m5.large"}, {"InstanceType": "m5.xlarge"}])
    );
}

#[test]
fn scenario_b_rejections_leave_template_untouched() {
    fixtures::init_tracing();
    let ctx = fixtures::context();
    let mut template = Template::new();

    let one_shape_spot = fixtures::on_demand_fleet().with_on_demand_percentage(20);
    let err = FleetPlanner::new(&ctx, one_shape_spot).validate().unwrap_err();
    assert!(matches!(err, FleetError::SingleShapeWithSpot { count: 1 }));

    let two_shapes_on_demand =
        FleetSpec::new(fixtures::network(), fixtures::shapes(&["m5.large", "m5.xlarge"]));
    let err = FleetPlanner::new(&ctx, two_shapes_on_demand)
        .validate()
        .unwrap_err();
    assert!(matches!(err, FleetError::MultipleShapesOnDemand { count: 2 }));

    assert!(template.is_empty());
    // A valid plan into the same template still succeeds.
    FleetPlanner::new(&ctx, fixtures::on_demand_fleet())
        .validate()
        .unwrap()
        .plan(&mut template)
        .unwrap();
    assert!(!template.is_empty());
}

#[test]
fn scenario_c_put_object_dispatches_once() {
    fixtures::init_tracing();
    let ctx = fixtures::context();
    let config = fixtures::deploy_config();
    let mut template = Template::new();
    let pipeline = DeployEventPipeline::declare(&ctx, &config, &mut template).unwrap();

    let event = fixtures::put_object_event(pipeline.bucket_name(), "scripts/bin/10-restart.sh");
    let dispatches: Vec<_> = pipeline.route(&event).into_iter().collect();
    assert_eq!(dispatches.len(), 1);
    assert_eq!(dispatches[0].targets, config.targets);
    assert_eq!(dispatches[0].document_name, "workers-DeployCommands");

    let other = fixtures::put_object_event("someone-elses-bucket", "scripts/bin/run.sh");
    assert!(pipeline.route(&other).is_none());

    let delete = BusEvent::object_api_call(
        ObjectOperation::DeleteObject,
        pipeline.bucket_name(),
        "scripts/bin/run.sh",
        fixtures::REGION,
        fixtures::ACCOUNT_ID,
    );
    assert!(pipeline.route(&delete).is_none());
}

#[test]
fn scenario_c_rule_carries_pattern_and_targets() {
    let ctx = fixtures::context();
    let config = fixtures::deploy_config();
    let mut template = Template::new();
    let pipeline = DeployEventPipeline::declare(&ctx, &config, &mut template).unwrap();

    let rule = template.get(&pipeline.handles().rule).unwrap();
    assert_eq!(
        rule.properties["EventPattern"]["detail"]["requestParameters"]["bucketName"],
        json!([pipeline.bucket_name()])
    );
    let target = &rule.properties["Targets"][0];
    assert_eq!(target["Arn"], pipeline.document_arn());
    assert_eq!(
        target["RunCommandParameters"]["RunCommandTargets"],
        json!([{"Key": "tag:ClusterName", "Values": ["workers-cluster"]}])
    );
}

#[test]
fn scenario_d_min_capacity_drives_signals() {
    let (template, plan) = plan(fixtures::on_demand_fleet().with_capacity(Some(3), None, None));
    let asg = group(&template, &plan);

    assert_eq!(plan.update_policy.min_in_service(), 3);
    assert_eq!(plan.update_policy.signal_count(), 3);
    assert_eq!(
        asg.update_policy.as_ref().unwrap()["AutoScalingRollingUpdate"]["MinInstancesInService"],
        3
    );
    assert_eq!(
        asg.creation_policy.as_ref().unwrap()["ResourceSignal"]["Count"],
        3
    );
    assert_eq!(asg.property("MinSize").unwrap(), "3");
}

#[test]
fn scenario_d_absent_min_capacity_defaults_to_one() {
    let (template, plan) = plan(fixtures::on_demand_fleet());
    let asg = group(&template, &plan);

    assert_eq!(plan.update_policy.min_in_service(), 1);
    assert_eq!(
        asg.creation_policy.as_ref().unwrap()["ResourceSignal"]["Count"],
        1
    );
}

#[test]
fn boot_signal_targets_the_owning_group() {
    let (template, plan) = plan(fixtures::mixed_fleet());
    let group_id = plan.handles.auto_scaling_group.as_str();

    let signal = plan.launch_plan.user_data().signal_line().unwrap();
    assert!(signal.contains(&format!("--resource {group_id} ")));
    assert!(group(&template, &plan).creation_policy.is_some());

    let tags = plan.launch_plan.tags();
    assert_eq!(tags[0].key, "ClusterName");
    assert_eq!(tags[0].value, "workers-cluster");
}
