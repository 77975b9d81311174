//! Properties that hold for every valid fleet plan.

use std::collections::{BTreeMap, HashSet};

use fleetform_fleet::{FleetError, FleetPlanner, FleetSpec, InstanceShape, NetworkSpec};
use fleetform_id::ResourceHandle;
use fleetform_template::{DeploymentContext, Template};
use proptest::prelude::*;

fn context() -> DeploymentContext {
    DeploymentContext::new("eu-west-1", "123456789012", "props").unwrap()
}

fn shapes(count: usize) -> Vec<InstanceShape> {
    (0..count)
        .map(|i| InstanceShape::parse(&format!("c{}.large", i + 4)).unwrap())
        .collect()
}

fn network() -> NetworkSpec {
    NetworkSpec::new("vpc-1", ["subnet-a"])
}

proptest! {
    #[test]
    fn prop_tags_lead_with_cluster_name(
        tags in proptest::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..6),
        mixed in any::<bool>(),
    ) {
        let ctx = context();
        let mut spec = if mixed {
            FleetSpec::new(network(), shapes(3)).with_on_demand_percentage(10)
        } else {
            FleetSpec::new(network(), shapes(1))
        };
        spec.tags = tags.clone();

        let mut template = Template::new();
        let plan = FleetPlanner::new(&ctx, spec)
            .validate()
            .unwrap()
            .plan(&mut template)
            .unwrap();

        let plan_tags = plan.launch_plan.tags();
        prop_assert_eq!(plan_tags[0].key.as_str(), "ClusterName");
        prop_assert_eq!(plan_tags[0].value.as_str(), "props-cluster");

        let rest: HashSet<(String, String)> = plan_tags[1..]
            .iter()
            .map(|t| (t.key.clone(), t.value.clone()))
            .collect();
        let expected: HashSet<(String, String)> = tags.into_iter().collect();
        prop_assert_eq!(rest, expected);
    }

    #[test]
    fn prop_signal_target_owns_creation_policy(min in proptest::option::of(0u32..20)) {
        let ctx = context();
        let spec = FleetSpec::new(network(), shapes(1)).with_capacity(min, Some(40), None);

        let mut template = Template::new();
        let plan = FleetPlanner::new(&ctx, spec)
            .validate()
            .unwrap()
            .plan(&mut template)
            .unwrap();

        let group = &plan.handles.auto_scaling_group;
        let signal = plan.launch_plan.user_data().signal_line().unwrap().to_string();
        let resource_flag = format!("--resource {} ", group.logical_id());
        prop_assert!(signal.contains(&resource_flag));

        let owner = template.get(group).unwrap();
        let expected = min.filter(|m| *m > 0).unwrap_or(1);
        prop_assert_eq!(
            owner.creation_policy.as_ref().unwrap()["ResourceSignal"]["Count"].as_u64(),
            Some(u64::from(expected))
        );
    }

    #[test]
    fn prop_rejections_never_touch_template(count in 0usize..4, pct in proptest::option::of(0u32..200)) {
        let ctx = context();
        let spec = FleetSpec::new(network(), shapes(count));
        let spec = match pct {
            Some(p) => spec.with_on_demand_percentage(p),
            None => spec,
        };

        let on_demand_only = pct.map_or(true, |p| p >= 100);
        let should_pass = if on_demand_only { count == 1 } else { count >= 2 };

        let mut template = Template::new();
        match FleetPlanner::new(&ctx, spec).validate() {
            Ok(planner) => {
                prop_assert!(should_pass);
                planner.plan(&mut template).unwrap();
                prop_assert!(!template.is_empty());
            }
            Err(e) => {
                prop_assert!(!should_pass);
                prop_assert!(e.is_selection_error());
                prop_assert!(template.is_empty());
            }
        }
    }
}

#[test]
fn test_plan_is_deterministic() {
    let ctx = context();
    let build = || {
        let spec = FleetSpec::new(network(), shapes(2))
            .with_on_demand_percentage(50)
            .with_tag("team", "infra");
        let mut template = Template::new();
        FleetPlanner::new(&ctx, spec)
            .validate()
            .unwrap()
            .plan(&mut template)
            .unwrap();
        template
    };

    assert_eq!(build().digest().unwrap(), build().digest().unwrap());
}

#[test]
fn test_empty_subnets_rejected() {
    let ctx = context();
    let spec = FleetSpec::new(NetworkSpec::new("vpc-1", Vec::<String>::new()), shapes(1));
    let err = FleetPlanner::new(&ctx, spec).validate().unwrap_err();
    assert!(matches!(err, FleetError::InvalidNetwork(_)));
}

#[test]
fn test_tags_from_map_keep_key_order() {
    let ctx = context();
    let mut spec = FleetSpec::new(network(), shapes(1));
    spec.tags = BTreeMap::from([
        ("b".to_string(), "2".to_string()),
        ("a".to_string(), "1".to_string()),
    ]);

    let mut template = Template::new();
    let plan = FleetPlanner::new(&ctx, spec)
        .validate()
        .unwrap()
        .plan(&mut template)
        .unwrap();

    let keys: Vec<&str> = plan.launch_plan.tags().iter().map(|t| t.key.as_str()).collect();
    assert_eq!(keys, ["ClusterName", "a", "b"]);
}
