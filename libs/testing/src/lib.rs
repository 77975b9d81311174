//! Shared fixtures for fleetform tests.

use std::sync::Once;

use fleetform_deploy::{CommandTarget, DeployPipelineConfig};
use fleetform_events::{BusEvent, ObjectOperation};
use fleetform_fleet::{FleetSpec, InstanceShape, NetworkSpec};
use fleetform_template::DeploymentContext;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const REGION: &str = "us-east-1";
pub const ACCOUNT_ID: &str = "123456789012";
pub const STACK_NAME: &str = "workers";

/// Install a test-writer subscriber once per process. `RUST_LOG` controls
/// the level.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
    });
}

pub fn context() -> DeploymentContext {
    DeploymentContext::new(REGION, ACCOUNT_ID, STACK_NAME).expect("fixture context is valid")
}

pub fn network() -> NetworkSpec {
    NetworkSpec::new("vpc-0a1b2c3d", ["subnet-0a", "subnet-0b"])
}

pub fn shapes(names: &[&str]) -> Vec<InstanceShape> {
    names
        .iter()
        .map(|n| InstanceShape::parse(n).expect("fixture shape is valid"))
        .collect()
}

/// One on-demand shape.
pub fn on_demand_fleet() -> FleetSpec {
    FleetSpec::new(network(), shapes(&["m5.large"]))
}

/// Two shapes with 20% on-demand above base capacity.
pub fn mixed_fleet() -> FleetSpec {
    FleetSpec::new(network(), shapes(&["m5.large", "m5.xlarge"])).with_on_demand_percentage(20)
}

/// Pipeline over `scripts/` targeting the default cluster.
pub fn deploy_config() -> DeployPipelineConfig {
    DeployPipelineConfig::new(
        "scripts",
        vec![CommandTarget::tag("ClusterName", [format!("{STACK_NAME}-cluster")])],
    )
}

/// A `PutObject` audit event for `bucket/key` in the fixture account.
pub fn put_object_event(bucket: &str, key: &str) -> BusEvent {
    BusEvent::object_api_call(ObjectOperation::PutObject, bucket, key, REGION, ACCOUNT_ID)
}

/// A complete manifest for the fixture context.
pub fn manifest_toml() -> String {
    format!(
        r#"[context]
region = "{REGION}"
account_id = "{ACCOUNT_ID}"
stack_name = "{STACK_NAME}"

[fleet]
shapes = ["m5.large", "m5.xlarge"]
on_demand_percentage = 20
min_capacity = 3
max_capacity = 6

[fleet.network]
vpc_id = "vpc-0a1b2c3d"
subnet_ids = ["subnet-0a", "subnet-0b"]

[fleet.tags]
team = "platform"

[fleet.scaling]
max_capacity = 6

[deploy]
source_path = "scripts"
schedule = "cron(0 10 ? * * *)"
"#
    )
}
