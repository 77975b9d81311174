//! Boot script composition.
//!
//! Every new fleet member runs the same ordered script: install tooling,
//! configure the container agent, name and tag itself, wait for the agent to
//! register, run caller commands, and finally signal the orchestrator. The
//! signal is the last line so that `$?` reflects the caller commands.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use fleetform_id::{AutoScalingGroupHandle, ResourceHandle};
use fleetform_template::shell::validate_shell_input;
use fleetform_template::DeploymentContext;

use crate::FleetError;

/// Interpreter line prepended when rendering.
pub const SHEBANG: &str = "#!/bin/bash";

/// Container agent config file.
const ECS_CONFIG_PATH: &str = "/etc/ecs/ecs.config";

/// Logging drivers the container agent is allowed to use.
const LOGGING_DRIVERS: &[&str] = &[
    "json-file",
    "awslogs",
    "fluentd",
    "syslog",
    "journald",
    "gelf",
    "logentries",
    "splunk",
];

/// A composed boot script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootScript {
    lines: Vec<String>,
}

impl BootScript {
    /// Script lines, without the interpreter line.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Full script text.
    pub fn render(&self) -> String {
        let mut out = String::from(SHEBANG);
        for line in &self.lines {
            out.push('\n');
            out.push_str(line);
        }
        out
    }

    /// Base64 of the rendered script, as carried in launch template user data.
    pub fn encode(&self) -> String {
        STANDARD.encode(self.render())
    }

    /// The final line, which reports boot completion.
    pub fn signal_line(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }
}

/// Composes the boot script for members of one scaling group.
///
/// The composer takes the scaling group handle rather than a name so the
/// signal always targets the group that owns the creation policy.
#[derive(Debug, Clone)]
pub struct BootScriptComposer<'a> {
    context: &'a DeploymentContext,
    cluster_name: &'a str,
    signal_target: &'a AutoScalingGroupHandle,
    extra_commands: Vec<String>,
}

impl<'a> BootScriptComposer<'a> {
    pub fn new(
        context: &'a DeploymentContext,
        cluster_name: &'a str,
        signal_target: &'a AutoScalingGroupHandle,
    ) -> Self {
        Self {
            context,
            cluster_name,
            signal_target,
            extra_commands: Vec::new(),
        }
    }

    /// Commands run after the built-in stages, verbatim.
    pub fn with_extra_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_commands
            .extend(commands.into_iter().map(Into::into));
        self
    }

    pub fn compose(&self) -> Result<BootScript, FleetError> {
        validate_shell_input(self.cluster_name, "cluster name")?;
        validate_shell_input(self.context.region(), "region")?;
        validate_shell_input(self.context.stack_name(), "stack name")?;

        let region = self.context.region();
        let cluster = self.cluster_name;

        let mut lines = Vec::new();
        lines.extend(install_tooling(region));
        lines.extend(reload_agent_unit());
        lines.extend(agent_config(cluster));
        lines.extend(set_host_name(cluster, region));
        lines.extend(tag_container_instance(region));
        lines.extend(self.extra_commands.iter().cloned());
        lines.push(self.signal());

        Ok(BootScript { lines })
    }

    fn signal(&self) -> String {
        format!(
            "/opt/aws/bin/cfn-signal -e $? --stack {} --resource {} --region {}",
            self.context.stack_name(),
            self.signal_target.logical_id(),
            self.context.region()
        )
    }
}

fn install_tooling(region: &str) -> Vec<String> {
    vec![
        "yum update -y".to_string(),
        "yum install -y aws-cfn-bootstrap aws-cli jq".to_string(),
        format!(
            "yum install -y https://amazon-ssm-{region}.s3.amazonaws.com/latest/linux_amd64/amazon-ssm-agent.rpm"
        ),
    ]
}

// The agent unit waits on cloud-final, which waits on this script.
fn reload_agent_unit() -> Vec<String> {
    vec![
        r#"sed -i "/After=cloud-final.service/d" /usr/lib/systemd/system/ecs.service"#.to_string(),
        "systemctl daemon-reload".to_string(),
        "exec 2>>/var/log/ecs-agent-reload.log".to_string(),
    ]
}

fn agent_config(cluster: &str) -> Vec<String> {
    let drivers = LOGGING_DRIVERS
        .iter()
        .map(|d| format!("\"{d}\""))
        .collect::<Vec<_>>()
        .join(",");

    vec![
        format!("echo ECS_CLUSTER={cluster} >> {ECS_CONFIG_PATH}"),
        format!("cat << EOF >> {ECS_CONFIG_PATH}"),
        format!("ECS_AVAILABLE_LOGGING_DRIVERS=[{drivers}]"),
        "ECS_ENABLE_CONTAINER_METADATA=true".to_string(),
        "ECS_ENGINE_TASK_CLEANUP_WAIT_DURATION=30m".to_string(),
        "EOF".to_string(),
    ]
}

fn set_host_name(cluster: &str, region: &str) -> Vec<String> {
    vec![
        "instance_id=$(curl -s http://169.254.169.254/latest/meta-data/instance-id)".to_string(),
        format!("host_name={cluster}--$(echo $instance_id)"),
        "hostnamectl set-hostname $host_name".to_string(),
        format!(
            "aws ec2 create-tags --region {region} --resources $instance_id --tags Key=Name,Value=$host_name"
        ),
    ]
}

// Polls until the agent has registered; there is no upper bound here, the
// creation policy timeout covers a member that never registers.
fn tag_container_instance(region: &str) -> Vec<String> {
    vec![
        "until metadata=$(curl -s --fail http://localhost:51678/v1/metadata); do sleep 1; done;"
            .to_string(),
        r#"container_instance_arn=$(echo "${metadata}" | jq -er ".ContainerInstanceArn")"#
            .to_string(),
        format!(
            "aws ec2 create-tags --region {region} --resources $instance_id --tags Key=ContainerInstanceArn,Value=$container_instance_arn"
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> DeploymentContext {
        DeploymentContext::new("us-east-1", "123456789012", "workers").unwrap()
    }

    fn asg() -> AutoScalingGroupHandle {
        AutoScalingGroupHandle::parse("FleetAutoScalingGroup").unwrap()
    }

    #[test]
    fn test_stage_order() {
        let ctx = context();
        let asg = asg();
        let script = BootScriptComposer::new(&ctx, "workers-cluster", &asg)
            .with_extra_commands(["echo hello", "docker pull app:latest"])
            .compose()
            .unwrap();

        let lines = script.lines();
        assert_eq!(lines[0], "yum update -y");
        assert_eq!(
            lines[2],
            "yum install -y https://amazon-ssm-us-east-1.s3.amazonaws.com/latest/linux_amd64/amazon-ssm-agent.rpm"
        );
        assert_eq!(lines[6], "echo ECS_CLUSTER=workers-cluster >> /etc/ecs/ecs.config");
        assert_eq!(
            lines[8],
            r#"ECS_AVAILABLE_LOGGING_DRIVERS=["json-file","awslogs","fluentd","syslog","journald","gelf","logentries","splunk"]"#
        );
        assert_eq!(lines[13], "host_name=workers-cluster--$(echo $instance_id)");

        let extra_at = lines.iter().position(|l| l == "echo hello").unwrap();
        assert_eq!(lines[extra_at + 1], "docker pull app:latest");
        assert!(lines[..extra_at]
            .iter()
            .any(|l| l.contains("Key=ContainerInstanceArn")));
        assert_eq!(extra_at + 3, lines.len());
    }

    #[test]
    fn test_signal_targets_scaling_group() {
        let ctx = context();
        let asg = asg();
        let script = BootScriptComposer::new(&ctx, "workers-cluster", &asg)
            .compose()
            .unwrap();

        assert_eq!(
            script.signal_line(),
            Some(
                "/opt/aws/bin/cfn-signal -e $? --stack workers --resource FleetAutoScalingGroup --region us-east-1"
            )
        );
    }

    #[test]
    fn test_render_and_encode() {
        let ctx = context();
        let asg = asg();
        let script = BootScriptComposer::new(&ctx, "workers-cluster", &asg)
            .compose()
            .unwrap();

        let rendered = script.render();
        assert!(rendered.starts_with("#!/bin/bash\nyum update -y\n"));
        assert_eq!(rendered.lines().count(), script.lines().len() + 1);

        let decoded = STANDARD.decode(script.encode()).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), rendered);
    }

    #[test]
    fn test_unsafe_cluster_name_rejected() {
        let ctx = context();
        let asg = asg();
        let err = BootScriptComposer::new(&ctx, "workers$(reboot)", &asg)
            .compose()
            .unwrap_err();
        assert!(matches!(err, FleetError::Template(_)));
    }

    #[test]
    fn test_extra_commands_are_verbatim() {
        let ctx = context();
        let asg = asg();
        let script = BootScriptComposer::new(&ctx, "workers-cluster", &asg)
            .with_extra_commands([r#"echo "$HOME" > /tmp/home"#])
            .compose()
            .unwrap();
        assert!(script
            .lines()
            .iter()
            .any(|l| l == r#"echo "$HOME" > /tmp/home"#));
    }
}
