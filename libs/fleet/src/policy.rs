//! Rolling update and boot signal policy for the scaling group.

use std::time::Duration;

use serde_json::{json, Value};

/// Processes suspended while a rolling update is in progress.
pub const SUSPENDED_PROCESSES: [&str; 5] = [
    "HealthCheck",
    "ReplaceUnhealthy",
    "AZRebalance",
    "AlarmNotification",
    "ScheduledActions",
];

/// How long a new member has to report boot completion.
pub const BOOT_SIGNAL_TIMEOUT: Duration = Duration::from_secs(7 * 60);

/// Rolling update behaviour, derived from the fleet's minimum capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePolicy {
    min_in_service: u32,
    max_batch_size: u32,
    boot_signal_timeout: Duration,
}

impl UpdatePolicy {
    /// Derive the policy from `minCapacity`. Absent or zero means 1.
    pub fn from_min_capacity(min_capacity: Option<u32>) -> Self {
        Self {
            min_in_service: min_capacity.filter(|m| *m > 0).unwrap_or(1),
            max_batch_size: 1,
            boot_signal_timeout: BOOT_SIGNAL_TIMEOUT,
        }
    }

    pub fn min_in_service(&self) -> u32 {
        self.min_in_service
    }

    pub fn max_batch_size(&self) -> u32 {
        self.max_batch_size
    }

    /// Signals the orchestrator waits for on creation.
    pub fn signal_count(&self) -> u32 {
        self.min_in_service
    }

    pub fn boot_signal_timeout(&self) -> Duration {
        self.boot_signal_timeout
    }

    pub fn suspended_processes(&self) -> &'static [&'static str] {
        &SUSPENDED_PROCESSES
    }

    /// `CreationPolicy` attribute value.
    pub fn creation_policy(&self) -> Value {
        json!({
            "ResourceSignal": {
                "Count": self.signal_count(),
                "Timeout": iso8601(self.boot_signal_timeout),
            }
        })
    }

    /// `UpdatePolicy` attribute value.
    pub fn update_policy(&self) -> Value {
        json!({
            "AutoScalingRollingUpdate": {
                "MaxBatchSize": self.max_batch_size,
                "MinInstancesInService": self.min_in_service,
                "PauseTime": iso8601(self.boot_signal_timeout),
                "SuspendProcesses": SUSPENDED_PROCESSES,
                "WaitOnResourceSignals": true,
            }
        })
    }
}

/// ISO 8601 duration in whole minutes when possible, seconds otherwise.
fn iso8601(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs % 60 == 0 {
        format!("PT{}M", secs / 60)
    } else {
        format!("PT{secs}S")
    }
}
