use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Settings for the run-cycle coordinator, fixed for the lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Number of registered brokers that makes the cycle "ready".
    pub max_broker_count: usize,
    /// How often the restart loop checks whether the cycle is finished.
    #[serde(with = "humantime_serde")]
    pub restart_check_interval: Duration,
    /// How often the readiness loop checks the broker count.
    #[serde(with = "humantime_serde")]
    pub broker_ready_check_interval: Duration,
    /// Countdown between detecting a finished cycle and starting the next one.
    #[serde(with = "humantime_serde")]
    pub restart_countdown: Duration,
    /// Age after which brokers that are still not done get logged.
    #[serde(with = "humantime_serde")]
    pub stall_threshold: Duration,
    #[serde(with = "humantime_serde")]
    pub stall_check_interval: Duration,
    /// Working directory the broker and simulator commands run in.
    pub base_dir: PathBuf,
    /// Script (relative to `base_dir`) that launches all brokers.
    pub broker_script: String,
    /// Entry point (relative to `base_dir`) that launches the simulator.
    pub simulator_file: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_broker_count: 3,
            restart_check_interval: Duration::from_secs(1),
            broker_ready_check_interval: Duration::from_secs(1),
            restart_countdown: Duration::from_secs(10),
            stall_threshold: Duration::from_secs(3 * 60),
            stall_check_interval: Duration::from_secs(5 * 60),
            base_dir: PathBuf::from("."),
            broker_script: "scripts/broker.sh".into(),
            simulator_file: "scripts/simulator.sh".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerRecord {
    pub done: bool,
}

/// Broker id (the broker's port) to its record.
pub type BrokerMap = BTreeMap<String, BrokerRecord>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulatorPhase {
    #[default]
    Waiting,
    Running,
    Done,
}

impl SimulatorPhase {
    pub fn message(self) -> &'static str {
        match self {
            SimulatorPhase::Waiting => "Waiting for broker to be ready",
            SimulatorPhase::Running => "Simulator is running",
            SimulatorPhase::Done => "Simulator is done",
        }
    }
}

/// Read-only view of the current cycle, as served by `GET /get_server`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub simulator_status: String,
    pub simulator_phase: SimulatorPhase,
    pub rerun_times: u64,
    pub broker_counts: usize,
    pub brokers: BrokerMap,
    /// Seconds since the current cycle's broker launch began.
    pub uptime: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}
