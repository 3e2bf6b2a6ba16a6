//! Run-cycle coordinator.
//!
//! Owns the broker map and simulator phase for the current cycle and drives
//! the readiness, restart and stall-monitor loops. HTTP handlers and loops
//! share one `Arc<Coordinator>`; every piece of cycle state sits behind a
//! single mutex that is never held across an await point.

use super::simulator::SimulatorTracker;
use crate::launcher::{in_dir, Launcher};
use crate::model::{BrokerMap, BrokerRecord, CoordinatorConfig, Snapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct CycleState {
    brokers: BrokerMap,
    simulator: SimulatorTracker,
    rerun_count: u64,
    started_at: Option<Instant>,
    /// Set once this cycle's readiness loop has made its simulator launch attempt.
    readiness_settled: bool,
    last_failure: Option<String>,
}

impl CycleState {
    fn is_ready(&self, max: usize) -> bool {
        self.brokers.len() >= max
    }

    fn uptime(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    fn next_cycle(&mut self) {
        self.brokers.clear();
        self.rerun_count += 1;
        self.simulator.set_waiting();
        self.readiness_settled = false;
    }
}

pub(crate) struct Coordinator {
    cfg: CoordinatorConfig,
    launcher: Box<dyn Launcher>,
    state: Mutex<CycleState>,
    loops_spawned: AtomicBool,
    cancel: CancellationToken,
}

impl Coordinator {
    pub fn new(cfg: CoordinatorConfig, launcher: Box<dyn Launcher>) -> Arc<Self> {
        Arc::new(Self {
            cfg,
            launcher,
            state: Mutex::new(CycleState::default()),
            loops_spawned: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        })
    }

    fn state(&self) -> MutexGuard<'_, CycleState> {
        // Every write leaves the state consistent, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Snapshot {
        let s = self.state();
        let (phase, message) = s.simulator.status();
        Snapshot {
            simulator_status: message.to_string(),
            simulator_phase: phase,
            rerun_times: s.rerun_count,
            broker_counts: s.brokers.len(),
            brokers: s.brokers.clone(),
            uptime: s.uptime().as_secs_f64(),
            last_failure: s.last_failure.clone(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_ready(self.cfg.max_broker_count)
    }

    /// Register (or re-register) a broker as not done. Returns the broker map.
    pub fn register_broker(&self, id: &str) -> BrokerMap {
        let mut s = self.state();
        s.brokers.insert(id.to_string(), BrokerRecord { done: false });
        info!(broker = id, count = s.brokers.len(), "broker registered");
        s.brokers.clone()
    }

    /// Mark a broker done, creating it if it never registered. Returns the broker map.
    pub fn mark_broker_done(&self, id: &str) -> BrokerMap {
        let mut s = self.state();
        s.brokers.insert(id.to_string(), BrokerRecord { done: true });
        info!(broker = id, "broker done");
        s.brokers.clone()
    }

    pub fn mark_simulator_done(&self) {
        self.state().simulator.set_done();
        info!("simulator done");
    }

    /// Begin a cycle. Returns immediately; the restart and stall-monitor loops
    /// are spawned on the first call only.
    pub fn start(self: &Arc<Self>) {
        self.start_cycle();
        if !self.loops_spawned.swap(true, Ordering::SeqCst) {
            tokio::spawn(Arc::clone(self).wait_to_restart());
            tokio::spawn(Arc::clone(self).monitor_stalled());
        }
    }

    /// Stop every background loop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Brokers not yet done in a cycle older than the stall threshold.
    pub fn stalled_brokers(&self) -> Vec<String> {
        let s = self.state();
        if s.started_at.is_none() || s.uptime() <= self.cfg.stall_threshold {
            return Vec::new();
        }
        s.brokers
            .iter()
            .filter(|(_, b)| !b.done)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn start_cycle(self: &Arc<Self>) {
        let rerun = {
            let mut s = self.state();
            s.started_at = Some(Instant::now());
            s.rerun_count
        };
        let command = in_dir(&self.cfg.base_dir, &self.cfg.broker_script);
        info!(rerun, %command, "launching brokers");
        match self.launcher.launch(&command) {
            Ok(()) => {
                tokio::spawn(Arc::clone(self).wait_brokers_ready());
            }
            Err(e) => {
                error!(rerun, error = %format!("{e:#}"), "failed to run broker");
                self.state().last_failure = Some(format!("failed to run broker: {e:#}"));
            }
        }
    }

    /// Sleep for `period` unless shut down first. Returns false on shutdown.
    async fn pause(&self, period: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(period) => true,
        }
    }

    async fn wait_brokers_ready(self: Arc<Self>) {
        self.state().simulator.set_waiting();
        loop {
            if self.try_launch_simulator() {
                return;
            }
            if !self.pause(self.cfg.broker_ready_check_interval).await {
                return;
            }
        }
    }

    /// Launch the simulator if the brokers are ready. Returns true once the
    /// single launch attempt for this cycle has been made. The cycle lock is
    /// released while the launcher spawns the process.
    fn try_launch_simulator(&self) -> bool {
        let rerun = {
            let s = self.state();
            if !s.is_ready(self.cfg.max_broker_count) {
                debug!(count = s.brokers.len(), "waiting for brokers to be ready");
                return false;
            }
            s.rerun_count
        };
        let command = SimulatorTracker::command(&self.cfg.base_dir, &self.cfg.simulator_file);
        let launched = self.launcher.launch(&command);

        let outcome = {
            let mut s = self.state();
            let outcome = s.simulator.record_launch(launched);
            if let Err(e) = &outcome {
                s.last_failure = Some(format!("failed to run simulator: {e:#}"));
            }
            s.readiness_settled = true;
            outcome
        };
        match outcome {
            Ok(()) => info!(rerun, "simulator launched"),
            Err(e) => error!(rerun, error = %format!("{e:#}"), "failed to run simulator"),
        }
        true
    }

    /// A cycle is finished when every expected broker has reported done and
    /// the simulator is no longer running (done, or its launch failed).
    fn restart_due(&self) -> bool {
        let s = self.state();
        s.is_ready(self.cfg.max_broker_count)
            && s.brokers.values().all(|b| b.done)
            && s.readiness_settled
            && !s.simulator.is_running()
    }

    async fn wait_to_restart(self: Arc<Self>) {
        loop {
            if self.restart_due() && !self.restart().await {
                return;
            }
            if !self.pause(self.cfg.restart_check_interval).await {
                return;
            }
        }
    }

    /// Count down, reset the cycle state and start the next cycle.
    /// Returns false if shut down during the countdown.
    async fn restart(self: &Arc<Self>) -> bool {
        let mut remaining = self.cfg.restart_countdown;
        while !remaining.is_zero() {
            info!(remaining_secs = remaining.as_secs_f64().ceil() as u64, "restarting");
            let step = remaining.min(Duration::from_secs(1));
            if !self.pause(step).await {
                return false;
            }
            remaining = remaining.saturating_sub(step);
        }
        let rerun = {
            let mut s = self.state();
            s.next_cycle();
            s.rerun_count
        };
        info!(rerun, "starting next cycle");
        self.start_cycle();
        true
    }

    async fn monitor_stalled(self: Arc<Self>) {
        loop {
            let stalled = self.stalled_brokers();
            if !stalled.is_empty() {
                let rerun = self.state().rerun_count;
                for broker in &stalled {
                    warn!(rerun, broker = %broker, "broker is not done");
                }
            }
            if !self.pause(self.cfg.stall_check_interval).await {
                return;
            }
        }
    }
}
