//! Simulator lifecycle within one cycle.

use crate::launcher::in_dir;
use crate::model::SimulatorPhase;
use anyhow::Result;
use std::path::Path;

/// Tracks the simulator phase. Transitions are unconditional; callers decide
/// when they are valid.
#[derive(Debug, Default)]
pub(crate) struct SimulatorTracker {
    phase: SimulatorPhase,
}

impl SimulatorTracker {
    pub fn status(&self) -> (SimulatorPhase, &'static str) {
        (self.phase, self.phase.message())
    }

    pub fn is_running(&self) -> bool {
        self.phase == SimulatorPhase::Running
    }

    pub fn set_waiting(&mut self) {
        self.phase = SimulatorPhase::Waiting;
    }

    pub fn set_running(&mut self) {
        self.phase = SimulatorPhase::Running;
    }

    pub fn set_done(&mut self) {
        self.phase = SimulatorPhase::Done;
    }

    /// Command line that starts the simulator from `base_dir`.
    pub fn command(base_dir: &Path, simulator_file: &str) -> String {
        in_dir(base_dir, simulator_file)
    }

    /// Apply a launch outcome. The phase only advances to Running when the
    /// launch succeeded; on failure it is left as is and the error is returned.
    pub fn record_launch(&mut self, launched: Result<()>) -> Result<()> {
        launched?;
        self.set_running();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::path::PathBuf;

    #[test]
    fn starts_waiting() {
        let t = SimulatorTracker::default();
        assert_eq!(
            t.status(),
            (SimulatorPhase::Waiting, "Waiting for broker to be ready")
        );
        assert!(!t.is_running());
    }

    #[test]
    fn transitions_are_unconditional() {
        let mut t = SimulatorTracker::default();
        t.set_done();
        assert_eq!(t.status(), (SimulatorPhase::Done, "Simulator is done"));
        t.set_running();
        assert_eq!(t.status(), (SimulatorPhase::Running, "Simulator is running"));
        assert!(t.is_running());
        t.set_waiting();
        assert_eq!(t.status().0, SimulatorPhase::Waiting);
    }

    #[test]
    fn command_runs_from_base_dir() {
        assert_eq!(
            SimulatorTracker::command(&PathBuf::from("/opt/sim"), "cmd/simulator"),
            "cd /opt/sim && cmd/simulator"
        );
    }

    #[test]
    fn successful_launch_marks_running() {
        let mut t = SimulatorTracker::default();
        t.record_launch(Ok(())).unwrap();
        assert!(t.is_running());
    }

    #[test]
    fn failed_launch_keeps_phase() {
        let mut t = SimulatorTracker::default();
        let err = t.record_launch(Err(anyhow!("spawn refused"))).unwrap_err();
        assert_eq!(err.to_string(), "spawn refused");
        assert_eq!(t.status().0, SimulatorPhase::Waiting);

        t.set_done();
        assert!(t.record_launch(Err(anyhow!("spawn refused"))).is_err());
        assert_eq!(t.status().0, SimulatorPhase::Done);
    }
}
