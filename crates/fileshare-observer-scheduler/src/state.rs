use std::sync::Arc;

use fileshare_observer_core::ScanResult;

/// Where the scheduler loop currently is.
///
/// `Idle -> Scanning -> (Published | Failed) -> Idle -> ...`, ending in
/// `Stopped` once cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerPhase {
    #[default]
    Idle,
    Scanning,
    Published,
    Failed,
    Stopped,
}

impl SchedulerPhase {
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// Observable state of a scheduler.
#[derive(Debug, Clone, Default)]
pub struct CycleState {
    /// Current phase.
    pub phase: SchedulerPhase,
    /// Result of the most recent successful cycle.
    pub last_result: Option<Arc<ScanResult>>,
    /// Error of the most recent failed cycle, cleared by the next success.
    pub last_error: Option<String>,
    /// Completed cycles, successful or not.
    pub cycles: u64,
    /// Failed cycles.
    pub failures: u64,
}

impl CycleState {
    /// Whether the loop is currently inside a scan.
    pub fn is_running(&self) -> bool {
        self.phase == SchedulerPhase::Scanning
    }
}
