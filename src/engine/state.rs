use std::sync::Mutex;
use std::sync::mpsc::Sender;
use strum_macros::Display;

use super::messages::JobEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum JobPhase {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl JobPhase {
    pub fn is_idle(self) -> bool {
        self == JobPhase::Idle
    }
}

pub(crate) fn read_phase(cell: &Mutex<JobPhase>) -> JobPhase {
    *cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_phase(cell: &Mutex<JobPhase>, phase: JobPhase) {
    let mut guard = cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    #[cfg(debug_assertions)]
    if crate::config::DF.log_job_state && *guard != phase {
        log::info!("JOB: {} -> {}", *guard, phase);
    }
    *guard = phase;
}

/// Holds the job lock for the lifetime of one training run.
///
/// Dropping the guard is the only way back to `Idle`, so every exit path
/// (return, error, panic, cancelled future) unlocks and reports `Reset`.
pub(crate) struct PhaseGuard<'a> {
    cell: &'a Mutex<JobPhase>,
    events: &'a Sender<JobEvent>,
}

impl<'a> PhaseGuard<'a> {
    /// `Idle -> Running`, or `None` if another job holds the lock.
    pub fn begin(cell: &'a Mutex<JobPhase>, events: &'a Sender<JobEvent>) -> Option<Self> {
        let mut guard = cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !guard.is_idle() {
            return None;
        }
        *guard = JobPhase::Running;
        drop(guard);

        #[cfg(debug_assertions)]
        if crate::config::DF.log_job_state {
            log::info!("JOB: {} -> {}", JobPhase::Idle, JobPhase::Running);
        }
        Some(Self { cell, events })
    }

    pub fn set(&self, phase: JobPhase) {
        write_phase(self.cell, phase);
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        write_phase(self.cell, JobPhase::Idle);
        let _ = self.events.send(JobEvent::Reset);
    }
}
