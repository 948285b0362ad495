//! Call-sequence facade for drivers that speak the classic
//! start_up / new_job / job_finished / quantum_expired / clean_up protocol.
//!
//! Every call outside the started window fails with an explicit error instead
//! of touching state.

use log::warn;

use super::{
    driver::SchedCore,
    state::{CoreId, JobId, Priority, Ticks},
};
use crate::{error::SchedError, scheduler::Discipline};

#[derive(Debug, Default)]
enum Lifecycle {
    #[default]
    Uninitialised,
    Running(SchedCore),
    ShutDown,
}

#[derive(Debug, Default)]
pub struct SchedulerHandle {
    state: Lifecycle,
}

impl SchedulerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_up(&mut self, cores: usize, discipline: Discipline) -> Result<(), SchedError> {
        match self.state {
            Lifecycle::Uninitialised => {
                self.state = Lifecycle::Running(SchedCore::new(cores, discipline)?);
                Ok(())
            }
            Lifecycle::Running(_) => Err(rejected("start_up", SchedError::AlreadyStarted)),
            Lifecycle::ShutDown => Err(rejected("start_up", SchedError::ShutDown)),
        }
    }

    pub fn new_job(
        &mut self,
        id: JobId,
        time: Ticks,
        service_time: Ticks,
        priority: Priority,
    ) -> Result<Option<CoreId>, SchedError> {
        self.core_mut("new_job")?
            .new_job(id, time, service_time, priority)
            .map_err(|e| rejected("new_job", e))
    }

    pub fn job_finished(
        &mut self,
        core: CoreId,
        id: JobId,
        time: Ticks,
    ) -> Result<Option<JobId>, SchedError> {
        self.core_mut("job_finished")?
            .job_finished(core, id, time)
            .map_err(|e| rejected("job_finished", e))
    }

    pub fn quantum_expired(&mut self, core: CoreId, time: Ticks) -> Result<Option<JobId>, SchedError> {
        self.core_mut("quantum_expired")?
            .quantum_expired(core, time)
            .map_err(|e| rejected("quantum_expired", e))
    }

    pub fn average_waiting_time(&self) -> Result<f64, SchedError> {
        Ok(self.core("average_waiting_time")?.average_waiting_time())
    }

    pub fn average_turnaround_time(&self) -> Result<f64, SchedError> {
        Ok(self.core("average_turnaround_time")?.average_turnaround_time())
    }

    pub fn average_response_time(&self) -> Result<f64, SchedError> {
        Ok(self.core("average_response_time")?.average_response_time())
    }

    pub fn show_queue(&self) -> Result<String, SchedError> {
        Ok(self.core("show_queue")?.show_queue())
    }

    /// Tears the engine down. Returns the number of jobs that never finished.
    pub fn clean_up(&mut self) -> Result<usize, SchedError> {
        match std::mem::replace(&mut self.state, Lifecycle::ShutDown) {
            Lifecycle::Running(core) => Ok(core.shutdown()),
            Lifecycle::Uninitialised => {
                self.state = Lifecycle::Uninitialised;
                Err(rejected("clean_up", SchedError::NotStarted))
            }
            Lifecycle::ShutDown => Err(rejected("clean_up", SchedError::ShutDown)),
        }
    }

    pub fn engine(&self) -> Option<&SchedCore> {
        match &self.state {
            Lifecycle::Running(core) => Some(core),
            _ => None,
        }
    }

    fn core(&self, call: &str) -> Result<&SchedCore, SchedError> {
        match &self.state {
            Lifecycle::Running(core) => Ok(core),
            Lifecycle::Uninitialised => Err(rejected(call, SchedError::NotStarted)),
            Lifecycle::ShutDown => Err(rejected(call, SchedError::ShutDown)),
        }
    }

    fn core_mut(&mut self, call: &str) -> Result<&mut SchedCore, SchedError> {
        match &mut self.state {
            Lifecycle::Running(core) => Ok(core),
            Lifecycle::Uninitialised => Err(rejected(call, SchedError::NotStarted)),
            Lifecycle::ShutDown => Err(rejected(call, SchedError::ShutDown)),
        }
    }
}

fn rejected(call: &str, err: SchedError) -> SchedError {
    warn!("{call} rejected: {err}");
    err
}
