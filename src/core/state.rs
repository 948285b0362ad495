use crate::error::SchedError;

pub type JobId = u64;
pub type CoreId = usize;
pub type Ticks = u64;
pub type Priority = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Waiting,
    Running(CoreId),
    Completed,
}

/// One simulated unit of work.
///
/// A `Job` is owned by exactly one structure at a time: the waiting queue while
/// `Waiting`, a [`CoreState`] while `Running`, and nobody once `Completed`.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    /// Time the job became known to the engine. Round robin moves it to the
    /// expiry time so the job sorts behind everyone already waiting.
    pub arrival_time: Ticks,
    pub service_time: Ticks,
    pub remaining_time: Ticks,
    pub waiting_time: Ticks,
    pub response_time: Option<Ticks>,
    pub turnaround_time: Option<Ticks>,
    /// Lower value = more urgent.
    pub priority: Priority,
    pub state: JobState,
    // Start of the current run, advanced every time remaining_time is settled
    dispatched_at: Option<Ticks>,
}

impl Job {
    pub fn new(id: JobId, arrival_time: Ticks, service_time: Ticks, priority: Priority) -> Self {
        Self {
            id,
            arrival_time,
            service_time,
            remaining_time: service_time,
            waiting_time: 0,
            response_time: None,
            turnaround_time: None,
            priority,
            state: JobState::Waiting,
            dispatched_at: None,
        }
    }

    /// Charges the time run since the last settle point against `remaining_time`.
    pub fn settle(&mut self, now: Ticks) {
        if let Some(started) = self.dispatched_at {
            let ran = now.saturating_sub(started);
            self.remaining_time = self.remaining_time.saturating_sub(ran);
            self.dispatched_at = Some(now);
        }
    }

    pub fn dispatch(&mut self, core: CoreId, now: Ticks) {
        debug_assert_eq!(
            self.state,
            JobState::Waiting,
            "Job {} must be waiting before dispatch",
            self.id
        );
        self.state = JobState::Running(core);
        self.dispatched_at = Some(now);
        self.response_time
            .get_or_insert(now.saturating_sub(self.arrival_time));
    }

    /// Takes the job off its core. `remaining_time` must already be settled.
    pub fn deschedule(&mut self) {
        debug_assert!(
            matches!(self.state, JobState::Running(_)),
            "Job {} descheduled while not running",
            self.id
        );
        self.state = JobState::Waiting;
        self.dispatched_at = None;
    }

    pub fn complete(&mut self, now: Ticks) {
        self.settle(now);
        self.deschedule();
        self.state = JobState::Completed;
        self.turnaround_time = Some(now.saturating_sub(self.arrival_time));
    }
}

#[derive(Debug)]
pub struct CoreState {
    pub id: CoreId,
    pub current: Option<Job>,
}

/// Fixed-size table of cores, indexed from 0.
#[derive(Debug)]
pub struct CoreTable {
    cores: Vec<CoreState>,
}

impl CoreTable {
    pub fn new(num_cores: usize) -> Self {
        Self {
            cores: (0..num_cores)
                .map(|id| CoreState { id, current: None })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cores.len()
    }

    pub fn first_idle(&self) -> Option<CoreId> {
        self.cores
            .iter()
            .find(|core| core.current.is_none())
            .map(|core| core.id)
    }

    pub fn occupant(&self, core: CoreId) -> Option<&Job> {
        self.cores.get(core).and_then(|c| c.current.as_ref())
    }

    pub fn occupant_mut(&mut self, core: CoreId) -> Option<&mut Job> {
        self.cores.get_mut(core).and_then(|c| c.current.as_mut())
    }

    pub fn occupy(&mut self, core: CoreId, job: Job) {
        let slot = &mut self.cores[core].current;
        debug_assert!(slot.is_none(), "Core {core} already running a job");
        *slot = Some(job);
    }

    pub fn vacate(&mut self, core: CoreId) -> Option<Job> {
        self.cores.get_mut(core).and_then(|c| c.current.take())
    }

    /// Checks that `core` exists and hosts a job, returning that job.
    pub fn busy(&self, core: CoreId) -> Result<&Job, SchedError> {
        let state = self.cores.get(core).ok_or(SchedError::CoreOutOfRange {
            core,
            cores: self.cores.len(),
        })?;
        state.current.as_ref().ok_or(SchedError::CoreIdle { core })
    }

    pub fn running(&self) -> impl Iterator<Item = (CoreId, &Job)> {
        self.cores
            .iter()
            .filter_map(|c| c.current.as_ref().map(|job| (c.id, job)))
    }

    pub fn running_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.cores.iter_mut().filter_map(|c| c.current.as_mut())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoreState> {
        self.cores.iter()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Job> + '_ {
        self.cores.iter_mut().filter_map(|c| c.current.take())
    }
}
