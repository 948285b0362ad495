use super::job::{Job, JobInstance};
use crate::{
    core::{CoreId, JobId, SchedCore, SchedCoreEvent, Ticks},
    error::SchedError,
    scheduler::Discipline,
};
use log::debug;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy)]
struct Slot {
    job: JobId,
    slice_left: Option<Ticks>,
}

/// Tick-stepped driver for [`SchedCore`].
///
/// Plays the simulated hardware: it runs whatever the engine placed on each
/// core for one tick at a time, owns the round-robin quantum, and at every
/// tick reports completions, then quantum expirations, then arrivals.
pub struct Sim {
    pub core: SchedCore,
    pub jobs: Vec<JobInstance>,
    job_cursor: usize,
    // JobId --> jobs[index]; used to stamp start/completion on the JobInstance
    ids_to_jobs: FxHashMap<JobId, usize>,
    // Work left per arrived, unfinished job
    remaining: FxHashMap<JobId, Ticks>,
    slots: Vec<Option<Slot>>,
    quantum: Option<Ticks>,
    now: Ticks,
}

impl Sim {
    pub fn new(
        mut jobs: Vec<Job>,
        num_cores: usize,
        discipline: Discipline,
        quantum: Option<Ticks>,
    ) -> Result<Self, SchedError> {
        let core = SchedCore::new(num_cores, discipline)?;
        jobs.sort_by(|a, b| {
            a.arrival_time
                .cmp(&b.arrival_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        let ids_to_jobs = jobs
            .iter()
            .enumerate()
            .map(|(index, job)| (job.id, index))
            .collect();
        let jobs = jobs
            .into_iter()
            .map(|job| JobInstance {
                job,
                start_time: None,
                completion_time: None,
            })
            .collect();

        Ok(Self {
            core,
            jobs,
            job_cursor: 0,
            ids_to_jobs,
            remaining: FxHashMap::default(),
            slots: vec![None; num_cores],
            quantum: quantum.filter(|&q| q > 0),
            now: 0,
        })
    }

    /// Delivers this tick's events, then runs every busy core for one tick.
    pub fn step(&mut self) -> Result<Vec<SchedCoreEvent>, SchedError> {
        let now = self.now;
        self.handle_completions(now)?;
        self.handle_quantum_expiry(now)?;
        self.handle_arrivals(now)?;

        for slot in self.slots.iter_mut().flatten() {
            if let Some(left) = self.remaining.get_mut(&slot.job) {
                *left = left.saturating_sub(1);
            }
            slot.slice_left = slot.slice_left.map(|s| s.saturating_sub(1));
        }
        self.now += 1;

        Ok(self.core.take_events())
    }

    pub fn run(&mut self) -> Result<(), SchedError> {
        while !self.all_jobs_completed() {
            self.step()?;
        }
        Ok(())
    }

    fn handle_completions(&mut self, now: Ticks) -> Result<(), SchedError> {
        for cpu in 0..self.slots.len() {
            let Some(slot) = self.slots[cpu] else {
                continue;
            };
            if self.remaining.get(&slot.job).is_some_and(|&left| left > 0) {
                continue;
            }

            self.remaining.remove(&slot.job);
            self.slots[cpu] = None;
            if let Some(&index) = self.ids_to_jobs.get(&slot.job) {
                self.jobs[index].completion_time = Some(now);
            }

            if let Some(next) = self.core.job_finished(cpu, slot.job, now)? {
                self.place(cpu, next, now);
            }
        }
        Ok(())
    }

    fn handle_quantum_expiry(&mut self, now: Ticks) -> Result<(), SchedError> {
        let Some(quantum) = self.quantum else {
            return Ok(());
        };

        for cpu in 0..self.slots.len() {
            let Some(slot) = self.slots[cpu] else {
                continue;
            };
            if slot.slice_left != Some(0) {
                continue;
            }

            match self.core.quantum_expired(cpu, now)? {
                Some(next) => self.place(cpu, next, now),
                None => {
                    self.slots[cpu] = Some(Slot {
                        job: slot.job,
                        slice_left: Some(quantum),
                    })
                }
            }
        }
        Ok(())
    }

    fn handle_arrivals(&mut self, now: Ticks) -> Result<(), SchedError> {
        // Contiguous, since jobs are sorted by arrival
        while let Some(instance) = self.jobs.get(self.job_cursor) {
            if instance.job.arrival_time > now {
                break;
            }
            let Job {
                id,
                run_time,
                priority,
                ..
            } = instance.job;
            self.job_cursor += 1;
            self.remaining.insert(id, run_time);

            if let Some(cpu) = self.core.new_job(id, now, run_time, priority)? {
                if let Some(displaced) = self.slots[cpu] {
                    debug!("t={now} job {id} displaces job {} on core {cpu}", displaced.job);
                }
                self.place(cpu, id, now);
            }
        }
        Ok(())
    }

    fn place(&mut self, cpu: CoreId, job: JobId, now: Ticks) {
        self.slots[cpu] = Some(Slot {
            job,
            slice_left: self.quantum,
        });
        if let Some(&index) = self.ids_to_jobs.get(&job) {
            self.jobs[index].start_time.get_or_insert(now);
        }
    }

    pub fn now(&self) -> Ticks {
        self.now
    }

    pub fn running_on(&self, cpu: CoreId) -> Option<JobId> {
        self.slots.get(cpu).copied().flatten().map(|slot| slot.job)
    }

    pub fn all_jobs_completed(&self) -> bool {
        self.jobs.iter().all(|job| job.completion_time.is_some())
    }

    pub fn jobs_map<'a>(
        &'a self,
        f: impl Fn(&JobInstance) -> Option<Ticks> + 'a,
    ) -> impl Iterator<Item = f64> + 'a {
        self.jobs.iter().filter_map(move |job| f(job).map(|t| t as f64))
    }
}
