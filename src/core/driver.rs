use log::{debug, trace};
use rustc_hash::FxHashSet;

use super::{
    event::SchedCoreEvent,
    observer::Observer,
    queue::WaitQueue,
    state::{CoreId, CoreTable, Job, JobId, JobState, Priority, Ticks},
};
use crate::{
    error::SchedError,
    scheduler::{Discipline, select_victim},
};

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    completed: u64,
    waiting: f64,
    turnaround: f64,
    response: f64,
}

impl Totals {
    fn record(&mut self, job: &Job) {
        self.completed += 1;
        self.waiting += job.waiting_time as f64;
        self.turnaround += job.turnaround_time.unwrap_or_default() as f64;
        self.response += job.response_time.unwrap_or_default() as f64;
    }

    fn mean(&self, total: f64) -> f64 {
        if self.completed == 0 {
            0.0
        } else {
            total / self.completed as f64
        }
    }
}

/// The scheduling decision engine.
///
/// The driver reports arrivals, completions and quantum expirations in
/// non-decreasing time order; each call returns which job (if any) should now
/// occupy the affected core.
#[derive(Debug)]
pub struct SchedCore {
    discipline: Discipline,
    cores: CoreTable,
    waiting: WaitQueue,
    live: FxHashSet<JobId>,
    previous_event_time: Ticks,
    totals: Totals,
    events: Vec<SchedCoreEvent>,
    observer: Observer,
}

impl SchedCore {
    pub fn new(num_cores: usize, discipline: Discipline) -> Result<Self, SchedError> {
        if num_cores == 0 {
            return Err(SchedError::NoCores);
        }
        debug!("starting {discipline} scheduler on {num_cores} cores");

        Ok(Self {
            discipline,
            cores: CoreTable::new(num_cores),
            waiting: WaitQueue::new(discipline),
            live: FxHashSet::default(),
            previous_event_time: 0,
            totals: Totals::default(),
            events: Vec::new(),
            observer: Observer::new(),
        })
    }

    /// Handles a job arrival, returning the core it should run on.
    ///
    /// The returned core may already be running something, in which case the
    /// arriving job preempts it.
    pub fn new_job(
        &mut self,
        id: JobId,
        time: Ticks,
        service_time: Ticks,
        priority: Priority,
    ) -> Result<Option<CoreId>, SchedError> {
        self.check_time(time)?;
        if self.live.contains(&id) {
            return Err(SchedError::DuplicateJob(id));
        }
        self.update_times(time);

        let job = Job::new(id, time, service_time, priority);
        self.live.insert(id);

        let decision = if let Some(core) = self.cores.first_idle() {
            debug!("t={time} job {id} -> idle core {core}");
            self.dispatch(core, job, time);
            Some(core)
        } else if let Some(core) = select_victim(self.discipline, self.cores.running(), &job) {
            self.preempt(core, job, time);
            Some(core)
        } else {
            let rank = self.enqueue(job);
            debug!("t={time} job {id} queued at rank {rank}");
            None
        };

        self.finish_event(true);
        Ok(decision)
    }

    /// Handles completion of the job on `core`, returning the job that takes
    /// the core over, or `None` if it should idle.
    pub fn job_finished(
        &mut self,
        core: CoreId,
        id: JobId,
        time: Ticks,
    ) -> Result<Option<JobId>, SchedError> {
        self.check_time(time)?;
        let found = self.cores.busy(core)?.id;
        if found != id {
            return Err(SchedError::JobMismatch {
                core,
                expected: id,
                found,
            });
        }
        self.update_times(time);

        if let Some(mut job) = self.cores.vacate(core) {
            job.complete(time);
            self.totals.record(&job);
            self.live.remove(&job.id);
            debug!(
                "t={time} job {id} done on core {core}: wait={} turnaround={} response={}",
                job.waiting_time,
                job.turnaround_time.unwrap_or_default(),
                job.response_time.unwrap_or_default()
            );
            self.events.push(SchedCoreEvent::JobStateChange {
                job: id,
                from: JobState::Running(core),
                to: JobState::Completed,
            });
            self.events.push(SchedCoreEvent::CoreCurrentChange {
                core,
                from: Some(id),
                to: None,
            });
        }

        let next = self.dispatch_next(core, time);
        self.finish_event(false);
        Ok(next)
    }

    /// Handles a round-robin quantum expiry on `core`.
    ///
    /// The expiring job's `arrival_time` moves to `time`, sending it to the
    /// back of the line; turnaround is later measured from that point.
    /// Returns the job to switch to. `None` means the current job keeps the
    /// core, either because nobody is waiting or because the discipline is
    /// not round robin.
    pub fn quantum_expired(
        &mut self,
        core: CoreId,
        time: Ticks,
    ) -> Result<Option<JobId>, SchedError> {
        self.check_time(time)?;
        let id = self.cores.busy(core)?.id;
        if self.discipline != Discipline::Rr {
            debug!("t={time} quantum expiry ignored under {}", self.discipline);
            return Ok(None);
        }
        self.update_times(time);

        if self.waiting.is_empty() {
            if let Some(job) = self.cores.occupant_mut(core) {
                job.arrival_time = time;
            }
            debug!("t={time} job {id} keeps core {core}, nobody waiting");
            self.events
                .push(SchedCoreEvent::QuantumRenewed { core, job: id });
            self.finish_event(false);
            return Ok(None);
        }

        if let Some(mut job) = self.cores.vacate(core) {
            job.deschedule();
            job.arrival_time = time;
            self.events.push(SchedCoreEvent::JobStateChange {
                job: id,
                from: JobState::Running(core),
                to: JobState::Waiting,
            });
            self.events.push(SchedCoreEvent::CoreCurrentChange {
                core,
                from: Some(id),
                to: None,
            });
            let rank = self.enqueue(job);
            debug!("t={time} job {id} requeued at rank {rank}");
        }

        let next = self.dispatch_next(core, time);
        self.finish_event(false);
        Ok(next)
    }

    pub fn average_waiting_time(&self) -> f64 {
        self.totals.mean(self.totals.waiting)
    }

    pub fn average_turnaround_time(&self) -> f64 {
        self.totals.mean(self.totals.turnaround)
    }

    pub fn average_response_time(&self) -> f64 {
        self.totals.mean(self.totals.response)
    }

    pub fn completed(&self) -> u64 {
        self.totals.completed
    }

    /// Releases every resident job, returning how many had not completed.
    pub fn shutdown(mut self) -> usize {
        let abandoned = self.cores.drain().count() + self.waiting.drain().count();
        if abandoned > 0 {
            debug!("shutting down with {abandoned} unfinished jobs");
        }
        abandoned
    }

    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    pub fn num_cores(&self) -> usize {
        self.cores.len()
    }

    pub fn now(&self) -> Ticks {
        self.previous_event_time
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    pub fn waiting(&self) -> &WaitQueue {
        &self.waiting
    }

    pub fn core_occupant(&self, core: CoreId) -> Option<JobId> {
        self.cores.occupant(core).map(|job| job.id)
    }

    /// Looks up a resident job, waiting or running.
    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.cores
            .running()
            .map(|(_, job)| job)
            .chain(self.waiting.iter())
            .find(|job| job.id == id)
    }

    /// Renders every resident job in scheduling order as `id(core)`, with
    /// `-1` for jobs still waiting, e.g. `2(-1) 4(0) 1(-1)`.
    pub fn show_queue(&self) -> String {
        let mut resident: Vec<(&Job, Option<CoreId>)> = self
            .waiting
            .iter()
            .map(|job| (job, None))
            .chain(self.cores.running().map(|(core, job)| (job, Some(core))))
            .collect();
        resident.sort_by(|(a, _), (b, _)| self.discipline.compare(a, b));

        resident
            .iter()
            .map(|(job, core)| match core {
                Some(core) => format!("{}({core})", job.id),
                None => format!("{}(-1)", job.id),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn take_events(&mut self) -> Vec<SchedCoreEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    fn check_time(&self, time: Ticks) -> Result<(), SchedError> {
        if time < self.previous_event_time {
            return Err(SchedError::TimeWentBackwards {
                previous: self.previous_event_time,
                now: time,
            });
        }
        Ok(())
    }

    // Charges elapsed time to waiting jobs and settles running ones
    fn update_times(&mut self, time: Ticks) {
        let delta = time - self.previous_event_time;
        self.previous_event_time = time;
        if delta == 0 {
            return;
        }

        for job in self.waiting.iter_mut() {
            job.waiting_time += delta;
        }
        for job in self.cores.running_mut() {
            job.settle(time);
        }
    }

    fn enqueue(&mut self, mut job: Job) -> usize {
        job.state = JobState::Waiting;
        self.waiting.insert(job)
    }

    fn dispatch(&mut self, core: CoreId, mut job: Job, time: Ticks) {
        let id = job.id;
        job.dispatch(core, time);
        self.cores.occupy(core, job);
        self.events.push(SchedCoreEvent::JobStateChange {
            job: id,
            from: JobState::Waiting,
            to: JobState::Running(core),
        });
        self.events.push(SchedCoreEvent::CoreCurrentChange {
            core,
            from: None,
            to: Some(id),
        });
    }

    fn dispatch_next(&mut self, core: CoreId, time: Ticks) -> Option<JobId> {
        let next = self.waiting.pop_front()?;
        let id = next.id;
        debug!("t={time} job {id} -> core {core} after {} waiting", next.waiting_time);
        self.dispatch(core, next, time);
        Some(id)
    }

    fn preempt(&mut self, core: CoreId, job: Job, time: Ticks) {
        let Some(mut victim) = self.cores.vacate(core) else {
            return;
        };
        let (victim_id, by) = (victim.id, job.id);
        debug!(
            "t={time} job {by} preempts job {victim_id} on core {core} ({} left)",
            victim.remaining_time
        );

        victim.deschedule();
        self.events.push(SchedCoreEvent::Preempted {
            core,
            victim: victim_id,
            by,
        });
        self.events.push(SchedCoreEvent::JobStateChange {
            job: victim_id,
            from: JobState::Running(core),
            to: JobState::Waiting,
        });
        self.events.push(SchedCoreEvent::CoreCurrentChange {
            core,
            from: Some(victim_id),
            to: None,
        });
        self.enqueue(victim);
        self.dispatch(core, job, time);
    }

    fn finish_event(&mut self, after_arrival: bool) {
        self.observer
            .observe(&self.cores, &self.waiting, &self.live, after_arrival);
        trace!("queue: {}", self.show_queue());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(cores: usize, discipline: Discipline) -> SchedCore {
        SchedCore::new(cores, discipline).expect("valid configuration")
    }

    #[test]
    fn rejects_zero_cores() {
        assert_eq!(
            SchedCore::new(0, Discipline::Fcfs).err(),
            Some(SchedError::NoCores)
        );
    }

    #[test]
    fn fcfs_single_core() {
        let mut s = engine(1, Discipline::Fcfs);
        assert_eq!(s.new_job(1, 0, 5, 0), Ok(Some(0)));
        assert_eq!(s.new_job(2, 1, 3, 0), Ok(None));
        assert_eq!(s.job_finished(0, 1, 5), Ok(Some(2)));
        assert_eq!(s.job_finished(0, 2, 8), Ok(None));

        assert_eq!(s.completed(), 2);
        // job 2 waited 1..5
        assert_eq!(s.average_waiting_time(), 2.0);
        assert_eq!(s.average_turnaround_time(), (5.0 + 7.0) / 2.0);
        assert_eq!(s.average_response_time(), 2.0);
        assert_eq!(s.observer().steps(), 4);
    }

    #[test]
    fn lowest_idle_core_first() {
        let mut s = engine(3, Discipline::Fcfs);
        assert_eq!(s.new_job(1, 0, 5, 0), Ok(Some(0)));
        assert_eq!(s.new_job(2, 1, 5, 0), Ok(Some(1)));
        assert_eq!(s.job_finished(0, 1, 2), Ok(None));
        assert_eq!(s.new_job(3, 3, 5, 0), Ok(Some(0)));
        assert_eq!(s.new_job(4, 4, 5, 0), Ok(Some(2)));
        assert_eq!(s.new_job(5, 5, 5, 0), Ok(None));
    }

    #[test]
    fn sjf_picks_shortest_waiting() {
        let mut s = engine(1, Discipline::Sjf);
        s.new_job(1, 0, 10, 0).ok();
        assert_eq!(s.new_job(2, 1, 8, 0), Ok(None));
        assert_eq!(s.new_job(3, 2, 2, 0), Ok(None));
        assert_eq!(s.new_job(4, 3, 8, 0), Ok(None));
        assert_eq!(s.job_finished(0, 1, 10), Ok(Some(3)));
        assert_eq!(s.job_finished(0, 3, 12), Ok(Some(2)));
        assert_eq!(s.job_finished(0, 2, 20), Ok(Some(4)));
    }

    #[test]
    fn psjf_preempts_on_remaining_time() {
        let mut s = engine(1, Discipline::Psjf);
        assert_eq!(s.new_job(1, 0, 10, 0), Ok(Some(0)));
        assert_eq!(s.new_job(2, 1, 2, 0), Ok(Some(0)));
        assert_eq!(s.job(1).map(|j| j.remaining_time), Some(9));
        assert_eq!(s.job(1).map(|j| j.state), Some(JobState::Waiting));
        assert_eq!(s.job_finished(0, 2, 3), Ok(Some(1)));
        assert_eq!(s.job(1).map(|j| j.waiting_time), Some(2));
    }

    #[test]
    fn psjf_does_not_preempt_on_tie() {
        let mut s = engine(1, Discipline::Psjf);
        s.new_job(1, 0, 6, 0).ok();
        // job 1 has 4 left at t=2
        assert_eq!(s.new_job(2, 2, 4, 0), Ok(None));
        assert_eq!(s.core_occupant(0), Some(1));
    }

    #[test]
    fn psjf_settles_across_resume() {
        let mut s = engine(1, Discipline::Psjf);
        s.new_job(1, 0, 10, 0).ok();
        s.new_job(2, 2, 3, 0).ok();
        assert_eq!(s.job_finished(0, 2, 5), Ok(Some(1)));
        // Job 1 ran 0..2, resumed at 5; at 9 it has 4 left.
        assert_eq!(s.new_job(3, 9, 5, 0), Ok(None));
        assert_eq!(s.new_job(4, 10, 2, 0), Ok(Some(0)));
        assert_eq!(s.job(1).map(|j| j.remaining_time), Some(3));
    }

    #[test]
    fn ppri_evicts_least_urgent() {
        let mut s = engine(2, Discipline::Ppri);
        s.new_job(1, 0, 10, 3).ok();
        s.new_job(2, 1, 10, 5).ok();
        assert_eq!(s.new_job(3, 2, 10, 4), Ok(Some(1)));
        assert_eq!(s.new_job(4, 3, 10, 6), Ok(None));
        assert_eq!(s.show_queue(), "1(0) 3(1) 2(-1) 4(-1)");

        let events = s.take_events();
        assert!(events.contains(&SchedCoreEvent::Preempted {
            core: 1,
            victim: 2,
            by: 3
        }));
        assert!(s.take_events().is_empty());
    }

    #[test]
    fn show_queue_ranks_running_jobs_in_place() {
        let mut s = engine(1, Discipline::Pri);
        s.new_job(4, 0, 10, 3).ok();
        s.new_job(2, 1, 10, 1).ok();
        s.new_job(1, 2, 10, 7).ok();
        assert_eq!(s.show_queue(), "2(-1) 4(0) 1(-1)");
    }

    #[test]
    fn pri_never_preempts() {
        let mut s = engine(1, Discipline::Pri);
        s.new_job(1, 0, 10, 9).ok();
        assert_eq!(s.new_job(2, 1, 10, 0), Ok(None));
        assert_eq!(s.new_job(3, 2, 10, 5), Ok(None));
        assert_eq!(s.job_finished(0, 1, 10), Ok(Some(2)));
    }

    #[test]
    fn rr_rotates_to_back() {
        let mut s = engine(1, Discipline::Rr);
        s.new_job(1, 0, 10, 0).ok();
        s.new_job(2, 1, 10, 0).ok();
        s.new_job(3, 2, 10, 0).ok();
        assert_eq!(s.quantum_expired(0, 3), Ok(Some(2)));
        assert_eq!(s.quantum_expired(0, 6), Ok(Some(3)));
        assert_eq!(s.quantum_expired(0, 9), Ok(Some(1)));

        let job1 = s.job(1).expect("job 1 resident");
        assert_eq!(job1.arrival_time, 3);
        assert_eq!(job1.response_time, Some(0));
        assert_eq!(job1.waiting_time, 6);
        assert_eq!(job1.remaining_time, 7);
    }

    #[test]
    fn rr_lone_job_keeps_core() {
        let mut s = engine(1, Discipline::Rr);
        s.new_job(1, 0, 4, 0).ok();
        assert_eq!(s.quantum_expired(0, 2), Ok(None));
        let job = s.job(1).expect("job 1 resident");
        assert_eq!(job.arrival_time, 2);
        assert_eq!(job.waiting_time, 0);
        assert_eq!(job.response_time, Some(0));
        assert_eq!(job.state, JobState::Running(0));

        assert_eq!(s.job_finished(0, 1, 4), Ok(None));
        // measured from the reset arrival at t=2
        assert_eq!(s.average_turnaround_time(), 2.0);
        assert_eq!(s.average_waiting_time(), 0.0);
    }

    #[test]
    fn quantum_ignored_outside_rr() {
        let mut s = engine(1, Discipline::Fcfs);
        s.new_job(1, 0, 4, 0).ok();
        s.new_job(2, 1, 4, 0).ok();
        assert_eq!(s.quantum_expired(0, 2), Ok(None));
        assert_eq!(s.core_occupant(0), Some(1));
    }

    #[test]
    fn reports_driver_mistakes() {
        let mut s = engine(2, Discipline::Fcfs);
        s.new_job(1, 0, 4, 0).ok();
        assert_eq!(
            s.job_finished(5, 1, 1),
            Err(SchedError::CoreOutOfRange { core: 5, cores: 2 })
        );
        assert_eq!(s.job_finished(1, 1, 1), Err(SchedError::CoreIdle { core: 1 }));
        assert_eq!(
            s.job_finished(0, 2, 1),
            Err(SchedError::JobMismatch {
                core: 0,
                expected: 2,
                found: 1
            })
        );
        assert_eq!(s.new_job(1, 1, 4, 0), Err(SchedError::DuplicateJob(1)));
        s.new_job(2, 3, 1, 0).ok();
        assert_eq!(
            s.new_job(3, 2, 1, 0),
            Err(SchedError::TimeWentBackwards {
                previous: 3,
                now: 2
            })
        );
        assert_eq!(
            s.quantum_expired(4, 3),
            Err(SchedError::CoreOutOfRange { core: 4, cores: 2 })
        );
        // Nothing above disturbed the state.
        assert_eq!(s.core_occupant(0), Some(1));
        assert_eq!(s.core_occupant(1), Some(2));
        assert_eq!(s.waiting_len(), 0);
    }

    #[test]
    fn averages_zero_before_completion() {
        let mut s = engine(1, Discipline::Sjf);
        s.new_job(1, 0, 4, 0).ok();
        assert_eq!(s.average_waiting_time(), 0.0);
        assert_eq!(s.average_turnaround_time(), 0.0);
        assert_eq!(s.average_response_time(), 0.0);
    }

    #[test]
    fn shutdown_counts_unfinished() {
        let mut s = engine(1, Discipline::Fcfs);
        s.new_job(1, 0, 4, 0).ok();
        s.new_job(2, 1, 4, 0).ok();
        s.new_job(3, 2, 4, 0).ok();
        assert_eq!(s.shutdown(), 3);
    }
}
