use rustc_hash::FxHashSet;

use super::{
    queue::WaitQueue,
    state::{CoreTable, JobId, JobState},
};

/// Debug-build consistency checks run after every engine event.
#[derive(Debug, Default)]
pub struct Observer {
    step: u64,
}

impl Observer {
    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn steps(&self) -> u64 {
        self.step
    }

    pub fn observe(
        &mut self,
        cores: &CoreTable,
        waiting: &WaitQueue,
        live: &FxHashSet<JobId>,
        after_arrival: bool,
    ) {
        self.step += 1;

        if !cfg!(debug_assertions) {
            return;
        }

        let mut seen = FxHashSet::default();

        for core in cores.iter() {
            if let Some(job) = &core.current {
                debug_assert_eq!(
                    job.state,
                    JobState::Running(core.id),
                    "Job {} on core {} has mismatched state",
                    job.id,
                    core.id
                );
                debug_assert!(seen.insert(job.id), "Job {} appears twice", job.id);
            }
        }

        for job in waiting.iter() {
            debug_assert_eq!(
                job.state,
                JobState::Waiting,
                "Queued job {} must be Waiting",
                job.id
            );
            debug_assert!(
                seen.insert(job.id),
                "Job {} both queued and running",
                job.id
            );
        }

        debug_assert_eq!(
            &seen, live,
            "Resident jobs diverge from live job set at step {}",
            self.step
        );
        debug_assert!(waiting.is_sorted(), "Waiting queue out of order");

        let discipline = waiting.discipline();
        if after_arrival && discipline.is_preemptive() {
            if let Some(best) = waiting.peek() {
                let best_key = discipline.primary_key(best);
                for (core, job) in cores.running() {
                    debug_assert!(
                        best_key >= discipline.primary_key(job),
                        "Waiting job {} should have preempted job {} on core {core}",
                        best.id,
                        job.id
                    );
                }
            }
        }
    }
}
