use crate::core::{CoreId, JobId, JobState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedCoreEvent {
    JobStateChange {
        job: JobId,
        from: JobState,
        to: JobState,
    },
    CoreCurrentChange {
        core: CoreId,
        from: Option<JobId>,
        to: Option<JobId>,
    },
    // Arriving job took a busy core
    Preempted {
        core: CoreId,
        victim: JobId,
        by: JobId,
    },
    // RR quantum expired with nobody waiting; job keeps its core
    QuantumRenewed {
        core: CoreId,
        job: JobId,
    },
}
