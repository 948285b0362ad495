use thiserror::Error;

use crate::core::{CoreId, JobId, Ticks};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedError {
    #[error("scheduler needs at least one core")]
    NoCores,

    #[error("unknown scheduling discipline `{0}`")]
    UnknownDiscipline(String),

    #[error("scheduler used before start_up")]
    NotStarted,

    #[error("start_up called twice")]
    AlreadyStarted,

    #[error("scheduler used after clean_up")]
    ShutDown,

    #[error("core {core} out of range (have {cores})")]
    CoreOutOfRange { core: CoreId, cores: usize },

    #[error("core {core} is idle")]
    CoreIdle { core: CoreId },

    #[error("core {core} runs job {found}, not job {expected}")]
    JobMismatch {
        core: CoreId,
        expected: JobId,
        found: JobId,
    },

    #[error("job {0} is already known to the scheduler")]
    DuplicateJob(JobId),

    #[error("event at t={now} precedes previous event at t={previous}")]
    TimeWentBackwards { previous: Ticks, now: Ticks },
}
