pub mod core;
pub mod error;
pub mod scheduler;
pub mod sim;

pub use crate::core::{SchedCore, SchedCoreEvent, SchedulerHandle};
pub use error::SchedError;
pub use scheduler::Discipline;
pub use sim::{Job, Sim};
