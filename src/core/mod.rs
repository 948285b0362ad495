pub mod api;
pub mod driver;
pub mod event;
pub mod observer;
pub mod queue;
pub mod state;

pub use api::SchedulerHandle;
pub use driver::SchedCore;
pub use event::SchedCoreEvent;
pub use queue::WaitQueue;
pub use state::{CoreId, CoreState, CoreTable, Job, JobId, JobState, Priority, Ticks};
