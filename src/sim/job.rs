use crate::core::{JobId, Priority, Ticks};

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub arrival_time: Ticks,
    pub run_time: Ticks,
    pub priority: Priority,
}

#[derive(Debug, Clone)]
pub struct JobInstance {
    pub job: Job,
    pub start_time: Option<Ticks>,
    pub completion_time: Option<Ticks>,
}

impl JobInstance {
    pub fn response_time(&self) -> Option<Ticks> {
        self.start_time.map(|t| t - self.job.arrival_time)
    }

    pub fn turnaround_time(&self) -> Option<Ticks> {
        self.completion_time.map(|t| t - self.job.arrival_time)
    }

    pub fn waiting_time(&self) -> Option<Ticks> {
        self.turnaround_time()
            .map(|t| t.saturating_sub(self.job.run_time))
    }
}
