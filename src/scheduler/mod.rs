//! Scheduling disciplines.
//!
//! Each discipline orders the waiting queue by a primary key with the job's
//! arrival time as tie-break. PSJF and PPRI additionally let an arriving job
//! displace a running one.

pub mod preempt;

use std::{cmp::Ordering, fmt, str::FromStr};

use crate::{core::Job, error::SchedError};
pub use preempt::select_victim;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Discipline {
    /// First come, first served.
    Fcfs,
    /// Shortest job first, by total service time.
    Sjf,
    /// Preemptive shortest job first, by remaining time.
    Psjf,
    /// Priority, lower value first.
    Pri,
    /// Preemptive priority.
    Ppri,
    /// Round robin; the driver owns the quantum.
    Rr,
}

impl Discipline {
    pub const ALL: [Discipline; 6] = [
        Discipline::Fcfs,
        Discipline::Sjf,
        Discipline::Psjf,
        Discipline::Pri,
        Discipline::Ppri,
        Discipline::Rr,
    ];

    pub fn is_preemptive(self) -> bool {
        matches!(self, Discipline::Psjf | Discipline::Ppri)
    }

    /// Primary ordering key; smaller sorts first. Wide enough to hold both
    /// unsigned times and signed priorities without loss.
    pub fn primary_key(self, job: &Job) -> i128 {
        match self {
            Discipline::Fcfs | Discipline::Rr => i128::from(job.arrival_time),
            Discipline::Sjf => i128::from(job.service_time),
            Discipline::Psjf => i128::from(job.remaining_time),
            Discipline::Pri | Discipline::Ppri => i128::from(job.priority),
        }
    }

    /// Total order used by the waiting queue.
    pub fn compare(self, a: &Job, b: &Job) -> Ordering {
        self.primary_key(a)
            .cmp(&self.primary_key(b))
            .then_with(|| a.arrival_time.cmp(&b.arrival_time))
    }

    pub fn name(self) -> &'static str {
        match self {
            Discipline::Fcfs => "fcfs",
            Discipline::Sjf => "sjf",
            Discipline::Psjf => "psjf",
            Discipline::Pri => "pri",
            Discipline::Ppri => "ppri",
            Discipline::Rr => "rr",
        }
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Discipline {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Discipline::ALL
            .into_iter()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| SchedError::UnknownDiscipline(s.to_string()))
    }
}
