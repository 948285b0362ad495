use super::Discipline;
use crate::core::{CoreId, Job};

/// Picks the core an arriving job should take over, if any.
///
/// A running job is eligible when the arriving job's primary key is strictly
/// smaller than its own. Among eligible jobs the one with the largest key
/// loses its core; equal keys resolve to the lowest core index.
pub fn select_victim<'a>(
    discipline: Discipline,
    running: impl IntoIterator<Item = (CoreId, &'a Job)>,
    arriving: &Job,
) -> Option<CoreId> {
    if !discipline.is_preemptive() {
        return None;
    }

    let incoming = discipline.primary_key(arriving);
    let mut victim: Option<(CoreId, i128)> = None;
    for (core, job) in running {
        let key = discipline.primary_key(job);
        if key <= incoming {
            continue;
        }
        match victim {
            Some((_, worst)) if key <= worst => {}
            _ => victim = Some((core, key)),
        }
    }

    victim.map(|(core, _)| core)
}
