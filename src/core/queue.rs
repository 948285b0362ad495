use std::{cmp::Ordering, collections::VecDeque};

use super::state::Job;
use crate::scheduler::Discipline;

/// Jobs that are ready but not running, kept sorted by the active discipline.
///
/// Insertion is stable: a job lands after every job that compares equal to
/// it, so equal keys keep their insertion order.
#[derive(Debug)]
pub struct WaitQueue {
    order: Discipline,
    jobs: VecDeque<Job>,
}

impl WaitQueue {
    pub fn new(order: Discipline) -> Self {
        Self {
            order,
            jobs: VecDeque::new(),
        }
    }

    pub fn discipline(&self) -> Discipline {
        self.order
    }

    /// Inserts `job` in order and returns the rank it landed at.
    pub fn insert(&mut self, job: Job) -> usize {
        let order = self.order;
        let rank = self
            .jobs
            .partition_point(|queued| order.compare(queued, &job) != Ordering::Greater);
        self.jobs.insert(rank, job);
        rank
    }

    pub fn peek(&self) -> Option<&Job> {
        self.jobs.front()
    }

    pub fn pop_front(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    // Callers must not touch ordering keys through this.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs.iter_mut()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Job> + '_ {
        self.jobs.drain(..)
    }

    pub fn is_sorted(&self) -> bool {
        self.jobs
            .iter()
            .zip(self.jobs.iter().skip(1))
            .all(|(a, b)| self.order.compare(a, b) != Ordering::Greater)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::JobId;

    fn ids(queue: &WaitQueue) -> Vec<JobId> {
        queue.iter().map(|j| j.id).collect()
    }

    #[test]
    fn insert_reports_rank() {
        let mut q = WaitQueue::new(Discipline::Sjf);
        assert_eq!(q.insert(Job::new(1, 0, 5, 0)), 0);
        assert_eq!(q.insert(Job::new(2, 1, 9, 0)), 1);
        assert_eq!(q.insert(Job::new(3, 2, 1, 0)), 0);
        assert_eq!(q.insert(Job::new(4, 3, 5, 0)), 2);
        assert_eq!(ids(&q), vec![3, 1, 4, 2]);
        assert!(q.is_sorted());
    }

    #[test]
    fn equal_keys_keep_insertion_order() {
        let mut q = WaitQueue::new(Discipline::Pri);
        q.insert(Job::new(1, 5, 1, 3));
        q.insert(Job::new(2, 5, 1, 3));
        assert_eq!(ids(&q), vec![1, 2]);
    }

    #[test]
    fn peek_and_pop() {
        let mut q = WaitQueue::new(Discipline::Fcfs);
        assert!(q.peek().is_none());
        assert!(q.pop_front().is_none());

        q.insert(Job::new(10, 4, 1, 0));
        q.insert(Job::new(11, 2, 1, 0));
        assert_eq!(q.peek().map(|j| j.id), Some(11));
        assert_eq!(q.len(), 2);

        assert_eq!(q.pop_front().map(|j| j.id), Some(11));
        assert_eq!(q.len(), 1);
    }
}
