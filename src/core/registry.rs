//! Time-ordered registry of live jobs.
//!
//! A map from id to job plus a min-heap of `(next_fire_at, generation, id)`.
//! Every re-arm bumps the job's generation, so heap entries left behind by
//! pause, delete, or reschedule are recognised as stale and discarded when
//! they surface. Callers guard the whole registry with one short-held mutex;
//! no method awaits.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use chrono::{DateTime, Utc};

use crate::core::schedule::{JobState, LiveJob, ScheduleStatus};

/// Heap entry ordered earliest-first.
#[derive(Debug)]
struct DueEntry {
    fire_at: DateTime<Utc>,
    generation: u64,
    data_source_id: String,
}

impl PartialEq for DueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DueEntry {}

impl PartialOrd for DueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a max-heap: earliest fire time, then oldest arm, wins.
        other
            .fire_at
            .cmp(&self.fire_at)
            .then_with(|| other.generation.cmp(&self.generation))
    }
}

#[derive(Debug)]
struct Slot {
    job: LiveJob,
    generation: u64,
}

/// Live job map plus dispatch heap.
#[derive(Debug, Default)]
pub struct Registry {
    jobs: HashMap<String, Slot>,
    queue: BinaryHeap<DueEntry>,
    next_generation: u64,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live job exists for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.jobs.contains_key(id)
    }

    /// Borrow a live job.
    pub fn get(&self, id: &str) -> Option<&LiveJob> {
        self.jobs.get(id).map(|slot| &slot.job)
    }

    /// Mutably borrow a live job. Call [`Registry::rearm`] after changing
    /// its state or fire time.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut LiveJob> {
        self.jobs.get_mut(id).map(|slot| &mut slot.job)
    }

    /// Insert a job and arm it. Returns `false` and leaves the registry
    /// untouched when the id is already present.
    pub fn insert(&mut self, job: LiveJob) -> bool {
        if self.jobs.contains_key(&job.data_source_id) {
            return false;
        }
        let id = job.data_source_id.clone();
        self.jobs.insert(id.clone(), Slot { job, generation: 0 });
        self.rearm(&id);
        true
    }

    /// Remove a job. Its heap entry goes stale.
    pub fn remove(&mut self, id: &str) -> Option<LiveJob> {
        let removed = self.jobs.remove(id).map(|slot| slot.job);
        self.compact();
        removed
    }

    /// Invalidate the job's current heap entry and push a new one if the job
    /// is active with a fire time.
    pub fn rearm(&mut self, id: &str) {
        self.compact();
        self.next_generation += 1;
        let generation = self.next_generation;
        let Some(slot) = self.jobs.get_mut(id) else {
            return;
        };
        slot.generation = generation;
        if slot.job.state != JobState::Active {
            return;
        }
        if let Some(fire_at) = slot.job.next_fire_at {
            self.queue.push(DueEntry {
                fire_at,
                generation,
                data_source_id: id.to_string(),
            });
        }
    }

    /// Pop the earliest live entry due at or before `now`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<String> {
        while let Some(top) = self.queue.peek() {
            if !self.is_current(top) {
                self.queue.pop();
                continue;
            }
            if top.fire_at > now {
                return None;
            }
            return self.queue.pop().map(|entry| entry.data_source_id);
        }
        None
    }

    /// Earliest armed fire time, discarding stale entries on the way.
    pub fn next_due(&mut self) -> Option<DateTime<Utc>> {
        while let Some(top) = self.queue.peek() {
            if self.is_current(top) {
                return Some(top.fire_at);
            }
            self.queue.pop();
        }
        None
    }

    /// Number of live jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// True when no jobs are live.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// `(active, paused)` job counts.
    pub fn counts(&self) -> (usize, usize) {
        let paused = self
            .jobs
            .values()
            .filter(|slot| slot.job.state == JobState::Paused)
            .count();
        (self.jobs.len() - paused, paused)
    }

    /// Status of every job, ordered by id.
    pub fn statuses(&self) -> Vec<ScheduleStatus> {
        let mut all: Vec<ScheduleStatus> = self.jobs.values().map(|slot| slot.job.status()).collect();
        all.sort_by(|a, b| a.data_source_id.cmp(&b.data_source_id));
        all
    }

    fn is_current(&self, entry: &DueEntry) -> bool {
        self.jobs.get(&entry.data_source_id).is_some_and(|slot| {
            slot.generation == entry.generation && slot.job.state == JobState::Active
        })
    }

    fn compact(&mut self) {
        if self.queue.len() <= self.jobs.len() * 2 + 64 {
            return;
        }
        let jobs = &self.jobs;
        self.queue.retain(|entry| {
            jobs.get(&entry.data_source_id).is_some_and(|slot| {
                slot.generation == entry.generation && slot.job.state == JobState::Active
            })
        });
    }
}
