//! Deadline queue for one-shot delayed tasks
//!
//! Tasks are plain data. They are polled once per tick against simulated time
//! and never fire with sub-tick precision. A task bound to an entity must be
//! cancelled when that entity goes away.

use serde::{Deserialize, Serialize};

use super::state::EntityRef;

/// Handle returned by [`TimerQueue::schedule`]; used to cancel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

/// Work that runs when a deadline passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerTask {
    /// Begin the next wave after a completion pause
    StartNextWave,
    /// Boss wave lead-in finished: show the warning sequence
    BeginBossWarning { wave: u32 },
    /// Warning sequence finished: build the boss
    SpawnBoss { wave: u32 },
    /// Clear the damage flash on an entity
    FlashRevert(EntityRef),
    /// The player's timed power-up runs out
    PowerUpExpire,
    /// Present the game-over screen
    ShowGameOver,
    /// Present the victory screen
    ShowVictory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Scheduled {
    handle: TimerHandle,
    due_ms: f64,
    task: TimerTask,
}

/// Pending tasks ordered by (deadline, scheduling order)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerQueue {
    entries: Vec<Scheduled>,
    next_handle: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task` to run once `delay_ms` after `now_ms`
    pub fn schedule(&mut self, now_ms: f64, delay_ms: f32, task: TimerTask) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.entries.push(Scheduled {
            handle,
            due_ms: now_ms + delay_ms.max(0.0) as f64,
            task,
        });
        handle
    }

    /// Cancel a pending task. Returns false if it already ran or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        self.entries.len() != before
    }

    /// Cancel every pending task matching `pred`
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&TimerTask) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !pred(&e.task));
        before - self.entries.len()
    }

    /// Remove and return the earliest task due at or before `now_ms`
    pub fn pop_due(&mut self, now_ms: f64) -> Option<TimerTask> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due_ms <= now_ms)
            .min_by(|(_, a), (_, b)| {
                a.due_ms
                    .partial_cmp(&b.due_ms)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.handle.cmp(&b.handle))
            })
            .map(|(i, _)| i)?;
        Some(self.entries.remove(idx).task)
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    /// True if any pending task matches `pred`
    pub fn any(&self, mut pred: impl FnMut(&TimerTask) -> bool) -> bool {
        self.entries.iter().any(|e| pred(&e.task))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
