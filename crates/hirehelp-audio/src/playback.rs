use std::collections::BTreeMap;

use crate::pcm::AudioBuffer;

/// A buffer placed on the playback timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledChunk {
    pub id: u64,
    pub start_at: f64,
    pub duration: f64,
}

impl ScheduledChunk {
    pub fn end_at(&self) -> f64 {
        self.start_at + self.duration
    }
}

/// Back-to-back scheduling of model audio.
///
/// Each chunk starts at `max(cursor, now)` and pushes the cursor forward by
/// its own duration. An interruption cancels every tracked chunk and rewinds
/// the cursor; both pieces of state are only ever cleared together.
#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    next_start: f64,
    active: BTreeMap<u64, ScheduledChunk>,
    next_id: u64,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_start(&self) -> f64 {
        self.next_start
    }

    pub fn pending(&self) -> usize {
        self.active.len()
    }

    pub fn is_scheduled(&self, id: u64) -> bool {
        self.active.contains_key(&id)
    }

    pub fn schedule(&mut self, now: f64, duration: f64) -> ScheduledChunk {
        let start_at = self.next_start.max(now);
        let duration = duration.max(0.0);
        self.next_start = start_at + duration;

        self.next_id += 1;
        let chunk = ScheduledChunk {
            id: self.next_id,
            start_at,
            duration,
        };
        self.active.insert(chunk.id, chunk);
        chunk
    }

    pub fn schedule_buffer(&mut self, now: f64, buffer: &AudioBuffer) -> ScheduledChunk {
        self.schedule(now, buffer.duration())
    }

    /// Marks a chunk as played to completion.
    pub fn finish(&mut self, id: u64) -> bool {
        self.active.remove(&id).is_some()
    }

    /// Drops every chunk that has ended by `now`; returns their ids.
    pub fn reap(&mut self, now: f64) -> Vec<u64> {
        let done: Vec<u64> = self
            .active
            .values()
            .filter(|c| c.end_at() <= now)
            .map(|c| c.id)
            .collect();
        for id in &done {
            self.active.remove(id);
        }
        done
    }

    /// Cancels all scheduled and playing chunks; returns their ids.
    pub fn interrupt(&mut self) -> Vec<u64> {
        let cancelled: Vec<u64> = self.active.keys().copied().collect();
        self.active.clear();
        self.next_start = 0.0;
        if !cancelled.is_empty() {
            tracing::debug!(count = cancelled.len(), "playback interrupted");
        }
        cancelled
    }
}
