// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raster timing in host ticks.

use alloc::collections::VecDeque;

/// Number of laps a [`FrameTimer`] keeps by default.
pub const DEFAULT_LAP_LIMIT: usize = 300;

/// Measures how long frames take, in host ticks.
///
/// The timer does not read a clock. The host passes its own monotonic ticks
/// (nanoseconds, display-link units, ...) to [`start`](Self::start) and
/// [`stop`](Self::stop). Only the most recent laps are kept.
#[derive(Clone, Debug)]
pub struct FrameTimer {
    laps: VecDeque<u64>,
    limit: usize,
    started_at: Option<u64>,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    /// Creates a timer keeping [`DEFAULT_LAP_LIMIT`] laps.
    #[must_use]
    pub fn new() -> Self {
        Self::with_lap_limit(DEFAULT_LAP_LIMIT)
    }

    /// Creates a timer keeping at most `limit` laps (at least one).
    #[must_use]
    pub fn with_lap_limit(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            laps: VecDeque::with_capacity(limit),
            limit,
            started_at: None,
        }
    }

    /// Starts a lap at `now`. A lap already running is restarted.
    pub fn start(&mut self, now: u64) {
        self.started_at = Some(now);
    }

    /// Ends the running lap at `now` and returns its length.
    ///
    /// Returns `None` if no lap was running. A clock that went backwards
    /// yields a zero-length lap.
    pub fn stop(&mut self, now: u64) -> Option<u64> {
        let start = self.started_at.take()?;
        let lap = now.saturating_sub(start);
        if self.laps.len() == self.limit {
            self.laps.pop_front();
        }
        self.laps.push_back(lap);
        Some(lap)
    }

    /// Whether a lap is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// The most recent lap.
    #[must_use]
    pub fn last_lap(&self) -> Option<u64> {
        self.laps.back().copied()
    }

    /// Kept laps, oldest first.
    pub fn laps(&self) -> impl Iterator<Item = u64> + '_ {
        self.laps.iter().copied()
    }

    /// The longest kept lap.
    #[must_use]
    pub fn max_lap(&self) -> Option<u64> {
        self.laps.iter().copied().max()
    }

    /// Mean of the kept laps, rounded down.
    #[must_use]
    pub fn average_lap(&self) -> Option<u64> {
        if self.laps.is_empty() {
            return None;
        }
        let total: u128 = self.laps.iter().map(|&lap| u128::from(lap)).sum();
        let count = self.laps.len() as u128;
        u64::try_from(total / count).ok()
    }
}
