use crate::constants::{
    FIRST_EATEN_BONUS, FRIGHTENED_FLASH_PERIOD, FRIGHTENED_FLASH_TICKS, FRIGHTENED_TICKS,
    MODE_WAVES,
};
use crate::types::GlobalMode;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScheduleTick {
    pub mode_flipped: bool,
    pub frightened_ended: bool,
}

/// Global scatter/chase clock plus the frightened countdown.
///
/// The wave clock is frozen while the frightened countdown runs.
#[derive(Clone, Debug)]
pub struct ModeScheduler {
    mode: GlobalMode,
    wave_index: usize,
    elapsed: u32,
    frightened_remaining: u32,
    eaten_bonus: u32,
}

impl Default for ModeScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeScheduler {
    pub fn new() -> Self {
        Self {
            mode: GlobalMode::Scatter,
            wave_index: 0,
            elapsed: 0,
            frightened_remaining: 0,
            eaten_bonus: FIRST_EATEN_BONUS,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn mode(&self) -> GlobalMode {
        self.mode
    }

    pub fn wave_index(&self) -> usize {
        self.wave_index
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn frightened_remaining(&self) -> u32 {
        self.frightened_remaining
    }

    pub fn is_frightened(&self) -> bool {
        self.frightened_remaining > 0
    }

    pub fn is_flashing(&self) -> bool {
        self.frightened_remaining > 0
            && self.frightened_remaining < FRIGHTENED_FLASH_TICKS
            && (self.frightened_remaining / FRIGHTENED_FLASH_PERIOD) % 2 == 0
    }

    /// Starts (or restarts) the frightened countdown and resets the eaten bonus chain.
    pub fn activate_frightened(&mut self) {
        self.frightened_remaining = FRIGHTENED_TICKS;
        self.eaten_bonus = FIRST_EATEN_BONUS;
    }

    /// Bonus for the next adversary eaten in this activation; doubles afterwards.
    pub fn next_eaten_bonus(&mut self) -> u32 {
        let bonus = self.eaten_bonus;
        self.eaten_bonus = self.eaten_bonus.saturating_mul(2);
        bonus
    }

    pub fn advance(&mut self) -> ScheduleTick {
        let mut outcome = ScheduleTick::default();
        if self.frightened_remaining > 0 {
            self.frightened_remaining -= 1;
            outcome.frightened_ended = self.frightened_remaining == 0;
            return outcome;
        }

        self.elapsed += 1;
        let wave = MODE_WAVES[self.wave_index];
        let limit = match self.mode {
            GlobalMode::Scatter => wave.scatter_ticks,
            GlobalMode::Chase => wave.chase_ticks,
        };
        if limit.is_some_and(|ticks| self.elapsed >= ticks) {
            self.elapsed = 0;
            self.mode = match self.mode {
                GlobalMode::Scatter => GlobalMode::Chase,
                GlobalMode::Chase => GlobalMode::Scatter,
            };
            if self.mode == GlobalMode::Scatter {
                self.wave_index = (self.wave_index + 1).min(MODE_WAVES.len() - 1);
            }
            outcome.mode_flipped = true;
        }
        outcome
    }
}
