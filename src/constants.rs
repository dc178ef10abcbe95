use crate::types::{AdversaryVariant, Vec2, Wave};

pub const TICK_RATE: u32 = 60;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const TILE_SIZE: f32 = 24.0;
pub const MAZE_WIDTH: i32 = 19;
pub const MAZE_HEIGHT: i32 = 22;

pub const PLAYER_SPEED: f32 = 2.0;
pub const ADVERSARY_BASE_SPEED: f32 = 2.1;
pub const FRIGHTENED_SPEED: f32 = 1.2;
pub const EATEN_SPEED: f32 = 4.0;
pub const LEADER_RAGE_SPEED: f32 = 2.1;
pub const MAX_ADVERSARY_SPEED: f32 = PLAYER_SPEED + 0.8;
pub const MAX_LEADER_RAGE_SPEED: f32 = PLAYER_SPEED + 1.1;
pub const ADVERSARY_SPEED_STEP: f32 = 0.15;
pub const LEADER_RAGE_SPEED_STEP: f32 = 0.2;

pub const STARTING_LIVES: u32 = 3;
pub const BONUS_LIFE_SCORE: u32 = 1500;
pub const SMALL_PELLET_SCORE: u32 = 10;
pub const POWER_PELLET_SCORE: u32 = 50;
pub const FRUIT_SCORE: u32 = 100;
pub const FIRST_EATEN_BONUS: u32 = 200;

pub const FRIGHTENED_TICKS: u32 = 7 * TICK_RATE;
pub const FRIGHTENED_FLASH_TICKS: u32 = 120;
pub const FRIGHTENED_FLASH_PERIOD: u32 = 15;

/// Player and adversary touch when their centers are closer than this.
pub const COLLISION_DISTANCE: f32 = TILE_SIZE * 0.75;
pub const FICKLE_RETREAT_DISTANCE: f32 = 8.0;

pub const FRUIT_TILE: Vec2 = Vec2::new(9, 12);
pub const FRUIT_PELLET_THRESHOLDS: [u32; 2] = [10, 70];
pub const FRUIT_LIFETIME_TICKS: u64 = 10 * TICK_RATE as u64;

pub const SESSION_START_PAUSE_TICKS: u32 = 60;
pub const ROUND_START_PAUSE_TICKS: u32 = 120;
pub const LIFE_LOST_PAUSE_TICKS: u32 = 60;

pub const ANIMATION_FRAME_TICKS: u32 = 5;

pub const MODE_WAVES: [Wave; 4] = [
    Wave {
        scatter_ticks: Some(7 * TICK_RATE),
        chase_ticks: Some(20 * TICK_RATE),
    },
    Wave {
        scatter_ticks: Some(7 * TICK_RATE),
        chase_ticks: Some(20 * TICK_RATE),
    },
    Wave {
        scatter_ticks: Some(5 * TICK_RATE),
        chase_ticks: Some(20 * TICK_RATE),
    },
    Wave {
        scatter_ticks: None,
        chase_ticks: Some(5 * TICK_RATE),
    },
];

pub fn get_house_exit_delay_ticks(variant: AdversaryVariant) -> u32 {
    match variant {
        AdversaryVariant::Leader => 1,
        AdversaryVariant::Ambusher => 4 * TICK_RATE,
        AdversaryVariant::Opportunist => 8 * TICK_RATE,
        AdversaryVariant::Fickle => 12 * TICK_RATE,
    }
}

pub fn get_adversary_base_speed(round: u32) -> f32 {
    let steps = round.saturating_sub(1) as f32;
    (ADVERSARY_BASE_SPEED + ADVERSARY_SPEED_STEP * steps).min(MAX_ADVERSARY_SPEED)
}

pub fn get_leader_rage_speed(round: u32) -> f32 {
    let steps = round.saturating_sub(1) as f32;
    (LEADER_RAGE_SPEED + LEADER_RAGE_SPEED_STEP * steps).min(MAX_LEADER_RAGE_SPEED)
}

pub fn get_scatter_target(variant: AdversaryVariant) -> Vec2 {
    match variant {
        AdversaryVariant::Leader => Vec2::new(MAZE_WIDTH - 2, 1),
        AdversaryVariant::Ambusher => Vec2::new(1, 1),
        AdversaryVariant::Opportunist => Vec2::new(MAZE_WIDTH - 2, MAZE_HEIGHT - 2),
        AdversaryVariant::Fickle => Vec2::new(1, MAZE_HEIGHT - 2),
    }
}
