use crate::constants::{
    ANIMATION_FRAME_TICKS, BONUS_LIFE_SCORE, PLAYER_SPEED, STARTING_LIVES,
};
use crate::maze::Maze;
use crate::types::{Direction, PlayerView, Vec2};

use super::mover::Mover;

#[derive(Clone, Debug)]
pub struct Player {
    pub mover: Mover,
    buffered: Direction,
    facing: Direction,
    score: u32,
    lives: u32,
    bonus_life_awarded: bool,
    anim_frame: u8,
    anim_timer: u32,
}

impl Player {
    pub fn new(spawn: Vec2) -> Self {
        Self {
            mover: Mover::new(spawn, PLAYER_SPEED),
            buffered: Direction::None,
            facing: Direction::Left,
            score: 0,
            lives: STARTING_LIVES,
            bonus_life_awarded: false,
            anim_frame: 0,
            anim_timer: 0,
        }
    }

    pub fn tile(&self) -> Vec2 {
        self.mover.tile
    }

    pub fn dir(&self) -> Direction {
        self.mover.dir
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    /// Only mutator for input. The request is held until a decision point
    /// where it leads onto an open tile.
    pub fn set_direction(&mut self, dir: Direction) {
        self.buffered = dir;
    }

    pub fn update(&mut self, maze: &Maze) {
        if self.mover.at_decision_point()
            && !self.buffered.is_none()
            && !maze.is_wall(self.mover.tile.step(self.buffered))
        {
            self.mover.dir = self.buffered;
        }

        if self.mover.dir.is_none() {
            self.anim_frame = 0;
            self.anim_timer = 0;
        } else {
            self.facing = self.mover.dir;
            self.anim_timer += 1;
            if self.anim_timer >= ANIMATION_FRAME_TICKS {
                self.anim_timer = 0;
                self.anim_frame = (self.anim_frame + 1) % 2;
            }
        }

        self.mover.advance(maze);
    }

    /// Adds `points` and returns true when this award crossed the bonus-life
    /// threshold for the first time in the session.
    pub fn add_score(&mut self, points: u32) -> bool {
        self.score = self.score.saturating_add(points);
        if !self.bonus_life_awarded && self.score >= BONUS_LIFE_SCORE {
            self.bonus_life_awarded = true;
            self.lives += 1;
            return true;
        }
        false
    }

    /// Returns the lives left after the loss.
    pub fn lose_life(&mut self) -> u32 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }

    /// Back to spawn, keeping score and lives.
    pub fn reset(&mut self) {
        self.mover.reset();
        self.buffered = Direction::None;
        self.facing = Direction::Left;
        self.anim_frame = 0;
        self.anim_timer = 0;
    }

    /// Fresh session state.
    pub fn reset_session(&mut self) {
        self.reset();
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.bonus_life_awarded = false;
    }

    pub fn to_view(&self) -> PlayerView {
        PlayerView {
            tile: self.mover.tile,
            pos: self.mover.pos,
            dir: self.mover.dir,
            facing: self.facing,
            anim_frame: self.anim_frame,
            lives: self.lives,
            score: self.score,
        }
    }
}
