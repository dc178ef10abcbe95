use crate::constants::TILE_SIZE;
use crate::maze::Maze;
use crate::types::{Direction, Point, Vec2};

pub fn tile_center(tile: Vec2) -> Point {
    Point {
        x: tile.x as f32 * TILE_SIZE + TILE_SIZE / 2.0,
        y: tile.y as f32 * TILE_SIZE + TILE_SIZE / 2.0,
    }
}

/// Tile-snapped movement shared by the player and the adversaries.
///
/// The agent only changes direction while its pixel position sits exactly on
/// the center of `tile` (a decision point). Between decision points it keeps
/// sliding along `dir` and snaps onto the next center once it reaches or
/// passes it.
#[derive(Clone, Debug)]
pub struct Mover {
    pub tile: Vec2,
    pub pos: Point,
    pub dir: Direction,
    pub speed: f32,
    spawn: Vec2,
}

impl Mover {
    pub fn new(spawn: Vec2, speed: f32) -> Self {
        Self {
            tile: spawn,
            pos: tile_center(spawn),
            dir: Direction::None,
            speed,
            spawn,
        }
    }

    pub fn spawn(&self) -> Vec2 {
        self.spawn
    }

    pub fn reset(&mut self) {
        self.tile = self.spawn;
        self.pos = tile_center(self.spawn);
        self.dir = Direction::None;
    }

    pub fn at_decision_point(&self) -> bool {
        self.pos == tile_center(self.tile)
    }

    /// Places the agent on the center of `tile`, as if it had just arrived.
    pub fn place(&mut self, tile: Vec2, dir: Direction) {
        self.tile = tile;
        self.pos = tile_center(tile);
        self.dir = dir;
    }

    pub fn advance(&mut self, maze: &Maze) {
        if self.dir.is_none() {
            return;
        }
        if self.at_decision_point() && maze.is_wall(self.tile.step(self.dir)) {
            self.dir = Direction::None;
            return;
        }

        let (dx, dy) = self.dir.delta();
        self.pos.x += dx as f32 * self.speed;
        self.pos.y += dy as f32 * self.speed;

        let next = self.tile.step(self.dir);
        let target = tile_center(next);
        let arrived = match self.dir {
            Direction::Right => self.pos.x >= target.x,
            Direction::Left => self.pos.x <= target.x,
            Direction::Down => self.pos.y >= target.y,
            Direction::Up => self.pos.y <= target.y,
            Direction::None => false,
        };
        if arrived {
            self.tile = maze.wrap(next);
            self.pos = tile_center(self.tile);
        }
    }
}
