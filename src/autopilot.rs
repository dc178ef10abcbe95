use crate::engine::GameEngine;
use crate::maze::Maze;
use crate::pathfinding::{nearest_path, shortest_path, step_direction};
use crate::types::{Direction, Vec2};

/// Lethal adversaries closer than this (in tiles) make the autopilot run.
pub const DANGER_RADIUS: f32 = 4.0;
/// Consecutive threatened ticks before [`Autopilot`] stops running away.
pub const FLEE_LIMIT_TICKS: u32 = 180;
/// Ticks spent ignoring threats once the flee limit is hit.
pub const BOLD_TICKS: u32 = 120;

/// Deterministic input for hosts and soak runs. Reads the engine through its
/// public accessors only.
pub fn choose_direction(engine: &GameEngine) -> Direction {
    let (tile, current, threats, fruit) = observe(engine);
    plan(engine.maze(), tile, current, &threats, fruit)
}

/// Stateful driver for long runs. Same choices as [`choose_direction`], except
/// that a chase lasting longer than `FLEE_LIMIT_TICKS` is abandoned for
/// `BOLD_TICKS` so a player cornered by a circling adversary keeps feeding.
#[derive(Clone, Debug, Default)]
pub struct Autopilot {
    fleeing_for: u32,
    bold_for: u32,
}

impl Autopilot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_direction(&mut self, engine: &GameEngine) -> Direction {
        let (tile, current, threats, fruit) = observe(engine);
        self.steer(engine.maze(), tile, current, &threats, fruit)
    }

    fn steer(
        &mut self,
        maze: &Maze,
        tile: Vec2,
        current: Direction,
        threats: &[Vec2],
        fruit: Option<Vec2>,
    ) -> Direction {
        if self.bold_for > 0 {
            self.bold_for -= 1;
            return plan(maze, tile, current, &[], fruit);
        }
        if threats.iter().any(|threat| threat.distance(tile) <= DANGER_RADIUS) {
            self.fleeing_for += 1;
            if self.fleeing_for > FLEE_LIMIT_TICKS {
                self.fleeing_for = 0;
                self.bold_for = BOLD_TICKS;
                return plan(maze, tile, current, &[], fruit);
            }
        } else {
            self.fleeing_for = 0;
        }
        plan(maze, tile, current, threats, fruit)
    }
}

fn observe(engine: &GameEngine) -> (Vec2, Direction, Vec<Vec2>, Option<Vec2>) {
    let player = engine.player();
    let threats = engine
        .adversaries()
        .iter()
        .filter(|adversary| adversary.is_lethal())
        .map(|adversary| adversary.tile())
        .collect();
    let fruit = engine.fruit().map(|fruit| fruit.tile);
    (player.tile(), player.dir(), threats, fruit)
}

fn plan(
    maze: &Maze,
    tile: Vec2,
    current: Direction,
    threats: &[Vec2],
    fruit: Option<Vec2>,
) -> Direction {
    let nearby: Vec<Vec2> = threats
        .iter()
        .copied()
        .filter(|threat| threat.distance(tile) <= DANGER_RADIUS)
        .collect();
    if !nearby.is_empty() {
        return flee(maze, tile, &nearby).unwrap_or(current);
    }

    // Active fruit first, then the nearest pellet.
    let route = fruit
        .and_then(|fruit| shortest_path(maze, tile, fruit))
        .filter(|route| route.len() >= 2)
        .or_else(|| {
            nearest_path(maze, tile, |candidate| {
                maze.tile_at(candidate).pellet().is_some()
            })
        });
    match route {
        Some(route) if route.len() >= 2 => {
            step_direction(maze, tile, route[1]).unwrap_or(current)
        }
        _ => current,
    }
}

fn flee(maze: &Maze, tile: Vec2, threats: &[Vec2]) -> Option<Direction> {
    let clearance = |dir: Direction| {
        let next = maze.neighbor(tile, dir);
        threats
            .iter()
            .map(|threat| threat.distance(next))
            .fold(f32::INFINITY, f32::min)
    };
    let mut best: Option<(Direction, f32)> = None;
    for dir in Direction::PRIORITY {
        if !maze.is_open(maze.neighbor(tile, dir)) {
            continue;
        }
        let score = clearance(dir);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((dir, score));
        }
    }
    best.map(|(dir, _)| dir)
}
