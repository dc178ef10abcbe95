use std::collections::VecDeque;

use crate::maze::Maze;
use crate::types::{Direction, Vec2};

const SEARCH_ORDER: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

/// Shortest 4-directional route from `start` to `goal`, both ends included.
/// Tunnels wrap. Returns `None` when either end is a wall or no route exists.
pub fn shortest_path(maze: &Maze, start: Vec2, goal: Vec2) -> Option<Vec<Vec2>> {
    let goal = maze.wrap(goal);
    search(maze, start, |tile| tile == goal)
}

/// Shortest route from `start` to the closest open tile accepted by `is_goal`.
pub fn nearest_path<F>(maze: &Maze, start: Vec2, is_goal: F) -> Option<Vec<Vec2>>
where
    F: Fn(Vec2) -> bool,
{
    search(maze, start, is_goal)
}

fn search<F>(maze: &Maze, start: Vec2, is_goal: F) -> Option<Vec<Vec2>>
where
    F: Fn(Vec2) -> bool,
{
    let start = maze.wrap(start);
    if !maze.is_open(start) {
        return None;
    }
    let width = maze.width();
    let index = |pos: Vec2| (pos.y * width + pos.x) as usize;
    let mut parent: Vec<Option<Vec2>> = vec![None; (width * maze.height()) as usize];
    let mut visited = vec![false; parent.len()];
    let mut queue = VecDeque::new();
    visited[index(start)] = true;
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        if is_goal(current) {
            let mut path = vec![current];
            let mut cursor = current;
            while let Some(prev) = parent[index(cursor)] {
                path.push(prev);
                cursor = prev;
            }
            path.reverse();
            return Some(path);
        }
        for dir in SEARCH_ORDER {
            let next = maze.neighbor(current, dir);
            if !maze.is_open(next) || visited[index(next)] {
                continue;
            }
            visited[index(next)] = true;
            parent[index(next)] = Some(current);
            queue.push_back(next);
        }
    }
    None
}

/// Direction that moves from `from` onto the adjacent `to`, accounting for wrap.
pub fn step_direction(maze: &Maze, from: Vec2, to: Vec2) -> Option<Direction> {
    SEARCH_ORDER
        .into_iter()
        .find(|dir| maze.neighbor(from, *dir) == to)
}
