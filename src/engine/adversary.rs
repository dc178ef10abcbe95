use rand::seq::IndexedRandom;
use rand::Rng;

use crate::constants::{
    get_adversary_base_speed, get_house_exit_delay_ticks, get_leader_rage_speed,
    get_scatter_target, EATEN_SPEED, FICKLE_RETREAT_DISTANCE, FRIGHTENED_SPEED,
};
use crate::maze::Maze;
use crate::pathfinding::{shortest_path, step_direction};
use crate::types::{
    AdversaryState, AdversaryVariant, AdversaryView, Direction, GlobalMode, Vec2,
};

use super::mover::Mover;

/// Read-only view of the world an adversary needs to pick a target.
#[derive(Clone, Copy, Debug)]
pub struct TargetContext {
    pub player_tile: Vec2,
    pub player_dir: Direction,
    /// `None` when the Leader is not part of the session.
    pub leader_tile: Option<Vec2>,
    pub house_exit: Vec2,
}

type ChaseTarget = fn(&Adversary, &TargetContext) -> Vec2;

/// Chase heuristics indexed by `AdversaryVariant::index()`.
const CHASE_TARGETS: [ChaseTarget; 4] = [
    leader_target,
    ambusher_target,
    opportunist_target,
    fickle_target,
];

fn leader_target(_adversary: &Adversary, ctx: &TargetContext) -> Vec2 {
    ctx.player_tile
}

fn ambusher_target(_adversary: &Adversary, ctx: &TargetContext) -> Vec2 {
    if ctx.player_dir == Direction::Up {
        return Vec2::new(ctx.player_tile.x - 4, ctx.player_tile.y - 4);
    }
    ctx.player_tile.offset(ctx.player_dir, 4)
}

fn opportunist_target(_adversary: &Adversary, ctx: &TargetContext) -> Vec2 {
    let Some(leader) = ctx.leader_tile else {
        return ctx.player_tile;
    };
    let pivot = ctx.player_tile.offset(ctx.player_dir, 2);
    Vec2::new(2 * pivot.x - leader.x, 2 * pivot.y - leader.y)
}

fn fickle_target(adversary: &Adversary, ctx: &TargetContext) -> Vec2 {
    if adversary.tile().distance(ctx.player_tile) > FICKLE_RETREAT_DISTANCE {
        ctx.player_tile
    } else {
        get_scatter_target(adversary.variant)
    }
}

#[derive(Clone, Debug)]
pub struct Adversary {
    pub variant: AdversaryVariant,
    pub mover: Mover,
    state: AdversaryState,
    base_speed: f32,
    rage_speed: f32,
    house_timer: u32,
    immune: bool,
    route: Option<Vec<Vec2>>,
    route_cursor: usize,
}

impl Adversary {
    pub fn new(variant: AdversaryVariant, spawn: Vec2, round: u32) -> Self {
        let base_speed = get_adversary_base_speed(round);
        Self {
            variant,
            mover: Mover::new(spawn, base_speed),
            state: AdversaryState::InHouse,
            base_speed,
            rage_speed: get_leader_rage_speed(round),
            house_timer: 0,
            immune: false,
            route: None,
            route_cursor: 0,
        }
    }

    pub fn state(&self) -> AdversaryState {
        self.state
    }

    pub fn tile(&self) -> Vec2 {
        self.mover.tile
    }

    pub fn is_immune(&self) -> bool {
        self.immune
    }

    pub fn base_speed(&self) -> f32 {
        self.base_speed
    }

    /// True for states in which touching the player costs a life.
    pub fn is_lethal(&self) -> bool {
        matches!(
            self.state,
            AdversaryState::Exiting | AdversaryState::Scatter | AdversaryState::Chase
        )
    }

    pub fn apply_difficulty(&mut self, round: u32) {
        self.base_speed = get_adversary_base_speed(round);
        self.rage_speed = get_leader_rage_speed(round);
    }

    pub fn reset(&mut self) {
        self.mover.reset();
        self.mover.speed = self.base_speed;
        self.state = AdversaryState::InHouse;
        self.house_timer = 0;
        self.immune = false;
        self.route = None;
        self.route_cursor = 0;
    }

    pub fn scatter_target(&self) -> Vec2 {
        get_scatter_target(self.variant)
    }

    pub fn chase_target(&self, ctx: &TargetContext) -> Vec2 {
        CHASE_TARGETS[self.variant.index()](self, ctx)
    }

    /// Target tile for the current state, if the state steers by target.
    pub fn target_tile(&self, ctx: &TargetContext) -> Option<Vec2> {
        match self.state {
            AdversaryState::Scatter => Some(self.scatter_target()),
            AdversaryState::Chase => Some(self.chase_target(ctx)),
            AdversaryState::Exiting => Some(ctx.house_exit),
            _ => None,
        }
    }

    /// Counts one tick inside the house; returns true on the InHouse -> Exiting edge.
    pub fn tick_house(&mut self) -> bool {
        if self.state != AdversaryState::InHouse {
            return false;
        }
        self.house_timer += 1;
        if self.house_timer >= get_house_exit_delay_ticks(self.variant) {
            self.state = AdversaryState::Exiting;
            return true;
        }
        false
    }

    /// Exiting -> Frightened or the global mode once the exit tile is reached.
    pub fn finish_exit(&mut self, house_exit: Vec2, frightened_active: bool, mode: GlobalMode) -> bool {
        if self.state != AdversaryState::Exiting || self.mover.tile != house_exit {
            return false;
        }
        if frightened_active && !self.immune {
            self.state = AdversaryState::Frightened;
            self.mover.speed = FRIGHTENED_SPEED;
        } else {
            self.state = mode.into();
            self.mover.speed = self.base_speed;
        }
        true
    }

    pub fn clear_immunity(&mut self) {
        self.immune = false;
    }

    pub fn frighten(&mut self) -> bool {
        // Housed adversaries stay put; only agents already in the maze turn.
        if matches!(self.state, AdversaryState::InHouse | AdversaryState::Eaten) {
            return false;
        }
        self.state = AdversaryState::Frightened;
        self.mover.speed = FRIGHTENED_SPEED;
        self.immune = false;
        true
    }

    /// Frightened -> global mode when the countdown runs out.
    pub fn calm(&mut self, mode: GlobalMode) -> bool {
        if self.state != AdversaryState::Frightened {
            return false;
        }
        self.state = mode.into();
        self.mover.speed = self.base_speed;
        true
    }

    /// Forced relabel by the scheduler. Only Scatter/Chase adversaries follow it.
    pub fn apply_mode(&mut self, mode: GlobalMode) {
        if matches!(self.state, AdversaryState::Scatter | AdversaryState::Chase) {
            self.state = mode.into();
        }
    }

    pub fn mark_eaten(&mut self, maze: &Maze) -> bool {
        if matches!(self.state, AdversaryState::InHouse | AdversaryState::Eaten) {
            return false;
        }
        self.state = AdversaryState::Eaten;
        self.mover.speed = EATEN_SPEED;
        self.immune = true;
        self.route = shortest_path(maze, self.mover.tile, self.mover.spawn());
        self.route_cursor = 1;
        true
    }

    pub fn update<R: Rng + ?Sized>(
        &mut self,
        maze: &Maze,
        ctx: &TargetContext,
        eaten_ratio: f32,
        rng: &mut R,
    ) {
        if self.state == AdversaryState::Eaten && self.mover.tile == self.mover.spawn() {
            self.state = AdversaryState::InHouse;
            self.route = None;
            self.route_cursor = 0;
            self.mover.speed = self.base_speed;
        }

        if self.variant == AdversaryVariant::Leader
            && !matches!(self.state, AdversaryState::Frightened | AdversaryState::Eaten)
        {
            let ratio = eaten_ratio.clamp(0.0, 1.0);
            self.mover.speed = self.base_speed + (self.rage_speed - self.base_speed) * ratio;
        }

        if self.mover.at_decision_point() {
            self.mover.dir = match self.state {
                AdversaryState::InHouse => Direction::None,
                AdversaryState::Frightened => {
                    let legal = self.legal_directions(maze);
                    legal.choose(rng).copied().unwrap_or(self.mover.dir)
                }
                AdversaryState::Eaten => self.follow_route(maze),
                AdversaryState::Exiting | AdversaryState::Scatter | AdversaryState::Chase => {
                    match self.target_tile(ctx) {
                        Some(target) => self.steer_toward(maze, target),
                        None => self.mover.dir,
                    }
                }
            };
        }

        self.mover.advance(maze);
    }

    /// Non-wall directions from the current tile, without the reversal unless
    /// it is the only way out.
    pub fn legal_directions(&self, maze: &Maze) -> Vec<Direction> {
        let tile = self.mover.tile;
        let mut legal: Vec<Direction> = [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ]
        .into_iter()
        .filter(|dir| !maze.is_wall(tile.step(*dir)))
        .collect();
        let reverse = self.mover.dir.opposite();
        if legal.len() > 1 {
            legal.retain(|dir| *dir != reverse);
        }
        legal
    }

    /// Legal direction whose next tile is closest to `target`. Exact ties
    /// resolve by `Direction::PRIORITY`.
    pub fn steer_toward(&self, maze: &Maze, target: Vec2) -> Direction {
        let legal = self.legal_directions(maze);
        let mut best = self.mover.dir;
        let mut best_distance = f32::INFINITY;
        for dir in Direction::PRIORITY {
            if !legal.contains(&dir) {
                continue;
            }
            let distance = self.mover.tile.step(dir).distance(target);
            if distance < best_distance {
                best_distance = distance;
                best = dir;
            }
        }
        best
    }

    fn follow_route(&mut self, maze: &Maze) -> Direction {
        let tile = self.mover.tile;
        let Some(route) = self.route.as_ref() else {
            return Direction::None;
        };
        while route.get(self.route_cursor) == Some(&tile) {
            self.route_cursor += 1;
        }
        let Some(&next) = route.get(self.route_cursor) else {
            return Direction::None;
        };
        if let Some(dir) = step_direction(maze, tile, next) {
            self.route_cursor += 1;
            return dir;
        }

        // Knocked off the cached route while finishing the previous tile.
        self.route = shortest_path(maze, tile, self.mover.spawn());
        self.route_cursor = 1;
        let next = self
            .route
            .as_ref()
            .and_then(|route| route.get(self.route_cursor).copied());
        match next.and_then(|next| step_direction(maze, tile, next)) {
            Some(dir) => {
                self.route_cursor += 1;
                dir
            }
            None => Direction::None,
        }
    }

    #[cfg(test)]
    pub(super) fn set_state(&mut self, state: AdversaryState) {
        self.state = state;
    }

    pub fn to_view(&self) -> AdversaryView {
        AdversaryView {
            id: self.variant.id(),
            variant: self.variant,
            tile: self.mover.tile,
            pos: self.mover.pos,
            dir: self.mover.dir,
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::engine::mover::tile_center;

    fn classic() -> Maze {
        Maze::classic().expect("classic layout parses")
    }

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() <= eps
    }

    fn ctx(player_tile: Vec2, player_dir: Direction) -> TargetContext {
        TargetContext {
            player_tile,
            player_dir,
            leader_tile: Some(Vec2::new(9, 8)),
            house_exit: Vec2::new(9, 8),
        }
    }

    fn adversary_at(variant: AdversaryVariant, tile: Vec2, dir: Direction, state: AdversaryState) -> Adversary {
        let maze = classic();
        let mut adversary = Adversary::new(variant, maze.adversary_spawn(variant), 1);
        adversary.mover.place(tile, dir);
        adversary.state = state;
        adversary
    }

    #[test]
    fn leader_targets_player_tile() {
        let leader = adversary_at(AdversaryVariant::Leader, Vec2::new(1, 1), Direction::None, AdversaryState::Chase);
        for dir in Direction::PRIORITY {
            assert_eq!(leader.chase_target(&ctx(Vec2::new(5, 14), dir)), Vec2::new(5, 14));
        }
    }

    #[test]
    fn ambusher_leads_player_with_upward_quirk() {
        let ambusher = adversary_at(AdversaryVariant::Ambusher, Vec2::new(1, 1), Direction::None, AdversaryState::Chase);
        let player = Vec2::new(9, 16);
        assert_eq!(ambusher.chase_target(&ctx(player, Direction::Left)), Vec2::new(5, 16));
        assert_eq!(ambusher.chase_target(&ctx(player, Direction::Right)), Vec2::new(13, 16));
        assert_eq!(ambusher.chase_target(&ctx(player, Direction::Down)), Vec2::new(9, 20));
        assert_eq!(ambusher.chase_target(&ctx(player, Direction::Up)), Vec2::new(5, 12));
        assert_eq!(ambusher.chase_target(&ctx(player, Direction::None)), player);
    }

    #[test]
    fn opportunist_reflects_leader_through_pivot() {
        let opportunist = adversary_at(AdversaryVariant::Opportunist, Vec2::new(1, 1), Direction::None, AdversaryState::Chase);
        let context = ctx(Vec2::new(9, 16), Direction::Left);
        // pivot (7,16), leader (9,8)
        assert_eq!(opportunist.chase_target(&context), Vec2::new(5, 24));

        let without_leader = TargetContext {
            leader_tile: None,
            ..context
        };
        assert_eq!(opportunist.chase_target(&without_leader), Vec2::new(9, 16));
    }

    #[test]
    fn fickle_retreats_when_close() {
        let player = Vec2::new(9, 16);
        let far = adversary_at(AdversaryVariant::Fickle, Vec2::new(1, 1), Direction::None, AdversaryState::Chase);
        assert_eq!(far.chase_target(&ctx(player, Direction::Left)), player);

        let near = adversary_at(AdversaryVariant::Fickle, Vec2::new(9, 14), Direction::None, AdversaryState::Chase);
        assert_eq!(near.chase_target(&ctx(player, Direction::Left)), Vec2::new(1, 20));

        // exactly 8 tiles away still counts as near
        let edge = adversary_at(AdversaryVariant::Fickle, Vec2::new(1, 16), Direction::None, AdversaryState::Chase);
        assert_eq!(edge.chase_target(&ctx(player, Direction::Left)), Vec2::new(1, 20));
    }

    #[test]
    fn exiting_targets_house_exit_and_scatter_targets_corner() {
        let exiting = adversary_at(AdversaryVariant::Opportunist, Vec2::new(9, 10), Direction::None, AdversaryState::Exiting);
        let context = ctx(Vec2::new(9, 16), Direction::Left);
        assert_eq!(exiting.target_tile(&context), Some(Vec2::new(9, 8)));

        let scatter = adversary_at(AdversaryVariant::Leader, Vec2::new(1, 1), Direction::None, AdversaryState::Scatter);
        assert_eq!(scatter.target_tile(&context), Some(Vec2::new(17, 1)));

        let frightened = adversary_at(AdversaryVariant::Leader, Vec2::new(1, 1), Direction::None, AdversaryState::Frightened);
        assert_eq!(frightened.target_tile(&context), None);
    }

    #[test]
    fn exact_ties_follow_up_left_down_right() {
        let maze = classic();
        let horizontal = adversary_at(AdversaryVariant::Leader, Vec2::new(9, 4), Direction::None, AdversaryState::Chase);
        assert_eq!(horizontal.steer_toward(&maze, Vec2::new(9, 10)), Direction::Left);

        let junction = adversary_at(AdversaryVariant::Leader, Vec2::new(4, 4), Direction::None, AdversaryState::Chase);
        assert_eq!(junction.steer_toward(&maze, Vec2::new(6, 6)), Direction::Down);
    }

    #[test]
    fn reversal_only_when_forced() {
        let maze = classic();
        let moving_left = adversary_at(AdversaryVariant::Leader, Vec2::new(9, 4), Direction::Left, AdversaryState::Chase);
        assert_eq!(moving_left.legal_directions(&maze), vec![Direction::Left]);
        assert_eq!(moving_left.steer_toward(&maze, Vec2::new(17, 4)), Direction::Left);

        // (2,8) is the closed end of a side pocket.
        let dead_end = adversary_at(AdversaryVariant::Leader, Vec2::new(2, 8), Direction::Right, AdversaryState::Chase);
        assert_eq!(dead_end.legal_directions(&maze), vec![Direction::Left]);
        assert_eq!(dead_end.steer_toward(&maze, Vec2::new(17, 1)), Direction::Left);
    }

    #[test]
    fn frightened_never_reverses_at_junction() {
        let maze = classic();
        let context = ctx(Vec2::new(9, 16), Direction::Left);
        let mut seen = HashSet::new();
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut adversary = adversary_at(AdversaryVariant::Ambusher, Vec2::new(4, 4), Direction::Right, AdversaryState::Frightened);
            adversary.update(&maze, &context, 0.0, &mut rng);
            assert_ne!(adversary.mover.dir, Direction::Left, "seed {seed}");
            seen.insert(adversary.mover.dir);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn house_release_waits_for_variant_delay() {
        let maze = classic();
        let mut ambusher = Adversary::new(AdversaryVariant::Ambusher, maze.adversary_spawn(AdversaryVariant::Ambusher), 1);
        for _ in 0..239 {
            assert!(!ambusher.tick_house());
        }
        assert!(ambusher.tick_house());
        assert_eq!(ambusher.state(), AdversaryState::Exiting);
        assert!(!ambusher.tick_house());
    }

    #[test]
    fn exit_lands_in_mode_or_frightened_unless_immune() {
        let exit = Vec2::new(9, 8);
        let mut adversary = adversary_at(AdversaryVariant::Opportunist, exit, Direction::Up, AdversaryState::Exiting);
        assert!(adversary.finish_exit(exit, true, GlobalMode::Chase));
        assert_eq!(adversary.state(), AdversaryState::Frightened);
        assert!(approx_eq(adversary.mover.speed, FRIGHTENED_SPEED, 1e-6));

        let mut immune = adversary_at(AdversaryVariant::Opportunist, exit, Direction::Up, AdversaryState::Exiting);
        immune.immune = true;
        assert!(immune.finish_exit(exit, true, GlobalMode::Chase));
        assert_eq!(immune.state(), AdversaryState::Chase);
        assert!(approx_eq(immune.mover.speed, immune.base_speed(), 1e-6));

        let mut inside = adversary_at(AdversaryVariant::Opportunist, Vec2::new(9, 9), Direction::Up, AdversaryState::Exiting);
        assert!(!inside.finish_exit(exit, false, GlobalMode::Scatter));
        assert_eq!(inside.state(), AdversaryState::Exiting);
    }

    #[test]
    fn undefined_transitions_are_no_ops() {
        let maze = classic();
        let mut in_house = adversary_at(AdversaryVariant::Fickle, Vec2::new(10, 10), Direction::None, AdversaryState::InHouse);
        assert!(!in_house.frighten());
        assert!(!in_house.mark_eaten(&maze));
        assert!(!in_house.calm(GlobalMode::Chase));
        in_house.apply_mode(GlobalMode::Chase);
        assert_eq!(in_house.state(), AdversaryState::InHouse);

        let mut eaten = adversary_at(AdversaryVariant::Leader, Vec2::new(9, 4), Direction::Left, AdversaryState::Frightened);
        assert!(eaten.mark_eaten(&maze));
        assert!(!eaten.mark_eaten(&maze));
        assert!(!eaten.frighten());
        eaten.apply_mode(GlobalMode::Scatter);
        assert_eq!(eaten.state(), AdversaryState::Eaten);

        let mut scatter = adversary_at(AdversaryVariant::Leader, Vec2::new(9, 4), Direction::Left, AdversaryState::Scatter);
        assert!(!scatter.calm(GlobalMode::Chase));
        assert_eq!(scatter.state(), AdversaryState::Scatter);
        scatter.apply_mode(GlobalMode::Chase);
        assert_eq!(scatter.state(), AdversaryState::Chase);
    }

    #[test]
    fn eaten_adversary_follows_route_home() {
        let maze = classic();
        let context = ctx(Vec2::new(9, 16), Direction::Left);
        let mut rng = StdRng::seed_from_u64(7);
        let mut ambusher = adversary_at(AdversaryVariant::Ambusher, Vec2::new(1, 1), Direction::Right, AdversaryState::Frightened);
        assert!(ambusher.mark_eaten(&maze));
        assert!(ambusher.is_immune());
        assert!(approx_eq(ambusher.mover.speed, EATEN_SPEED, 1e-6));
        let expected_hops = shortest_path(&maze, Vec2::new(1, 1), Vec2::new(8, 10))
            .expect("home reachable")
            .len()
            - 1;

        let mut ticks = 0;
        while ambusher.state() != AdversaryState::InHouse && ticks < 2_000 {
            ambusher.update(&maze, &context, 0.0, &mut rng);
            assert!(maze.is_open(ambusher.tile()));
            ticks += 1;
        }
        assert_eq!(ambusher.state(), AdversaryState::InHouse);
        assert_eq!(ambusher.tile(), Vec2::new(8, 10));
        assert_eq!(ambusher.mover.pos, tile_center(Vec2::new(8, 10)));
        assert!(approx_eq(ambusher.mover.speed, ambusher.base_speed(), 1e-6));
        // 6 ticks per hop at eaten speed, plus the tick that flips to InHouse.
        assert_eq!(ticks, expected_hops * 6 + 1);
    }

    #[test]
    fn eaten_mid_tile_recovers_route() {
        let maze = classic();
        let context = ctx(Vec2::new(9, 16), Direction::Left);
        let mut rng = StdRng::seed_from_u64(3);
        let mut leader = adversary_at(AdversaryVariant::Leader, Vec2::new(4, 4), Direction::Right, AdversaryState::Frightened);
        leader.mover.speed = FRIGHTENED_SPEED;
        leader.update(&maze, &context, 0.0, &mut rng);
        assert!(!leader.mover.at_decision_point());

        assert!(leader.mark_eaten(&maze));
        let mut ticks = 0;
        while leader.state() != AdversaryState::InHouse && ticks < 2_000 {
            leader.update(&maze, &context, 0.0, &mut rng);
            ticks += 1;
        }
        assert_eq!(leader.tile(), Vec2::new(9, 8));
    }

    #[test]
    fn unreachable_home_halts_instead_of_failing() {
        let maze = classic();
        let context = ctx(Vec2::new(9, 16), Direction::Left);
        let mut rng = StdRng::seed_from_u64(1);
        let mut stuck = adversary_at(AdversaryVariant::Leader, Vec2::new(1, 12), Direction::None, AdversaryState::Frightened);
        assert!(stuck.mark_eaten(&maze));
        for _ in 0..30 {
            stuck.update(&maze, &context, 0.0, &mut rng);
        }
        assert_eq!(stuck.state(), AdversaryState::Eaten);
        assert_eq!(stuck.tile(), Vec2::new(1, 12));
        assert_eq!(stuck.mover.dir, Direction::None);
    }

    #[test]
    fn leader_speeds_up_as_pellets_disappear() {
        let maze = classic();
        let context = ctx(Vec2::new(9, 16), Direction::Left);
        let mut rng = StdRng::seed_from_u64(5);
        let mut leader = Adversary::new(AdversaryVariant::Leader, maze.adversary_spawn(AdversaryVariant::Leader), 3);
        leader.state = AdversaryState::Scatter;
        leader.update(&maze, &context, 0.5, &mut rng);
        assert!(approx_eq(leader.mover.speed, 2.45, 1e-5));

        leader.update(&maze, &context, 1.0, &mut rng);
        assert!(approx_eq(leader.mover.speed, 2.5, 1e-5));

        leader.frighten();
        leader.update(&maze, &context, 1.0, &mut rng);
        assert!(approx_eq(leader.mover.speed, FRIGHTENED_SPEED, 1e-6));

        let mut ambusher = Adversary::new(AdversaryVariant::Ambusher, maze.adversary_spawn(AdversaryVariant::Ambusher), 3);
        ambusher.state = AdversaryState::Scatter;
        ambusher.update(&maze, &context, 1.0, &mut rng);
        assert!(approx_eq(ambusher.mover.speed, 2.4, 1e-5));
    }
}
