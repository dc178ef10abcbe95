use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::constants::{
    COLLISION_DISTANCE, FRUIT_LIFETIME_TICKS, FRUIT_PELLET_THRESHOLDS, FRUIT_SCORE, FRUIT_TILE,
    LIFE_LOST_PAUSE_TICKS, POWER_PELLET_SCORE, ROUND_START_PAUSE_TICKS,
    SESSION_START_PAUSE_TICKS, SMALL_PELLET_SCORE,
};
use crate::maze::{Maze, MazeError};
use crate::types::{
    AdversaryState, AdversaryVariant, Direction, FruitView, MazeView, PelletKind, RuntimeEvent,
    SessionPhase, SessionSummary, Snapshot,
};

mod adversary;
mod mover;
mod player;
mod scheduler;

pub use self::adversary::{Adversary, TargetContext};
pub use self::mover::{tile_center, Mover};
pub use self::player::Player;
pub use self::scheduler::{ModeScheduler, ScheduleTick};

#[derive(Clone, Debug, Default)]
struct SessionStats {
    pellets_eaten: u32,
    adversaries_eaten: u32,
    fruits_taken: u32,
    lives_lost: u32,
}

#[derive(Clone, Debug)]
pub struct GameEngineOptions {
    pub seed: u64,
    pub starting_round: u32,
}

impl Default for GameEngineOptions {
    fn default() -> Self {
        Self {
            seed: 1,
            starting_round: 1,
        }
    }
}

/// One play session: owns the maze, the agents, the mode clock and the
/// round lifecycle. Nothing here is global; hosts drive it with `tick()`.
#[derive(Clone, Debug)]
pub struct GameEngine {
    options: GameEngineOptions,
    maze: Maze,
    rng: StdRng,
    player: Player,
    adversaries: Vec<Adversary>,
    scheduler: ModeScheduler,

    phase: SessionPhase,
    pause_ticks: u32,
    round: u32,
    tick_counter: u64,
    fruit_spawned_at: Option<u64>,
    fruit_stage: usize,
    events: Vec<RuntimeEvent>,
    stats: SessionStats,
}

impl GameEngine {
    pub fn new(options: GameEngineOptions) -> Result<Self, MazeError> {
        Ok(Self::with_maze(Maze::classic()?, options))
    }

    pub fn with_maze(maze: Maze, options: GameEngineOptions) -> Self {
        let round = options.starting_round.max(1);
        let player = Player::new(maze.player_spawn());
        let adversaries = AdversaryVariant::ALL
            .iter()
            .map(|variant| Adversary::new(*variant, maze.adversary_spawn(*variant), round))
            .collect();
        let mut engine = Self {
            rng: StdRng::seed_from_u64(options.seed),
            options,
            maze,
            player,
            adversaries,
            scheduler: ModeScheduler::new(),
            phase: SessionPhase::Paused,
            pause_ticks: 0,
            round,
            tick_counter: 0,
            fruit_spawned_at: None,
            fruit_stage: 0,
            events: Vec::new(),
            stats: SessionStats::default(),
        };
        engine.init_session();
        engine
    }

    /// Fresh session: score, lives, round counter and random stream start over.
    pub fn init_session(&mut self) {
        self.rng = StdRng::seed_from_u64(self.options.seed);
        self.round = self.options.starting_round.max(1);
        self.tick_counter = 0;
        self.stats = SessionStats::default();
        self.events.clear();
        self.player.reset_session();
        self.apply_difficulty();
        self.reset_round_state();
        self.pause(SESSION_START_PAUSE_TICKS);
    }

    /// Fresh pellets, every agent back to spawn, mode clock restarted.
    pub fn init_round(&mut self) {
        self.reset_round_state();
        self.pause(ROUND_START_PAUSE_TICKS);
    }

    pub fn tick(&mut self) {
        match self.phase {
            SessionPhase::GameOver => return,
            SessionPhase::RoundCleared => {
                self.tick_counter += 1;
                self.init_round();
                return;
            }
            SessionPhase::Paused => {
                self.tick_counter += 1;
                self.pause_ticks = self.pause_ticks.saturating_sub(1);
                if self.pause_ticks == 0 {
                    self.phase = SessionPhase::Playing;
                }
                return;
            }
            SessionPhase::Playing => {}
        }
        self.tick_counter += 1;

        self.player.update(&self.maze);
        self.consume_pellets();
        self.update_adversaries();
        self.update_fruit();
        self.resolve_collisions();

        if self.phase != SessionPhase::GameOver && self.maze.remaining_pellets() == 0 {
            self.complete_round();
        }
    }

    pub fn set_direction(&mut self, dir: Direction) {
        self.player.set_direction(dir);
    }

    pub fn is_round_over(&self) -> bool {
        self.phase == SessionPhase::RoundCleared
    }

    pub fn is_session_over(&self) -> bool {
        self.phase == SessionPhase::GameOver
    }

    pub fn score(&self) -> u32 {
        self.player.score()
    }

    pub fn lives(&self) -> u32 {
        self.player.lives()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    pub fn seed(&self) -> u64 {
        self.options.seed
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn adversaries(&self) -> &[Adversary] {
        &self.adversaries
    }

    pub fn scheduler(&self) -> &ModeScheduler {
        &self.scheduler
    }

    pub fn fruit(&self) -> Option<FruitView> {
        self.fruit_spawned_at.map(|spawned_at_tick| FruitView {
            tile: FRUIT_TILE,
            spawned_at_tick,
        })
    }

    pub fn maze_view(&self) -> MazeView {
        self.maze.to_view()
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        Snapshot {
            tick: self.tick_counter,
            round: self.round,
            phase: self.phase,
            mode: self.scheduler.mode(),
            wave_index: self.scheduler.wave_index(),
            frightened_ticks: self.scheduler.frightened_remaining(),
            frightened_flashing: self.scheduler.is_flashing(),
            pellets_remaining: self.maze.remaining_pellets(),
            pellets_total: self.maze.total_pellets(),
            player: self.player.to_view(),
            adversaries: self.adversaries.iter().map(Adversary::to_view).collect(),
            fruit: self.fruit(),
            events: if include_events {
                std::mem::take(&mut self.events)
            } else {
                Vec::new()
            },
        }
    }

    pub fn build_summary(&self) -> SessionSummary {
        SessionSummary {
            score: self.player.score(),
            round_reached: self.round,
            ticks: self.tick_counter,
            pellets_eaten: self.stats.pellets_eaten,
            adversaries_eaten: self.stats.adversaries_eaten,
            fruits_taken: self.stats.fruits_taken,
            lives_lost: self.stats.lives_lost,
        }
    }

    fn pause(&mut self, ticks: u32) {
        self.phase = SessionPhase::Paused;
        self.pause_ticks = ticks;
    }

    fn reset_round_state(&mut self) {
        self.maze.reload();
        self.player.reset();
        for adversary in &mut self.adversaries {
            adversary.reset();
        }
        self.scheduler.reset();
        self.fruit_spawned_at = None;
        self.fruit_stage = 0;
    }

    fn apply_difficulty(&mut self) {
        for adversary in &mut self.adversaries {
            adversary.apply_difficulty(self.round);
        }
    }

    fn award(&mut self, points: u32) {
        if self.player.add_score(points) {
            self.events.push(RuntimeEvent::BonusLife {
                lives: self.player.lives(),
            });
        }
    }

    fn consume_pellets(&mut self) {
        let tile = self.player.tile();
        let Some(kind) = self.maze.consume_pellet(tile) else {
            return;
        };
        self.stats.pellets_eaten += 1;
        match kind {
            PelletKind::Small => {
                self.award(SMALL_PELLET_SCORE);
                self.events.push(RuntimeEvent::PelletEaten {
                    x: tile.x,
                    y: tile.y,
                });
            }
            PelletKind::Power => {
                self.award(POWER_PELLET_SCORE);
                self.scheduler.activate_frightened();
                for adversary in &mut self.adversaries {
                    adversary.clear_immunity();
                    adversary.frighten();
                }
                self.events.push(RuntimeEvent::PowerPelletEaten {
                    x: tile.x,
                    y: tile.y,
                });
            }
        }

        if let Some(threshold) = FRUIT_PELLET_THRESHOLDS.get(self.fruit_stage) {
            if self.maze.pellets_eaten() >= *threshold {
                self.fruit_stage += 1;
                self.fruit_spawned_at = Some(self.tick_counter);
                if let Some(fruit) = self.fruit() {
                    self.events.push(RuntimeEvent::FruitSpawned { fruit });
                }
            }
        }
    }

    fn update_adversaries(&mut self) {
        let house_exit = self.maze.house_exit();
        for adversary in &mut self.adversaries {
            adversary.tick_house();
            adversary.finish_exit(
                house_exit,
                self.scheduler.is_frightened(),
                self.scheduler.mode(),
            );
        }

        let schedule = self.scheduler.advance();
        let mode = self.scheduler.mode();
        if schedule.frightened_ended {
            for adversary in &mut self.adversaries {
                adversary.calm(mode);
            }
            self.events.push(RuntimeEvent::FrightenedEnded);
        }
        if schedule.mode_flipped {
            self.events.push(RuntimeEvent::ModeChanged {
                mode,
                wave_index: self.scheduler.wave_index(),
            });
        }
        for adversary in &mut self.adversaries {
            adversary.apply_mode(mode);
        }

        let eaten_ratio = if self.maze.total_pellets() == 0 {
            0.0
        } else {
            self.maze.pellets_eaten() as f32 / self.maze.total_pellets() as f32
        };
        for idx in 0..self.adversaries.len() {
            // The Leader moves first, so later variants see its fresh tile.
            let ctx = TargetContext {
                player_tile: self.player.tile(),
                player_dir: self.player.dir(),
                leader_tile: self
                    .adversaries
                    .iter()
                    .find(|adversary| adversary.variant == AdversaryVariant::Leader)
                    .map(Adversary::tile),
                house_exit,
            };
            self.adversaries[idx].update(&self.maze, &ctx, eaten_ratio, &mut self.rng);
        }
    }

    fn update_fruit(&mut self) {
        let Some(spawned_at) = self.fruit_spawned_at else {
            return;
        };
        if self.tick_counter.saturating_sub(spawned_at) > FRUIT_LIFETIME_TICKS {
            self.fruit_spawned_at = None;
            self.events.push(RuntimeEvent::FruitExpired);
        } else if self.player.tile() == FRUIT_TILE {
            self.fruit_spawned_at = None;
            self.stats.fruits_taken += 1;
            self.award(FRUIT_SCORE);
            self.events.push(RuntimeEvent::FruitTaken { score: FRUIT_SCORE });
        }
    }

    fn resolve_collisions(&mut self) {
        let player_pos = self.player.mover.pos;
        let mut caught = false;
        for idx in 0..self.adversaries.len() {
            if player_pos.distance(self.adversaries[idx].mover.pos) >= COLLISION_DISTANCE {
                continue;
            }
            match self.adversaries[idx].state() {
                AdversaryState::Frightened => {
                    if !self.adversaries[idx].mark_eaten(&self.maze) {
                        continue;
                    }
                    let bonus = self.scheduler.next_eaten_bonus();
                    self.stats.adversaries_eaten += 1;
                    self.award(bonus);
                    self.events.push(RuntimeEvent::AdversaryEaten {
                        variant: self.adversaries[idx].variant,
                        bonus,
                    });
                }
                AdversaryState::Eaten | AdversaryState::InHouse => {}
                AdversaryState::Exiting | AdversaryState::Scatter | AdversaryState::Chase => {
                    caught = true;
                }
            }
        }
        if caught {
            self.lose_life();
        }
    }

    fn lose_life(&mut self) {
        self.stats.lives_lost += 1;
        let lives_left = self.player.lose_life();
        self.events.push(RuntimeEvent::LifeLost { lives_left });
        if lives_left == 0 {
            self.phase = SessionPhase::GameOver;
            self.events.push(RuntimeEvent::GameOver {
                score: self.player.score(),
            });
            return;
        }
        self.player.reset();
        for adversary in &mut self.adversaries {
            adversary.reset();
        }
        self.pause(LIFE_LOST_PAUSE_TICKS);
    }

    fn complete_round(&mut self) {
        self.round += 1;
        self.apply_difficulty();
        self.phase = SessionPhase::RoundCleared;
        self.events.push(RuntimeEvent::RoundCleared {
            next_round: self.round,
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::constants::{
        FRIGHTENED_TICKS, FRUIT_LIFETIME_TICKS, FRUIT_TILE, STARTING_LIVES,
    };
    use crate::engine::{GameEngine, GameEngineOptions};
    use crate::types::{
        AdversaryState, AdversaryVariant, Direction, GlobalMode, RuntimeEvent, SessionPhase, Vec2,
    };

    fn make_engine(seed: u64) -> GameEngine {
        GameEngine::new(GameEngineOptions {
            seed,
            starting_round: 1,
        })
        .expect("classic maze builds")
    }

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() <= eps
    }

    fn skip_pause(engine: &mut GameEngine) {
        while engine.phase == SessionPhase::Paused {
            engine.tick();
        }
    }

    fn place_player(engine: &mut GameEngine, tile: Vec2) {
        engine.player.mover.place(tile, Direction::None);
    }

    fn pellet_tiles(engine: &GameEngine) -> Vec<Vec2> {
        engine
            .maze
            .pellets()
            .into_iter()
            .map(|pellet| Vec2::new(pellet.x, pellet.y))
            .collect()
    }

    #[test]
    fn same_seed_produces_same_progression() {
        let mut a = make_engine(424_242);
        let mut b = make_engine(424_242);
        let script = [
            Direction::Left,
            Direction::Up,
            Direction::Right,
            Direction::Down,
        ];

        for tick in 0..4_000usize {
            let dir = script[(tick / 90) % script.len()];
            a.set_direction(dir);
            b.set_direction(dir);
            a.tick();
            b.tick();
            let sa = serde_json::to_string(&a.build_snapshot(true)).expect("snapshot serializes");
            let sb = serde_json::to_string(&b.build_snapshot(true)).expect("snapshot serializes");
            assert_eq!(sa, sb, "diverged at tick {tick}");
            if a.is_session_over() {
                break;
            }
        }
    }

    #[test]
    fn build_snapshot_drains_events_when_requested() {
        let mut engine = make_engine(333);
        engine.events.push(RuntimeEvent::FruitExpired);

        let kept = engine.build_snapshot(false);
        assert!(kept.events.is_empty());
        let first = engine.build_snapshot(true);
        let second = engine.build_snapshot(true);
        assert_eq!(first.events.len(), 1);
        assert_eq!(second.events.len(), 0);
    }

    #[test]
    fn snapshot_uses_client_field_names() {
        let mut engine = make_engine(5);
        let value = serde_json::to_value(engine.build_snapshot(false)).expect("snapshot serializes");
        assert_eq!(value["phase"], "paused");
        assert_eq!(value["mode"], "scatter");
        assert_eq!(value["pelletsRemaining"], 146);
        assert_eq!(value["player"]["animFrame"], 0);
        assert_eq!(value["player"]["facing"], "left");
        assert_eq!(value["adversaries"][2]["variant"], "opportunist");
        assert_eq!(value["adversaries"][2]["state"], "in_house");
        assert!(value["fruit"].is_null());
    }

    #[test]
    fn session_starts_paused_and_nothing_moves() {
        let mut engine = make_engine(9);
        engine.set_direction(Direction::Left);
        let spawn = engine.player.mover.pos;
        for _ in 0..59 {
            engine.tick();
        }
        assert_eq!(engine.phase(), SessionPhase::Paused);
        assert_eq!(engine.player.mover.pos, spawn);
        assert_eq!(engine.scheduler.elapsed(), 0);

        engine.tick();
        assert_eq!(engine.phase(), SessionPhase::Playing);
        engine.tick();
        assert_ne!(engine.player.mover.pos, spawn);
        assert_eq!(engine.scheduler.elapsed(), 1);
    }

    #[test]
    fn adversaries_leave_the_house_in_order() {
        let mut engine = make_engine(11);
        skip_pause(&mut engine);

        engine.tick();
        assert_eq!(engine.adversaries[0].state(), AdversaryState::Scatter);
        assert_eq!(engine.adversaries[1].state(), AdversaryState::InHouse);

        for _ in 1..239 {
            engine.tick();
        }
        assert_eq!(engine.adversaries[1].state(), AdversaryState::InHouse);
        engine.tick();
        assert_eq!(engine.adversaries[1].state(), AdversaryState::Exiting);
        assert_eq!(engine.adversaries[2].state(), AdversaryState::InHouse);
        assert_eq!(engine.adversaries[3].state(), AdversaryState::InHouse);
    }

    #[test]
    fn eaten_bonus_doubles_then_resets_after_power_pellet() {
        let mut engine = make_engine(21);
        skip_pause(&mut engine);
        let spot = Vec2::new(9, 16);
        place_player(&mut engine, spot);

        for idx in 0..3 {
            engine.adversaries[idx].set_state(AdversaryState::Scatter);
            engine.adversaries[idx].mover.place(spot, Direction::None);
        }
        engine.scheduler.activate_frightened();
        for adversary in &mut engine.adversaries {
            adversary.frighten();
        }
        engine.resolve_collisions();
        assert_eq!(engine.score(), 1_400);
        let bonuses: Vec<u32> = engine
            .build_snapshot(true)
            .events
            .into_iter()
            .filter_map(|event| match event {
                RuntimeEvent::AdversaryEaten { bonus, .. } => Some(bonus),
                _ => None,
            })
            .collect();
        assert_eq!(bonuses, vec![200, 400, 800]);
        assert_eq!(engine.adversaries[3].state(), AdversaryState::InHouse);

        // Power pellet at (1,3); the fourth adversary waits next to it.
        let power = Vec2::new(1, 3);
        place_player(&mut engine, power);
        engine.adversaries[3].set_state(AdversaryState::Chase);
        engine.adversaries[3].mover.place(power, Direction::None);
        engine.consume_pellets();
        assert_eq!(engine.adversaries[3].state(), AdversaryState::Frightened);
        assert_eq!(engine.adversaries[0].state(), AdversaryState::Eaten);

        engine.resolve_collisions();
        assert_eq!(engine.score(), 1_400 + 50 + 200);
        assert_eq!(engine.lives(), STARTING_LIVES + 1);
        assert_eq!(engine.build_summary().adversaries_eaten, 4);
        let events = engine.build_snapshot(true).events;
        assert!(events
            .iter()
            .any(|event| matches!(event, RuntimeEvent::BonusLife { lives } if *lives == 4)));
    }

    #[test]
    fn lethal_touch_costs_a_life_and_resets_agents() {
        let mut engine = make_engine(31);
        skip_pause(&mut engine);
        place_player(&mut engine, Vec2::new(4, 4));
        engine.adversaries[0].set_state(AdversaryState::Chase);
        engine.adversaries[0].mover.place(Vec2::new(4, 4), Direction::Left);
        // Eaten and in-house adversaries on the same spot never hurt.
        engine.adversaries[1].set_state(AdversaryState::Eaten);
        engine.adversaries[1].mover.place(Vec2::new(4, 4), Direction::Left);

        engine.resolve_collisions();
        assert_eq!(engine.lives(), STARTING_LIVES - 1);
        assert_eq!(engine.phase(), SessionPhase::Paused);
        assert_eq!(engine.player.tile(), engine.maze.player_spawn());
        assert!(engine
            .adversaries
            .iter()
            .all(|adversary| adversary.state() == AdversaryState::InHouse));
    }

    #[test]
    fn last_life_ends_the_session() {
        let mut engine = make_engine(41);
        for _ in 0..STARTING_LIVES {
            skip_pause(&mut engine);
            place_player(&mut engine, Vec2::new(4, 4));
            engine.adversaries[0].set_state(AdversaryState::Scatter);
            engine.adversaries[0].mover.place(Vec2::new(4, 4), Direction::None);
            engine.resolve_collisions();
        }
        assert!(engine.is_session_over());
        assert_eq!(engine.lives(), 0);
        assert_eq!(engine.build_summary().lives_lost, STARTING_LIVES);

        let frozen = engine.tick_count();
        engine.tick();
        assert_eq!(engine.tick_count(), frozen);
        let events = engine.build_snapshot(true).events;
        assert!(matches!(events.last(), Some(RuntimeEvent::GameOver { .. })));

        engine.init_session();
        assert_eq!(engine.lives(), STARTING_LIVES);
        assert_eq!(engine.phase(), SessionPhase::Paused);
    }

    #[test]
    fn power_pellet_eaten_before_collision_in_same_tick() {
        let mut engine = make_engine(61);
        skip_pause(&mut engine);
        engine.player.mover.place(Vec2::new(1, 4), Direction::Up);
        engine.set_direction(Direction::Up);
        // One step short of the center of (1, 3).
        for _ in 0..11 {
            engine.player.update(&engine.maze);
        }
        assert_eq!(engine.player.tile(), Vec2::new(1, 4));
        engine.adversaries[1].set_state(AdversaryState::Chase);
        engine.adversaries[1].mover.place(Vec2::new(1, 3), Direction::None);

        engine.tick();
        assert_eq!(engine.player.tile(), Vec2::new(1, 3));
        assert_eq!(engine.adversaries[1].state(), AdversaryState::Eaten);
        assert_eq!(engine.lives(), STARTING_LIVES);
        assert_eq!(engine.score(), 250);
        assert_eq!(engine.phase(), SessionPhase::Playing);
    }

    #[test]
    fn frightened_ending_on_contact_tick_costs_a_life() {
        let mut engine = make_engine(62);
        skip_pause(&mut engine);
        engine.scheduler.activate_frightened();
        for _ in 0..FRIGHTENED_TICKS - 1 {
            engine.scheduler.advance();
        }
        assert_eq!(engine.scheduler.frightened_remaining(), 1);
        place_player(&mut engine, Vec2::new(4, 4));
        engine.adversaries[1].set_state(AdversaryState::Frightened);
        engine.adversaries[1].mover.place(Vec2::new(4, 4), Direction::None);

        engine.tick();
        let events = engine.build_snapshot(true).events;
        assert!(events
            .iter()
            .any(|event| matches!(event, RuntimeEvent::FrightenedEnded)));
        assert!(!events
            .iter()
            .any(|event| matches!(event, RuntimeEvent::AdversaryEaten { .. })));
        assert_eq!(engine.lives(), STARTING_LIVES - 1);
        assert_eq!(engine.phase(), SessionPhase::Paused);
    }

    #[test]
    fn clearing_every_pellet_starts_next_round() {
        let mut engine = make_engine(51);
        skip_pause(&mut engine);
        let last = Vec2::new(1, 20);
        for tile in pellet_tiles(&engine) {
            if tile != last {
                engine.maze.consume_pellet(tile);
            }
        }
        assert_eq!(engine.maze.remaining_pellets(), 1);
        place_player(&mut engine, last);

        engine.tick();
        assert_eq!(engine.maze.remaining_pellets(), 0);
        assert!(engine.is_round_over());
        assert_eq!(engine.round(), 2);
        assert!(approx_eq(engine.adversaries[1].base_speed(), 2.25, 1e-5));
        let events = engine.build_snapshot(true).events;
        assert!(events
            .iter()
            .any(|event| matches!(event, RuntimeEvent::RoundCleared { next_round: 2 })));

        engine.tick();
        assert!(!engine.is_round_over());
        assert_eq!(engine.phase(), SessionPhase::Paused);
        assert_eq!(engine.maze.remaining_pellets(), engine.maze.total_pellets());
        assert_eq!(engine.player.tile(), engine.maze.player_spawn());
        assert_eq!(engine.scheduler.mode(), GlobalMode::Scatter);
        assert!(engine.fruit().is_none());
        assert_eq!(engine.score(), 10);
    }

    #[test]
    fn fruit_appears_after_ten_pellets_and_expires() {
        let mut engine = make_engine(61);
        skip_pause(&mut engine);
        let tiles = pellet_tiles(&engine);
        for tile in tiles.iter().take(9) {
            engine.maze.consume_pellet(*tile);
        }
        place_player(&mut engine, tiles[9]);
        engine.consume_pellets();
        let fruit = engine.fruit().expect("fruit active after ten pellets");
        assert_eq!(fruit.tile, FRUIT_TILE);
        assert_eq!(fruit.spawned_at_tick, engine.tick_count());

        engine.tick_counter += FRUIT_LIFETIME_TICKS;
        engine.update_fruit();
        assert!(engine.fruit().is_some());

        engine.tick_counter += 1;
        engine.update_fruit();
        assert!(engine.fruit().is_none());
        let events = engine.build_snapshot(true).events;
        assert!(events.iter().any(|event| matches!(event, RuntimeEvent::FruitExpired)));
    }

    #[test]
    fn reaching_fruit_tile_collects_it_once() {
        let mut engine = make_engine(71);
        skip_pause(&mut engine);
        engine.fruit_spawned_at = Some(engine.tick_count());
        place_player(&mut engine, FRUIT_TILE);
        engine.update_fruit();
        engine.update_fruit();
        assert_eq!(engine.score(), 100);
        assert_eq!(engine.build_summary().fruits_taken, 1);
        assert!(engine.fruit().is_none());
    }

    #[test]
    fn second_fruit_needs_seventy_pellets() {
        let mut engine = make_engine(81);
        skip_pause(&mut engine);
        let tiles = pellet_tiles(&engine);
        for tile in tiles.iter().take(69) {
            place_player(&mut engine, *tile);
            engine.consume_pellets();
        }
        assert_eq!(engine.fruit_stage, 1);
        engine.fruit_spawned_at = None;

        place_player(&mut engine, tiles[69]);
        engine.consume_pellets();
        assert_eq!(engine.fruit_stage, 2);
        assert!(engine.fruit().is_some());

        engine.fruit_spawned_at = None;
        place_player(&mut engine, tiles[70]);
        engine.consume_pellets();
        assert!(engine.fruit().is_none());
    }

    #[test]
    fn frightened_expiry_returns_adversaries_to_mode() {
        let mut engine = make_engine(91);
        skip_pause(&mut engine);
        engine.tick();
        assert_eq!(engine.adversaries[0].state(), AdversaryState::Scatter);

        engine.scheduler.activate_frightened();
        for adversary in &mut engine.adversaries {
            adversary.frighten();
        }
        assert_eq!(engine.adversaries[0].state(), AdversaryState::Frightened);
        assert_eq!(engine.adversaries[1].state(), AdversaryState::InHouse);

        for _ in 0..FRIGHTENED_TICKS - 1 {
            engine.update_adversaries();
        }
        assert_eq!(engine.adversaries[0].state(), AdversaryState::Frightened);
        engine.update_adversaries();
        assert_eq!(engine.adversaries[0].state(), AdversaryState::Scatter);
        assert!(approx_eq(
            engine.adversaries[0].mover.speed,
            engine.adversaries[0].base_speed(),
            0.5
        ));
        let events = engine.build_snapshot(true).events;
        assert!(events
            .iter()
            .any(|event| matches!(event, RuntimeEvent::FrightenedEnded)));
    }

    #[test]
    fn mode_flips_after_first_scatter_window() {
        let mut engine = make_engine(101);
        skip_pause(&mut engine);
        for _ in 0..420 {
            engine.update_adversaries();
        }
        assert_eq!(engine.scheduler.mode(), GlobalMode::Chase);
        assert_eq!(engine.adversaries[0].state(), AdversaryState::Chase);
        let events = engine.build_snapshot(true).events;
        assert!(events.iter().any(|event| matches!(
            event,
            RuntimeEvent::ModeChanged {
                mode: GlobalMode::Chase,
                wave_index: 0
            }
        )));
    }

    #[test]
    fn leader_rage_tracks_pellets_eaten() {
        let mut engine = GameEngine::new(GameEngineOptions {
            seed: 7,
            starting_round: 3,
        })
        .expect("classic maze builds");
        skip_pause(&mut engine);
        let tiles = pellet_tiles(&engine);
        let half = tiles.len() / 2;
        for tile in tiles.iter().take(half) {
            engine.maze.consume_pellet(*tile);
        }
        engine.update_adversaries();
        let leader = &engine.adversaries[AdversaryVariant::Leader.index()];
        let ratio = half as f32 / tiles.len() as f32;
        assert!(approx_eq(leader.mover.speed, 2.4 + 0.1 * ratio, 1e-5));
    }
}
