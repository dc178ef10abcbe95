use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    /// Order used to break exact distance ties when an adversary picks a move.
    pub const PRIORITY: [Direction; 4] = [
        Direction::Up,
        Direction::Left,
        Direction::Down,
        Direction::Right,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::None => (0, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::None => Self::None,
        }
    }

    pub fn is_none(self) -> bool {
        self == Self::None
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile reached by moving `steps` cells along `dir`. No wrapping.
    pub fn offset(self, dir: Direction, steps: i32) -> Self {
        let (dx, dy) = dir.delta();
        Self {
            x: self.x + dx * steps,
            y: self.y + dy * steps,
        }
    }

    pub fn step(self, dir: Direction) -> Self {
        self.offset(dir, 1)
    }

    pub fn distance(self, other: Vec2) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Continuous position in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tile {
    Wall,
    Empty,
    SmallPellet,
    PowerPellet,
    PlayerSpawn,
    AdversarySpawn(u8),
    HouseExitMarker,
    /// Renderer-only tunnel mouth; walkable like `Empty`.
    Tunnel,
    OutOfBounds,
}

impl Tile {
    pub fn is_wall(self) -> bool {
        self == Self::Wall
    }

    pub fn pellet(self) -> Option<PelletKind> {
        match self {
            Self::SmallPellet => Some(PelletKind::Small),
            Self::PowerPellet => Some(PelletKind::Power),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PelletKind {
    Small,
    Power,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalMode {
    Scatter,
    Chase,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdversaryState {
    InHouse,
    Exiting,
    Scatter,
    Chase,
    Frightened,
    Eaten,
}

impl From<GlobalMode> for AdversaryState {
    fn from(mode: GlobalMode) -> Self {
        match mode {
            GlobalMode::Scatter => Self::Scatter,
            GlobalMode::Chase => Self::Chase,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdversaryVariant {
    Leader,
    Ambusher,
    Opportunist,
    Fickle,
}

impl AdversaryVariant {
    pub const ALL: [AdversaryVariant; 4] = [
        AdversaryVariant::Leader,
        AdversaryVariant::Ambusher,
        AdversaryVariant::Opportunist,
        AdversaryVariant::Fickle,
    ];

    pub fn id(self) -> u8 {
        match self {
            Self::Leader => 0,
            Self::Ambusher => 1,
            Self::Opportunist => 2,
            Self::Fickle => 3,
        }
    }

    pub fn index(self) -> usize {
        self.id() as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Paused,
    Playing,
    RoundCleared,
    GameOver,
}

/// One (scatter, chase) pair of the mode schedule, in ticks. `None` never expires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Wave {
    pub scatter_ticks: Option<u32>,
    pub chase_ticks: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PelletView {
    pub x: i32,
    pub y: i32,
    pub kind: PelletKind,
}

#[derive(Clone, Debug, Serialize)]
pub struct MazeView {
    pub width: i32,
    pub height: i32,
    #[serde(rename = "tileSize")]
    pub tile_size: f32,
    pub codes: Vec<Vec<u16>>,
    pub pellets: Vec<PelletView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub tile: Vec2,
    pub pos: Point,
    pub dir: Direction,
    pub facing: Direction,
    #[serde(rename = "animFrame")]
    pub anim_frame: u8,
    pub lives: u32,
    pub score: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct AdversaryView {
    pub id: u8,
    pub variant: AdversaryVariant,
    pub tile: Vec2,
    pub pos: Point,
    pub dir: Direction,
    pub state: AdversaryState,
}

#[derive(Clone, Debug, Serialize)]
pub struct FruitView {
    pub tile: Vec2,
    #[serde(rename = "spawnedAtTick")]
    pub spawned_at_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    PelletEaten {
        x: i32,
        y: i32,
    },
    PowerPelletEaten {
        x: i32,
        y: i32,
    },
    AdversaryEaten {
        variant: AdversaryVariant,
        bonus: u32,
    },
    BonusLife {
        lives: u32,
    },
    LifeLost {
        #[serde(rename = "livesLeft")]
        lives_left: u32,
    },
    FruitSpawned {
        fruit: FruitView,
    },
    FruitTaken {
        score: u32,
    },
    FruitExpired,
    ModeChanged {
        mode: GlobalMode,
        #[serde(rename = "waveIndex")]
        wave_index: usize,
    },
    FrightenedEnded,
    RoundCleared {
        #[serde(rename = "nextRound")]
        next_round: u32,
    },
    GameOver {
        score: u32,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub round: u32,
    pub phase: SessionPhase,
    pub mode: GlobalMode,
    #[serde(rename = "waveIndex")]
    pub wave_index: usize,
    #[serde(rename = "frightenedTicks")]
    pub frightened_ticks: u32,
    #[serde(rename = "frightenedFlashing")]
    pub frightened_flashing: bool,
    #[serde(rename = "pelletsRemaining")]
    pub pellets_remaining: u32,
    #[serde(rename = "pelletsTotal")]
    pub pellets_total: u32,
    pub player: PlayerView,
    pub adversaries: Vec<AdversaryView>,
    pub fruit: Option<FruitView>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SessionSummary {
    pub score: u32,
    #[serde(rename = "roundReached")]
    pub round_reached: u32,
    pub ticks: u64,
    #[serde(rename = "pelletsEaten")]
    pub pellets_eaten: u32,
    #[serde(rename = "adversariesEaten")]
    pub adversaries_eaten: u32,
    #[serde(rename = "fruitsTaken")]
    pub fruits_taken: u32,
    #[serde(rename = "livesLost")]
    pub lives_lost: u32,
}
