use thiserror::Error;

use crate::constants::{MAZE_HEIGHT, MAZE_WIDTH, TILE_SIZE};
use crate::types::{AdversaryVariant, Direction, MazeView, PelletKind, PelletView, Tile, Vec2};

/// Classic 19x22 layout. Codes: `>=100` wall, `0` empty, `1` house-exit marker,
/// `2` small pellet, `3` power pellet, `4` player spawn, `10..=13` adversary
/// spawns, `21` tunnel mouth.
pub const CLASSIC_LAYOUT: &str = "
107 100 100 100 100 100 100 100 100 133 100 100 100 100 100 100 100 100 108
101 2 2 2 2 2 2 2 2 101 2 2 2 2 2 2 2 2 101
101 2 107 108 2 107 133 108 2 101 2 107 133 108 2 107 108 2 101
101 3 105 106 2 105 130 106 2 110 2 105 130 106 2 105 106 3 101
101 2 2 2 2 2 2 2 2 3 2 2 2 2 2 2 2 2 101
101 2 111 112 2 113 0 111 100 133 100 112 0 113 2 111 112 2 101
101 2 2 2 2 101 0 0 0 101 0 0 0 101 2 2 2 2 101
105 100 100 108 2 131 100 112 0 110 0 111 100 132 2 107 100 100 106
21 0 0 101 2 101 0 0 0 10 0 0 0 101 2 101 0 0 21
111 100 100 106 2 110 0 107 112 1 111 108 0 110 2 105 100 100 112
0 0 0 0 2 0 0 101 11 12 13 101 0 0 2 0 0 0 0
111 100 100 108 2 113 0 105 100 100 100 106 0 113 2 107 100 100 112
0 0 0 101 2 101 0 0 0 0 0 0 0 101 2 101 0 0 0
107 100 100 106 2 110 0 111 100 133 100 112 0 110 2 105 100 100 108
101 2 2 2 2 2 2 2 2 101 2 2 2 2 2 2 2 2 101
101 2 111 108 2 111 100 112 0 110 0 111 100 112 2 107 112 2 101
101 3 2 101 2 2 2 2 2 4 2 2 2 2 2 101 2 3 101
131 112 2 110 2 113 2 111 100 133 100 112 2 113 2 110 2 111 132
101 2 2 2 2 101 2 2 2 101 2 2 2 101 2 2 2 2 101
101 2 111 100 100 130 100 112 2 110 2 111 100 130 100 100 112 2 101
101 2 2 2 2 2 2 2 2 3 2 2 2 2 2 2 2 2 101
105 100 100 100 100 100 100 100 100 100 100 100 100 100 100 100 100 100 106
";

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MazeError {
    #[error("layout is empty")]
    Empty,
    #[error("row {row} col {col}: tile code {raw:?} is not a number")]
    InvalidCode { row: usize, col: usize, raw: String },
    #[error("row {row} col {col}: unknown tile code {code}")]
    UnknownCode { row: usize, col: usize, code: u16 },
    #[error("row {row} has {actual} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("layout is {width}x{height}, expected {expected_width}x{expected_height}")]
    Dimensions {
        width: i32,
        height: i32,
        expected_width: i32,
        expected_height: i32,
    },
    #[error("layout has no player spawn")]
    MissingPlayerSpawn,
    #[error("layout has more than one player spawn")]
    DuplicatePlayerSpawn,
    #[error("layout has no spawn for adversary {0}")]
    MissingAdversarySpawn(u8),
    #[error("adversary {0} has more than one spawn")]
    DuplicateAdversarySpawn(u8),
    #[error("layout has no house exit marker")]
    MissingHouseExit,
    #[error("layout has more than one house exit marker")]
    DuplicateHouseExit,
    #[error("house exit marker cannot sit on the top row")]
    HouseExitOnTopRow,
}

#[derive(Clone, Debug)]
pub struct Maze {
    width: i32,
    height: i32,
    codes: Vec<u16>,
    pristine: Vec<Tile>,
    tiles: Vec<Tile>,
    total_pellets: u32,
    remaining_pellets: u32,
    player_spawn: Vec2,
    adversary_spawns: [Vec2; 4],
    house_exit: Vec2,
}

impl Maze {
    pub fn classic() -> Result<Self, MazeError> {
        let maze = Self::parse(CLASSIC_LAYOUT)?;
        if maze.width != MAZE_WIDTH || maze.height != MAZE_HEIGHT {
            return Err(MazeError::Dimensions {
                width: maze.width,
                height: maze.height,
                expected_width: MAZE_WIDTH,
                expected_height: MAZE_HEIGHT,
            });
        }
        Ok(maze)
    }

    /// Parses a whitespace-delimited grid of tile codes. Blank lines are ignored.
    pub fn parse(layout: &str) -> Result<Self, MazeError> {
        let mut codes = Vec::new();
        let mut tiles = Vec::new();
        let mut width = 0usize;
        let mut height = 0usize;
        let mut player_spawn = None;
        let mut adversary_spawns: [Option<Vec2>; 4] = [None; 4];
        let mut marker = None;

        for line in layout.lines().filter(|line| !line.trim().is_empty()) {
            let row = height;
            let mut row_len = 0usize;
            for (col, raw) in line.split_whitespace().enumerate() {
                let code: u16 = raw.parse().map_err(|_| MazeError::InvalidCode {
                    row,
                    col,
                    raw: raw.to_string(),
                })?;
                let tile = tile_from_code(code).ok_or(MazeError::UnknownCode { row, col, code })?;
                let pos = Vec2::new(col as i32, row as i32);
                match tile {
                    Tile::PlayerSpawn => {
                        if player_spawn.replace(pos).is_some() {
                            return Err(MazeError::DuplicatePlayerSpawn);
                        }
                    }
                    Tile::AdversarySpawn(id) => {
                        if adversary_spawns[id as usize].replace(pos).is_some() {
                            return Err(MazeError::DuplicateAdversarySpawn(id));
                        }
                    }
                    Tile::HouseExitMarker => {
                        if marker.replace(pos).is_some() {
                            return Err(MazeError::DuplicateHouseExit);
                        }
                    }
                    _ => {}
                }
                codes.push(code);
                tiles.push(tile);
                row_len += 1;
            }
            if height == 0 {
                width = row_len;
            } else if row_len != width {
                return Err(MazeError::RaggedRow {
                    row,
                    expected: width,
                    actual: row_len,
                });
            }
            height += 1;
        }

        if height == 0 || width == 0 {
            return Err(MazeError::Empty);
        }
        let player_spawn = player_spawn.ok_or(MazeError::MissingPlayerSpawn)?;
        let mut spawns = [Vec2::default(); 4];
        for (id, spawn) in adversary_spawns.iter().enumerate() {
            spawns[id] = spawn.ok_or(MazeError::MissingAdversarySpawn(id as u8))?;
        }
        let marker = marker.ok_or(MazeError::MissingHouseExit)?;
        if marker.y == 0 {
            return Err(MazeError::HouseExitOnTopRow);
        }

        let total_pellets = tiles.iter().filter(|tile| tile.pellet().is_some()).count() as u32;
        Ok(Self {
            width: width as i32,
            height: height as i32,
            codes,
            pristine: tiles.clone(),
            tiles,
            total_pellets,
            remaining_pellets: total_pellets,
            player_spawn,
            adversary_spawns: spawns,
            house_exit: Vec2::new(marker.x, marker.y - 1),
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, pos: Vec2) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn index_of(&self, pos: Vec2) -> Option<usize> {
        if !self.contains(pos) {
            return None;
        }
        Some((pos.y * self.width + pos.x) as usize)
    }

    /// Cells outside the grid report `OutOfBounds`, which is never a wall.
    pub fn tile_at(&self, pos: Vec2) -> Tile {
        match self.index_of(pos) {
            Some(idx) => self.tiles[idx],
            None => Tile::OutOfBounds,
        }
    }

    pub fn is_wall(&self, pos: Vec2) -> bool {
        self.tile_at(pos).is_wall()
    }

    /// Whether an agent may stand on `pos` once horizontal wrap is applied.
    pub fn is_open(&self, pos: Vec2) -> bool {
        let wrapped = self.wrap(pos);
        self.contains(wrapped) && !self.is_wall(wrapped)
    }

    /// Folds a column that left the grid back onto the opposite edge.
    pub fn wrap(&self, pos: Vec2) -> Vec2 {
        if pos.y < 0 || pos.y >= self.height {
            return pos;
        }
        Vec2::new(pos.x.rem_euclid(self.width), pos.y)
    }

    /// Neighbouring cell in `dir`, wrapped through tunnels.
    pub fn neighbor(&self, pos: Vec2, dir: Direction) -> Vec2 {
        self.wrap(pos.step(dir))
    }

    pub fn consume_pellet(&mut self, pos: Vec2) -> Option<PelletKind> {
        debug_assert!(
            pos.y >= 0 && pos.y < self.height,
            "pellet lookup outside maze rows: {pos:?}"
        );
        let idx = self.index_of(pos)?;
        let kind = self.tiles[idx].pellet()?;
        self.tiles[idx] = Tile::Empty;
        self.remaining_pellets = self.remaining_pellets.saturating_sub(1);
        Some(kind)
    }

    pub fn remaining_pellets(&self) -> u32 {
        self.remaining_pellets
    }

    pub fn total_pellets(&self) -> u32 {
        self.total_pellets
    }

    pub fn pellets_eaten(&self) -> u32 {
        self.total_pellets - self.remaining_pellets
    }

    pub fn reload(&mut self) {
        self.tiles.clone_from(&self.pristine);
        self.remaining_pellets = self.total_pellets;
    }

    pub fn player_spawn(&self) -> Vec2 {
        self.player_spawn
    }

    pub fn adversary_spawn(&self, variant: AdversaryVariant) -> Vec2 {
        self.adversary_spawns[variant.index()]
    }

    /// Tile directly above the house-exit marker.
    pub fn house_exit(&self) -> Vec2 {
        self.house_exit
    }

    pub fn pellets(&self) -> Vec<PelletView> {
        let mut pellets = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if let Some(kind) = self.tile_at(Vec2::new(x, y)).pellet() {
                    pellets.push(PelletView { x, y, kind });
                }
            }
        }
        pellets
    }

    pub fn to_view(&self) -> MazeView {
        MazeView {
            width: self.width,
            height: self.height,
            tile_size: TILE_SIZE,
            codes: self
                .codes
                .chunks(self.width as usize)
                .map(|row| row.to_vec())
                .collect(),
            pellets: self.pellets(),
        }
    }
}

fn tile_from_code(code: u16) -> Option<Tile> {
    let tile = match code {
        100.. => Tile::Wall,
        0 => Tile::Empty,
        1 => Tile::HouseExitMarker,
        2 => Tile::SmallPellet,
        3 => Tile::PowerPellet,
        4 => Tile::PlayerSpawn,
        10..=13 => Tile::AdversarySpawn((code - 10) as u8),
        21 => Tile::Tunnel,
        _ => return None,
    };
    Some(tile)
}
