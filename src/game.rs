use arrayvec::ArrayVec;
use rustc_hash::{FxHashSet, FxHasher};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub fn new(row: usize, col: usize) -> Self {
        Point { row, col }
    }

    /// The point one cell over in the given direction, or None when the move
    /// would leave the grid past the top or left edge. Moving down or right
    /// is unbounded here; `Level::cell_at` rejects those overruns.
    pub fn neighbour(self, m: Move) -> Option<Point> {
        match m {
            Move::Up => self.row.checked_sub(1).map(|row| Point { row, col: self.col }),
            Move::Down => Some(Point {
                row: self.row + 1,
                col: self.col,
            }),
            Move::Left => self.col.checked_sub(1).map(|col| Point { row: self.row, col }),
            Move::Right => Some(Point {
                row: self.row,
                col: self.col + 1,
            }),
        }
    }

    pub fn distance_squared(a: Point, b: Point) -> usize {
        let dr = a.row.abs_diff(b.row);
        let dc = a.col.abs_diff(b.col);
        dr * dr + dc * dc
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

pub const ALL_MOVES: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

impl Move {
    pub fn opposite(&self) -> Move {
        match self {
            Move::Up => Move::Down,
            Move::Down => Move::Up,
            Move::Left => Move::Right,
            Move::Right => Move::Left,
        }
    }

    /// The direction leading from `from` to an adjacent point `to`, or None
    /// when the two points are not exactly one cell apart.
    pub fn between(from: Point, to: Point) -> Option<Move> {
        ALL_MOVES.into_iter().find(|&m| from.neighbour(m) == Some(to))
    }

    pub fn as_char(&self) -> char {
        match self {
            Move::Up => 'w',
            Move::Down => 's',
            Move::Left => 'a',
            Move::Right => 'd',
        }
    }

    pub fn from_char(c: char) -> Option<Move> {
        match c {
            'w' | 'W' => Some(Move::Up),
            's' | 'S' => Some(Move::Down),
            'a' | 'A' => Some(Move::Left),
            'd' | 'D' => Some(Move::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Up => write!(f, "Up"),
            Move::Down => write!(f, "Down"),
            Move::Left => write!(f, "Left"),
            Move::Right => write!(f, "Right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    Floor,
    Wall,
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub kind: CellType,
    pub pos: Point,
}

/// The static map: walls, floor and targets. Immutable once built; a
/// `GameState` and a `Solver` borrow it read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    cells: Vec<CellType>,
    width: usize,
    height: usize,
}

impl Level {
    /// Build a level from rows of cells. Rows must be equal in length; the
    /// parser in `levels` enforces the full border and size contract.
    pub fn new(rows: &[Vec<CellType>]) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.len());
        let mut cells = Vec::with_capacity(height * width);
        for row in rows {
            debug_assert_eq!(row.len(), width, "level rows differ in length");
            cells.extend_from_slice(row);
        }
        Level {
            cells,
            width,
            height,
        }
    }

    /// (height, width)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn cell_at(&self, pos: Point) -> Option<Cell> {
        if pos.row < self.height && pos.col < self.width {
            Some(Cell {
                kind: self.cells[pos.row * self.width + pos.col],
                pos,
            })
        } else {
            None
        }
    }

    /// The cell reached by applying `m` once from `pos`, or None when that
    /// leaves the grid.
    pub fn neighbour(&self, pos: Point, m: Move) -> Option<Cell> {
        pos.neighbour(m).and_then(|next| self.cell_at(next))
    }

    /// The up-to-four neighbouring cells that are not walls.
    pub fn adjacent_non_wall(&self, pos: Point) -> ArrayVec<Cell, 4> {
        let mut result = ArrayVec::new();
        for m in ALL_MOVES {
            if let Some(cell) = self.neighbour(pos, m) {
                if cell.kind != CellType::Wall {
                    result.push(cell);
                }
            }
        }
        result
    }

    pub fn is_target(&self, pos: Point) -> bool {
        self.cell_at(pos).is_some_and(|cell| cell.kind == CellType::Target)
    }
}

/// A crate together with the directions it can currently be pushed along.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushableBox {
    pub crate_pos: Point,
    pub allowed_pushes: ArrayVec<Move, 4>,
}

/// The crate layout of a `GameState` as an ordered set, with the player
/// projected away. States sharing a `ReducedState` are candidates for
/// player-reachability deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReducedState {
    boxes: Vec<Point>,
}

impl ReducedState {
    fn new(boxes: &FxHashSet<Point>) -> Self {
        let mut boxes: Vec<Point> = boxes.iter().copied().collect();
        boxes.sort_unstable();
        ReducedState { boxes }
    }
}

/// The dynamic overlay on a `Level`: where the player and the crates stand.
/// Cloned freely by the solver as a value snapshot.
#[derive(Debug, Clone)]
pub struct GameState<'a> {
    level: &'a Level,
    player: Point,
    boxes: FxHashSet<Point>,
}

impl<'a> GameState<'a> {
    pub fn new(level: &'a Level, player: Point, boxes: &[Point]) -> Self {
        let boxes: FxHashSet<Point> = boxes.iter().copied().collect();
        debug_assert!(
            level.cell_at(player).is_some_and(|cell| cell.kind != CellType::Wall),
            "player starts on a wall or outside the level"
        );
        debug_assert!(!boxes.contains(&player), "player starts on a crate");
        debug_assert!(
            boxes
                .iter()
                .all(|&pos| level.cell_at(pos).is_some_and(|cell| cell.kind != CellType::Wall)),
            "crate on a wall or outside the level"
        );
        GameState {
            level,
            player,
            boxes,
        }
    }

    pub fn player_pos(&self) -> Point {
        self.player
    }

    pub fn box_positions(&self) -> &FxHashSet<Point> {
        &self.boxes
    }

    pub fn has_box_at(&self, pos: Point) -> bool {
        self.boxes.contains(&pos)
    }

    fn is_walkable(&self, cell: Cell) -> bool {
        cell.kind != CellType::Wall && !self.boxes.contains(&cell.pos)
    }

    /// One player move. Walking into a wall, pushing a crate into a wall or
    /// another crate, and pushing past the grid edge all leave the state
    /// unchanged; this never fails.
    pub fn apply_move(&mut self, m: Move) {
        let Some(cell) = self.level.neighbour(self.player, m) else {
            return;
        };
        if cell.kind == CellType::Wall {
            return;
        }
        if self.boxes.contains(&cell.pos) {
            let Some(behind) = self.level.neighbour(cell.pos, m) else {
                return;
            };
            if behind.kind == CellType::Wall || self.boxes.contains(&behind.pos) {
                return;
            }
            self.boxes.remove(&cell.pos);
            self.boxes.insert(behind.pos);
        }
        self.player = cell.pos;
    }

    pub fn apply_moves(&mut self, moves: &[Move]) {
        for &m in moves {
            self.apply_move(m);
        }
    }

    pub fn is_victory(&self) -> bool {
        self.boxes.iter().all(|&pos| self.level.is_target(pos))
    }

    /// Neighbours of `pos` the player could step onto: in bounds, not a
    /// wall, not a crate. The player's own cell is also skipped; the
    /// pathfinder admits `start == goal` before ever asking for neighbours,
    /// so a search can still begin at the player.
    pub fn adjacent_walkable(&self, pos: Point) -> ArrayVec<Point, 4> {
        let mut result = ArrayVec::new();
        for cell in self.level.adjacent_non_wall(pos) {
            if !self.boxes.contains(&cell.pos) && cell.pos != self.player {
                result.push(cell.pos);
            }
        }
        result
    }

    /// Every crate that admits at least one push, with its pushable
    /// directions. A push along an axis needs both cells on that axis
    /// walkable: one for the player to stand on, one for the crate to move
    /// into.
    ///
    /// Returns an empty list outright when any crate off a target sits in a
    /// corner (two adjacent wall-like sides): that crate can never move
    /// again, so the whole state is lost no matter what the other crates
    /// allow.
    pub fn pushable_boxes(&self) -> SmallVec<[PushableBox; 8]> {
        let mut result = SmallVec::new();
        for &crate_pos in &self.boxes {
            let up = self.level.neighbour(crate_pos, Move::Up);
            let down = self.level.neighbour(crate_pos, Move::Down);
            let left = self.level.neighbour(crate_pos, Move::Left);
            let right = self.level.neighbour(crate_pos, Move::Right);

            let walk_up = up.is_some_and(|cell| self.is_walkable(cell));
            let walk_down = down.is_some_and(|cell| self.is_walkable(cell));
            let walk_left = left.is_some_and(|cell| self.is_walkable(cell));
            let walk_right = right.is_some_and(|cell| self.is_walkable(cell));

            // out of bounds counts the same as a wall here
            let wall_up = up.map_or(true, |cell| cell.kind == CellType::Wall);
            let wall_down = down.map_or(true, |cell| cell.kind == CellType::Wall);
            let wall_left = left.map_or(true, |cell| cell.kind == CellType::Wall);
            let wall_right = right.map_or(true, |cell| cell.kind == CellType::Wall);

            if !self.level.is_target(crate_pos)
                && ((wall_up && wall_right)
                    || (wall_right && wall_down)
                    || (wall_down && wall_left)
                    || (wall_left && wall_up))
            {
                return SmallVec::new();
            }

            let mut allowed = ArrayVec::new();
            if walk_up && walk_down {
                allowed.push(Move::Up);
                allowed.push(Move::Down);
            }
            if walk_left && walk_right {
                allowed.push(Move::Left);
                allowed.push(Move::Right);
            }
            if !allowed.is_empty() {
                result.push(PushableBox {
                    crate_pos,
                    allowed_pushes: allowed,
                });
            }
        }
        result
    }

    pub fn reduced_state(&self) -> ReducedState {
        ReducedState::new(&self.boxes)
    }

    pub fn count_boxes_on_target(&self) -> usize {
        self.boxes.iter().filter(|&&pos| self.level.is_target(pos)).count()
    }
}

impl PartialEq for GameState<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.player == other.player && self.boxes == other.boxes
    }
}

impl Eq for GameState<'_> {}

impl Hash for GameState<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.player.hash(state);
        // commutative combine so the crate set hashes the same in any order
        let mut combined = 0u64;
        for pos in &self.boxes {
            let mut hasher = FxHasher::default();
            pos.hash(&mut hasher);
            combined ^= hasher.finish();
        }
        state.write_u64(combined);
    }
}

impl fmt::Display for GameState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (height, width) = self.level.dimensions();
        for row in 0..height {
            let mut line = String::new();
            for col in 0..width {
                let pos = Point::new(row, col);
                let kind = self.level.cell_at(pos).map(|cell| cell.kind);
                let ch = if pos == self.player {
                    '@'
                } else if self.boxes.contains(&pos) {
                    if kind == Some(CellType::Target) { 'X' } else { 'x' }
                } else {
                    match kind {
                        Some(CellType::Wall) => '#',
                        Some(CellType::Target) => '.',
                        _ => ' ',
                    }
                };
                line.push(ch);
            }
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Parse a test map without the file parser's size and border checks:
    /// `#` wall, `.` target, `@` player, `x` crate, `X` crate on target,
    /// anything else floor. Empty lines are skipped so raw string literals
    /// can start on their own line.
    pub(crate) fn parse(map: &str) -> (Level, Point, Vec<Point>) {
        let mut rows = Vec::new();
        let mut player = None;
        let mut boxes = Vec::new();
        for (row, line) in map.lines().filter(|line| !line.is_empty()).enumerate() {
            let mut cells = Vec::new();
            for (col, ch) in line.chars().enumerate() {
                let kind = match ch {
                    '#' => CellType::Wall,
                    '.' | 'X' => CellType::Target,
                    _ => CellType::Floor,
                };
                if ch == '@' {
                    player = Some(Point::new(row, col));
                }
                if ch == 'x' || ch == 'X' {
                    boxes.push(Point::new(row, col));
                }
                cells.push(kind);
            }
            rows.push(cells);
        }
        (Level::new(&rows), player.expect("fixture has no player"), boxes)
    }
}
