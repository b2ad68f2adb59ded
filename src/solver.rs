use crate::game::{ALL_MOVES, CellType, GameState, Level, Move, Point, ReducedState};
use crate::paths::{Pathfinder, path_to_moves};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::cmp::Reverse;

/// States already visited, bucketed by crate layout. Each bucket keeps every
/// state seen with that layout whose player positions are mutually
/// unreachable.
type StateBuckets<'a> = FxHashMap<ReducedState, Vec<GameState<'a>>>;

/// A candidate successor: the state after one walk-and-push, and the full
/// move sequence that reaches it from the initial state.
struct NextState<'a> {
    state: GameState<'a>,
    moves: Vec<Move>,
}

/// Depth-first search over push-level states: every edge is a single crate
/// push preceded by the player walk lining it up. The walks are not search
/// branches; the pathfinder synthesises them on demand.
pub struct Solver<'a> {
    level: &'a Level,
    pathfinder: Pathfinder,
    states_explored: usize,
}

impl<'a> Solver<'a> {
    pub fn new(level: &'a Level) -> Self {
        Solver {
            level,
            pathfinder: Pathfinder::new(),
            states_explored: 0,
        }
    }

    pub fn states_explored(&self) -> usize {
        self.states_explored
    }

    /// A move sequence driving `state` to victory, or an empty vec when none
    /// exists. An already-victorious state also yields an empty vec; callers
    /// that care can test victory beforehand.
    pub fn solve(&mut self, state: &GameState<'a>) -> Vec<Move> {
        let mut states = StateBuckets::default();
        self.states_explored = 0;
        self.solve_inner(state, Vec::new(), &mut states)
    }

    fn solve_inner(
        &mut self,
        state: &GameState<'a>,
        prefix: Vec<Move>,
        states: &mut StateBuckets<'a>,
    ) -> Vec<Move> {
        self.states_explored += 1;

        if state.is_victory() {
            return prefix;
        }
        if !self.record_unique(state, states) {
            return Vec::new();
        }
        if self.is_unsolvable(state) {
            return Vec::new();
        }

        let mut pushable = state.pushable_boxes();
        if pushable.is_empty() {
            return Vec::new();
        }
        // favour productive pushes: crates still off their targets first
        pushable.sort_by_key(|pb| self.level.is_target(pb.crate_pos));

        let mut children: SmallVec<[NextState<'a>; 8]> = SmallVec::new();
        for pb in &pushable {
            for &push in &pb.allowed_pushes {
                if let Some(child) = self.make_child(state, &prefix, pb.crate_pos, push) {
                    children.push(child);
                }
            }
        }

        children.sort_by_key(|child| Reverse(child.state.count_boxes_on_target()));
        for child in children {
            let NextState { state: next, moves } = child;
            let result = self.solve_inner(&next, moves, states);
            if !result.is_empty() {
                return result;
            }
        }
        Vec::new()
    }

    /// Walk the player onto the cell opposite the push direction, then push
    /// once. None when no walk path exists.
    fn make_child(
        &mut self,
        state: &GameState<'a>,
        prefix: &[Move],
        crate_pos: Point,
        push: Move,
    ) -> Option<NextState<'a>> {
        let stand = crate_pos.neighbour(push.opposite())?;
        let walk_moves = if stand == state.player_pos() {
            Vec::new()
        } else {
            let path = self
                .pathfinder
                .find_path(state.player_pos(), stand, |pos| state.adjacent_walkable(pos))?;
            path_to_moves(&path)
        };

        let mut next = state.clone();
        next.apply_moves(&walk_moves);
        next.apply_move(push);

        let mut moves = prefix.to_vec();
        moves.extend_from_slice(&walk_moves);
        moves.push(push);
        Some(NextState { state: next, moves })
    }

    /// True when no recorded state is isomorphic to this one; records it.
    /// False prunes the node: an earlier state had the same crate layout and
    /// a mutually reachable player, so everything reachable from here has
    /// already been explored.
    fn record_unique(&mut self, state: &GameState<'a>, states: &mut StateBuckets<'a>) -> bool {
        let bucket = states.entry(state.reduced_state()).or_default();
        for seen in bucket.iter() {
            if self.are_isomorphic(state, seen) {
                return false;
            }
        }
        bucket.push(state.clone());
        true
    }

    /// Two states with identical crate layouts are interchangeable when one
    /// player can walk to the other; the crates obstruct both walks the same
    /// way, so checking one direction is enough.
    fn are_isomorphic(&mut self, a: &GameState, b: &GameState) -> bool {
        a.player_pos() == b.player_pos()
            || self
                .pathfinder
                .find_path(a.player_pos(), b.player_pos(), |pos| a.adjacent_walkable(pos))
                .is_some()
    }

    fn is_unsolvable(&self, state: &GameState) -> bool {
        state.box_positions().iter().any(|&crate_pos| {
            !self.level.is_target(crate_pos)
                && (self.is_frozen_quad(crate_pos, state) || self.is_wall_locked(crate_pos))
        })
    }

    /// Four crates in a 2x2 block can never move again; with the anchor off
    /// its target the position is lost.
    fn is_frozen_quad(&self, crate_pos: Point, state: &GameState) -> bool {
        let right = crate_pos.neighbour(Move::Right);
        let down = crate_pos.neighbour(Move::Down);
        let diagonal = right.and_then(|pos| pos.neighbour(Move::Down));
        match (right, down, diagonal) {
            (Some(r), Some(d), Some(rd)) => {
                state.has_box_at(r) && state.has_box_at(d) && state.has_box_at(rd)
            }
            _ => false,
        }
    }

    /// An untargeted crate flat against a wall can only slide along it. When
    /// the slideable stretch holds no target and the wall beside it has no
    /// opening to escape through, the crate is stuck for good.
    fn is_wall_locked(&self, crate_pos: Point) -> bool {
        ALL_MOVES.iter().any(|&towards_wall| {
            let is_wall = crate_pos
                .neighbour(towards_wall)
                .and_then(|pos| self.level.cell_at(pos))
                .is_some_and(|cell| cell.kind == CellType::Wall);
            is_wall && self.is_locked_along(crate_pos, towards_wall)
        })
    }

    fn is_locked_along(&self, crate_pos: Point, towards_wall: Move) -> bool {
        let (ahead, behind) = match towards_wall {
            Move::Up | Move::Down => (Move::Right, Move::Left),
            Move::Left | Move::Right => (Move::Down, Move::Up),
        };
        self.scan_is_locked(crate_pos, towards_wall, ahead)
            && self.scan_is_locked(crate_pos, towards_wall, behind)
    }

    /// Slide from the crate until something settles the question: a target
    /// on the crate's line or a gap in the wall line means the crate can
    /// still be saved; a wall or the grid edge ends the stretch locked.
    fn scan_is_locked(&self, crate_pos: Point, towards_wall: Move, slide: Move) -> bool {
        let mut pos = crate_pos;
        loop {
            let Some(next) = pos.neighbour(slide) else {
                return true;
            };
            let Some(cell) = self.level.cell_at(next) else {
                return true;
            };
            match cell.kind {
                CellType::Target => return false,
                CellType::Wall => return true,
                CellType::Floor => {}
            }
            let gap = next
                .neighbour(towards_wall)
                .and_then(|pos| self.level.cell_at(pos))
                .is_some_and(|cell| cell.kind != CellType::Wall);
            if gap {
                return false;
            }
            pos = next;
        }
    }
}
