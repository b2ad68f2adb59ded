use crate::game::{Move, Point};
use arrayvec::ArrayVec;
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A walkable trail of points headed for `goal`. The ordering is what the
/// frontier heap pops first: closest to the goal by squared euclidean
/// distance, ties broken by the shorter trail.
#[derive(Debug, Clone)]
pub struct Path {
    goal: Point,
    points: Vec<Point>,
}

impl Path {
    fn single(goal: Point, start: Point) -> Self {
        Path {
            goal,
            points: vec![start],
        }
    }

    fn extended(&self, next: Point) -> Self {
        let mut points = self.points.clone();
        points.push(next);
        Path {
            goal: self.goal,
            points,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn last(&self) -> Point {
        *self.points.last().expect("path is never empty")
    }

    fn priority(&self) -> (usize, usize) {
        (Point::distance_squared(self.last(), self.goal), self.points.len())
    }
}

// BinaryHeap pops the greatest element; invert the comparison so the best
// candidate (lowest priority key) is the one popped.
impl Ord for Path {
    fn cmp(&self, other: &Self) -> Ordering {
        other.priority().cmp(&self.priority())
    }
}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.priority() == other.priority()
    }
}

impl Eq for Path {}

/// Best-first search over whatever graph the adjacency function describes.
/// One instance owns its visited set and frontier and reuses them across
/// calls; both are cleared on entry to every search.
pub struct Pathfinder {
    visited: FxHashSet<Point>,
    frontier: BinaryHeap<Path>,
}

impl Pathfinder {
    pub fn new() -> Self {
        Pathfinder {
            visited: FxHashSet::default(),
            frontier: BinaryHeap::new(),
        }
    }

    /// Some walkable path from `start` to `goal`, or None when the goal
    /// cannot be reached. `start == goal` succeeds with a one-point path.
    /// The heuristic ordering does not make the result the globally shortest
    /// path, only a valid one.
    pub fn find_path<F>(&mut self, start: Point, goal: Point, adjacent: F) -> Option<Path>
    where
        F: Fn(Point) -> ArrayVec<Point, 4>,
    {
        self.visited.clear();
        self.frontier.clear();
        self.frontier.push(Path::single(goal, start));

        while let Some(best) = self.frontier.pop() {
            let current = best.last();
            if self.visited.contains(&current) {
                continue;
            }
            if current == goal {
                return Some(best);
            }
            self.visited.insert(current);
            for next in adjacent(current) {
                if !self.visited.contains(&next) {
                    self.frontier.push(best.extended(next));
                }
            }
        }
        None
    }
}

impl Default for Pathfinder {
    fn default() -> Self {
        Self::new()
    }
}

/// The moves walking a path vertex by vertex; a one-point path yields
/// nothing.
pub fn path_to_moves(path: &Path) -> Vec<Move> {
    path.points()
        .windows(2)
        .filter_map(|pair| Move::between(pair[0], pair[1]))
        .collect()
}

pub fn moves_to_string(moves: &[Move]) -> String {
    moves.iter().map(|m| m.as_char()).collect()
}

/// Parse a `wasd` move string; characters naming no move are skipped.
pub fn moves_from_str(s: &str) -> Vec<Move> {
    s.chars().filter_map(Move::from_char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::fixtures::parse;
    use crate::game::GameState;

    const OPEN_ROOMS: &str = r#"
####################
#         x        #
#     @   #  ##### #
#         #        #
#######   #####  ###
#     x   #        #
#  ####   #  #######
#         #        #
#                  #
####################
"#;

    const CLOSED_ROOMS: &str = r#"
####################
#         x    #   #
#     @   #  #######
#         #        #
#######   #####  ###
#   # x   #        #
#  ####   #  #######
#         #        #
#                  #
####################
"#;

    fn assert_path_sound(path: &Path, start: Point, goal: Point, state: &GameState) {
        let points = path.points();
        assert_eq!(points[0], start);
        assert_eq!(*points.last().unwrap(), goal);
        for pair in points.windows(2) {
            assert!(
                state.adjacent_walkable(pair[0]).contains(&pair[1]),
                "{} -> {} is not a walkable step",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_find_path_reachable_goals() {
        let (level, player, boxes) = parse(OPEN_ROOMS);
        let state = GameState::new(&level, player, &boxes);
        let mut pathfinder = Pathfinder::new();

        for goal in [Point::new(5, 5), Point::new(1, 16)] {
            let path = pathfinder
                .find_path(player, goal, |pos| state.adjacent_walkable(pos))
                .unwrap();
            assert_path_sound(&path, player, goal, &state);
        }
    }

    #[test]
    fn test_find_path_unreachable_goals() {
        let (level, player, boxes) = parse(CLOSED_ROOMS);
        let state = GameState::new(&level, player, &boxes);
        let mut pathfinder = Pathfinder::new();

        // (5, 5) is fenced in by walls and a crate, (1, 16) by walls alone
        for goal in [Point::new(5, 5), Point::new(1, 16)] {
            let path = pathfinder.find_path(player, goal, |pos| state.adjacent_walkable(pos));
            assert!(path.is_none());
        }
    }

    #[test]
    fn test_find_path_adjacent_goal() {
        let (level, player, boxes) = parse(OPEN_ROOMS);
        let state = GameState::new(&level, player, &boxes);
        let mut pathfinder = Pathfinder::new();

        let goal = Point::new(3, 6);
        let path = pathfinder
            .find_path(player, goal, |pos| state.adjacent_walkable(pos))
            .unwrap();
        assert_eq!(path_to_moves(&path), vec![Move::Down]);
        assert_eq!(moves_to_string(&path_to_moves(&path)), "s");
    }

    #[test]
    fn test_find_path_start_is_goal() {
        let (level, player, boxes) = parse(OPEN_ROOMS);
        let state = GameState::new(&level, player, &boxes);
        let mut pathfinder = Pathfinder::new();

        let path = pathfinder
            .find_path(player, player, |pos| state.adjacent_walkable(pos))
            .unwrap();
        assert_eq!(path.points(), [player]);
        assert!(path_to_moves(&path).is_empty());
    }

    #[test]
    fn test_find_path_goal_outside_grid() {
        let (level, player, boxes) = parse(OPEN_ROOMS);
        let state = GameState::new(&level, player, &boxes);
        let mut pathfinder = Pathfinder::new();

        let path = pathfinder.find_path(player, Point::new(30, 60), |pos| {
            state.adjacent_walkable(pos)
        });
        assert!(path.is_none());
    }

    #[test]
    fn test_pathfinder_reuse_resets_buffers() {
        let (level, player, boxes) = parse(CLOSED_ROOMS);
        let state = GameState::new(&level, player, &boxes);
        let mut pathfinder = Pathfinder::new();

        // an exhausted search must not poison the next one
        assert!(pathfinder
            .find_path(player, Point::new(1, 16), |pos| state.adjacent_walkable(pos))
            .is_none());
        let goal = Point::new(8, 10);
        let path = pathfinder
            .find_path(player, goal, |pos| state.adjacent_walkable(pos))
            .unwrap();
        assert_path_sound(&path, player, goal, &state);
    }

    #[test]
    fn test_moves_round_trip() {
        let moves = vec![Move::Up, Move::Left, Move::Down, Move::Right, Move::Down];
        let encoded = moves_to_string(&moves);
        assert_eq!(encoded, "wasds");
        assert_eq!(moves_from_str(&encoded), moves);
    }

    #[test]
    fn test_moves_from_str_skips_unknown() {
        assert_eq!(moves_from_str("w zD!"), vec![Move::Up, Move::Right]);
        assert_eq!(moves_from_str(""), Vec::<Move>::new());
    }
}
