use crate::game::{CellType, Point};
use std::fmt;
use std::fs;
use std::io;

/// Error type for level parsing operations.
#[derive(Debug)]
pub enum LevelError {
    /// IO error when reading from file
    Io(io::Error),
    /// Invalid level content
    InvalidLevel(String),
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Io(err) => write!(f, "IO error: {}", err),
            LevelError::InvalidLevel(msg) => write!(f, "Invalid level: {}", msg),
        }
    }
}

impl From<io::Error> for LevelError {
    fn from(err: io::Error) -> Self {
        LevelError::Io(err)
    }
}

/// A level file parsed into its static grid and starting positions. Crates
/// are normalised out of the grid: a crate cell becomes floor (or a target,
/// for a crate standing on one) and the crate goes into `boxes`.
#[derive(Debug, Clone)]
pub struct ParsedLevel {
    pub rows: Vec<Vec<CellType>>,
    pub player: Point,
    pub boxes: Vec<Point>,
}

impl ParsedLevel {
    /// Parse a level from text, one line per grid row: `#` wall, `.` target,
    /// space floor, `@` the player, `x` a crate, `X` a crate on a target.
    /// Empty lines are skipped.
    pub fn from_text(text: &str) -> Result<Self, LevelError> {
        let mut rows: Vec<Vec<CellType>> = Vec::new();
        let mut player = None;
        let mut boxes = Vec::new();

        for line in text.lines().filter(|line| !line.is_empty()) {
            let row = rows.len();
            let mut cells = Vec::with_capacity(line.len());
            for (col, ch) in line.chars().enumerate() {
                let kind = match ch {
                    '#' => CellType::Wall,
                    ' ' => CellType::Floor,
                    '.' => CellType::Target,
                    '@' => {
                        if player.is_some() {
                            return Err(LevelError::InvalidLevel(
                                "more than one player position specified".to_string(),
                            ));
                        }
                        player = Some(Point::new(row, col));
                        CellType::Floor
                    }
                    'x' => {
                        boxes.push(Point::new(row, col));
                        CellType::Floor
                    }
                    'X' => {
                        boxes.push(Point::new(row, col));
                        CellType::Target
                    }
                    _ => {
                        return Err(LevelError::InvalidLevel(format!(
                            "invalid character '{}' at row {}, column {}",
                            ch, row, col
                        )));
                    }
                };
                cells.push(kind);
            }
            rows.push(cells);
        }

        let player = player
            .ok_or_else(|| LevelError::InvalidLevel("no player position found".to_string()))?;
        Self::sanity_check(player, &rows)?;

        Ok(ParsedLevel { rows, player, boxes })
    }

    /// Parse a level from a text file.
    pub fn from_file(path: &str) -> Result<Self, LevelError> {
        let contents = fs::read_to_string(path)?;
        Self::from_text(&contents)
    }

    fn sanity_check(player: Point, rows: &[Vec<CellType>]) -> Result<(), LevelError> {
        let invalid = |msg: &str| Err(LevelError::InvalidLevel(msg.to_string()));

        let height = rows.len();
        if height < 4 {
            return invalid("level has too few rows");
        }
        let width = rows[0].len();
        if width < 4 {
            return invalid("level has too few columns");
        }
        for row in rows {
            if row.len() != width {
                return invalid("level rows differ in length");
            }
            if row[0] != CellType::Wall || row[width - 1] != CellType::Wall {
                return invalid("invalid level borders");
            }
        }
        for col in 0..width {
            if rows[0][col] != CellType::Wall || rows[height - 1][col] != CellType::Wall {
                return invalid("invalid level borders");
            }
        }
        if player.row == 0 || player.row >= height - 1 || player.col == 0 || player.col >= width - 1
        {
            return invalid("player position is outside the playable area");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_level() {
        let input = "######\n\
                     #@ x #\n\
                     # X. #\n\
                     #    #\n\
                     ######";
        let parsed = ParsedLevel::from_text(input).unwrap();

        assert_eq!(parsed.rows.len(), 5);
        assert_eq!(parsed.rows[0].len(), 6);
        assert_eq!(parsed.player, Point::new(1, 1));
        assert_eq!(parsed.boxes, vec![Point::new(1, 3), Point::new(2, 2)]);

        // the player and crate cells are normalised to plain grid cells
        assert_eq!(parsed.rows[1][1], CellType::Floor);
        assert_eq!(parsed.rows[1][3], CellType::Floor);
        assert_eq!(parsed.rows[2][2], CellType::Target);
        assert_eq!(parsed.rows[2][3], CellType::Target);
    }

    #[test]
    fn test_parse_skips_empty_lines() {
        let input = "\n######\n#@ x.#\n#    #\n######\n\n";
        let parsed = ParsedLevel::from_text(input).unwrap();
        assert_eq!(parsed.rows.len(), 4);
        assert_eq!(parsed.player, Point::new(1, 1));
    }

    #[test]
    fn test_parse_no_player() {
        let input = "#####\n\
                     # x.#\n\
                     #   #\n\
                     #####";
        let err = ParsedLevel::from_text(input).unwrap_err();
        assert!(matches!(err, LevelError::InvalidLevel(_)));
    }

    #[test]
    fn test_parse_two_players() {
        let input = "#####\n\
                     #@@ #\n\
                     #   #\n\
                     #####";
        let err = ParsedLevel::from_text(input).unwrap_err();
        assert!(matches!(err, LevelError::InvalidLevel(_)));
    }

    #[test]
    fn test_parse_too_few_rows() {
        let input = "#####\n\
                     #@  #\n\
                     #####";
        let err = ParsedLevel::from_text(input).unwrap_err();
        assert!(matches!(err, LevelError::InvalidLevel(_)));
    }

    #[test]
    fn test_parse_too_few_columns() {
        let input = "###\n\
                     #@#\n\
                     # #\n\
                     ###";
        let err = ParsedLevel::from_text(input).unwrap_err();
        assert!(matches!(err, LevelError::InvalidLevel(_)));
    }

    #[test]
    fn test_parse_ragged_rows() {
        let input = "#####\n\
                     #@  #\n\
                     #  #\n\
                     #####";
        let err = ParsedLevel::from_text(input).unwrap_err();
        assert!(matches!(err, LevelError::InvalidLevel(_)));
    }

    #[test]
    fn test_parse_broken_border() {
        let input = "#####\n\
                     #@  #\n\
                     #    \n\
                     #####";
        let err = ParsedLevel::from_text(input).unwrap_err();
        assert!(matches!(err, LevelError::InvalidLevel(_)));
    }

    #[test]
    fn test_parse_invalid_character() {
        let input = "#####\n\
                     #@ $#\n\
                     #   #\n\
                     #####";
        let err = ParsedLevel::from_text(input).unwrap_err();
        assert!(matches!(err, LevelError::InvalidLevel(_)));
    }

    #[test]
    fn test_from_file_missing() {
        let err = ParsedLevel::from_file("nonexistent_level.txt").unwrap_err();
        assert!(matches!(err, LevelError::Io(_)));
    }
}
