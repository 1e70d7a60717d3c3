use crate::model::grid::{Grid, Line, SIZE};
use crate::scoring::hand_kind::HandKind;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Number of scored lines: five rows followed by five columns.
pub const LINES: usize = SIZE * 2;

/// Points awarded per [`HandKind`]; scores every row and column of a grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointSystem {
    name: String,
    table: [i32; HandKind::COUNT],
}

impl PointSystem {
    pub fn from_table(name: impl Into<String>, table: [i32; HandKind::COUNT]) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }

    pub fn american() -> Self {
        Self::from_table("american", [0, 2, 5, 10, 15, 20, 25, 50, 75, 100])
    }

    pub fn british() -> Self {
        Self::from_table("british", [0, 1, 3, 6, 12, 5, 10, 16, 30, 30])
    }

    /// Contest-style hidden scoring: every hand other than high card gets a
    /// value drawn uniformly from `-128..=127`.
    pub fn random(seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut table = [0i32; HandKind::COUNT];
        for value in table.iter_mut().skip(1) {
            *value = rng.gen_range(-128..=127);
        }
        Self::from_table(format!("random-{seed}"), table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &[i32; HandKind::COUNT] {
        &self.table
    }

    pub fn points(&self, kind: HandKind) -> i32 {
        self.table[kind.index()]
    }

    pub fn hand_score(&self, line: &Line) -> i32 {
        self.points(HandKind::classify(line))
    }

    /// Per-line subscores, rows `0..5` then columns `5..10`.
    pub fn line_scores(&self, grid: &Grid) -> [i32; LINES] {
        core::array::from_fn(|line| {
            if line < SIZE {
                self.hand_score(&grid.row(line))
            } else {
                self.hand_score(&grid.column(line - SIZE))
            }
        })
    }

    pub fn score(&self, grid: &Grid) -> i32 {
        self.line_scores(grid).iter().sum()
    }

    /// Hand kinds for every line, in the same order as [`Self::line_scores`].
    pub fn line_kinds(grid: &Grid) -> [HandKind; LINES] {
        core::array::from_fn(|line| {
            if line < SIZE {
                HandKind::classify(&grid.row(line))
            } else {
                HandKind::classify(&grid.column(line - SIZE))
            }
        })
    }
}

impl Default for PointSystem {
    fn default() -> Self {
        Self::american()
    }
}
