//! Hex coordinate system for the battlefield (axial coordinates)
//!
//! Uses axial coordinates (q, r) for distance and neighbor math, and odd-r
//! offset coordinates (col, row) for board placement.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Axial hex coordinate
///
/// Ordering is row-major (`r`, then `q`), which is the "lowest hex coordinate"
/// tie-break used by targeting and movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl Ord for HexCoord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.r.cmp(&other.r).then(self.q.cmp(&other.q))
    }
}

impl PartialOrd for HexCoord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Odd-r offset coordinate, the layout players see on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct OffsetCoord {
    pub col: i32,
    pub row: i32,
}

impl OffsetCoord {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    pub fn to_hex(&self) -> HexCoord {
        let q = self.col - (self.row - (self.row & 1)) / 2;
        HexCoord::new(q, self.row)
    }
}

impl HexCoord {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Cube coordinate S (derived from q and r)
    pub fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// Board row/column for this hex
    pub fn to_offset(&self) -> OffsetCoord {
        let col = self.q + (self.r - (self.r & 1)) / 2;
        OffsetCoord::new(col, self.r)
    }

    /// Hex distance (number of steps between the two hexes)
    pub fn distance(&self, other: &Self) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// Row distance, used to break movement ties before column distance
    pub fn row_distance(&self, other: &Self) -> u32 {
        (self.r - other.r).unsigned_abs()
    }

    /// Column distance in board (offset) space
    pub fn col_distance(&self, other: &Self) -> u32 {
        (self.to_offset().col - other.to_offset().col).unsigned_abs()
    }

    /// Get all 6 neighboring hex coordinates (fixed order)
    pub fn neighbors(&self) -> [HexCoord; 6] {
        [
            HexCoord::new(self.q + 1, self.r),
            HexCoord::new(self.q + 1, self.r - 1),
            HexCoord::new(self.q, self.r - 1),
            HexCoord::new(self.q - 1, self.r),
            HexCoord::new(self.q - 1, self.r + 1),
            HexCoord::new(self.q, self.r + 1),
        ]
    }

    pub fn is_adjacent(&self, other: &Self) -> bool {
        self.distance(other) == 1
    }

    /// Get hex coordinates in a line from self to other (inclusive)
    pub fn line_to(&self, other: &Self) -> Vec<HexCoord> {
        let n = self.distance(other) as i32;
        if n == 0 {
            return vec![*self];
        }

        let mut results = Vec::with_capacity((n + 1) as usize);
        for i in 0..=n {
            let t = i as f32 / n as f32;
            // Nudge off exact edges so ties always round the same way
            let q = self.q as f32 + 1e-6 + (other.q - self.q) as f32 * t;
            let r = self.r as f32 + 1e-6 + (other.r - self.r) as f32 * t;
            results.push(Self::round(q, r));
        }
        results
    }

    /// Continue the ray from self through `through` until it is `length` steps long
    ///
    /// The returned hexes exclude self. Used for piercing line shots.
    pub fn ray_through(&self, through: &Self, length: u32) -> Vec<HexCoord> {
        let step = self.distance(through);
        if step == 0 || length == 0 {
            return Vec::new();
        }

        // Scale the direction vector far enough that the line covers `length`
        let scale = (length as i32 + step as i32 - 1) / step as i32;
        let far = HexCoord::new(
            self.q + (through.q - self.q) * scale,
            self.r + (through.r - self.r) * scale,
        );

        self.line_to(&far)
            .into_iter()
            .skip(1)
            .take(length as usize)
            .collect()
    }

    /// Round floating point hex to nearest integer hex
    fn round(q: f32, r: f32) -> Self {
        let s = -q - r;
        let mut rq = q.round();
        let mut rr = r.round();
        let rs = s.round();

        let q_diff = (rq - q).abs();
        let r_diff = (rr - r).abs();
        let s_diff = (rs - s).abs();

        if q_diff > r_diff && q_diff > s_diff {
            rq = -rr - rs;
        } else if r_diff > s_diff {
            rr = -rq - rs;
        }

        Self::new(rq as i32, rr as i32)
    }

    /// Get all hexes within range (inclusive)
    pub fn hexes_in_range(&self, range: u32) -> Vec<HexCoord> {
        let range = range as i32;
        let mut results = Vec::new();
        for q in -range..=range {
            for r in (-range).max(-q - range)..=range.min(-q + range) {
                results.push(HexCoord::new(self.q + q, self.r + r));
            }
        }
        results
    }
}
