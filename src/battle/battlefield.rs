//! Battlefield: bounded hex board, side halves, and occupancy
//!
//! The board is stored in odd-r offset layout. Side A owns rows
//! `0..height/2`, side B owns the mirrored upper half.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::battle::hex::{HexCoord, OffsetCoord};
use crate::core::types::{Side, UnitId};

/// The battlefield for one match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battlefield {
    pub width: u32,
    pub height: u32,
    occupancy: BTreeMap<HexCoord, UnitId>,
}

impl Battlefield {
    /// Create an empty battlefield
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            occupancy: BTreeMap::new(),
        }
    }

    /// Rows owned by each side
    pub fn half_height(&self) -> u32 {
        self.height / 2
    }

    /// Check if coordinate is within board bounds
    pub fn in_bounds(&self, coord: HexCoord) -> bool {
        let offset = coord.to_offset();
        offset.col >= 0
            && offset.row >= 0
            && offset.col < self.width as i32
            && offset.row < self.height as i32
    }

    /// Check whether a side-local position lies inside that side's half
    pub fn in_half(&self, local: OffsetCoord) -> bool {
        local.col >= 0
            && local.row >= 0
            && local.col < self.width as i32
            && local.row < self.half_height() as i32
    }

    /// Map a side-local board position (row 0 = that side's back row) onto the battlefield
    ///
    /// Side B's half is mirrored in both axes so both players see their own
    /// back row at the bottom of their screen.
    pub fn to_battlefield(&self, side: Side, local: OffsetCoord) -> HexCoord {
        let offset = match side {
            Side::A => local,
            Side::B => OffsetCoord::new(
                self.width as i32 - 1 - local.col,
                self.height as i32 - 1 - local.row,
            ),
        };
        offset.to_hex()
    }

    /// How deep `coord` sits inside `side`'s half (0 = front row)
    ///
    /// Larger values are further from the center line; used for backline targeting.
    pub fn depth(&self, side: Side, coord: HexCoord) -> i32 {
        let row = coord.to_offset().row;
        match side {
            Side::A => self.half_height() as i32 - 1 - row,
            Side::B => row - self.half_height() as i32,
        }
    }

    pub fn occupant(&self, coord: HexCoord) -> Option<UnitId> {
        self.occupancy.get(&coord).copied()
    }

    /// In bounds and unoccupied
    pub fn is_free(&self, coord: HexCoord) -> bool {
        self.in_bounds(coord) && !self.occupancy.contains_key(&coord)
    }

    /// Place a unit on a hex; returns false if the hex is taken or off the board
    pub fn place(&mut self, unit: UnitId, coord: HexCoord) -> bool {
        if !self.is_free(coord) {
            return false;
        }
        self.occupancy.insert(coord, unit);
        true
    }

    /// Clear a hex if it is held by `unit`
    pub fn vacate(&mut self, unit: UnitId, coord: HexCoord) {
        if self.occupancy.get(&coord) == Some(&unit) {
            self.occupancy.remove(&coord);
        }
    }

    /// Move a unit between hexes; returns false (and changes nothing) if `to` is not free
    pub fn relocate(&mut self, unit: UnitId, from: HexCoord, to: HexCoord) -> bool {
        if !self.is_free(to) {
            return false;
        }
        self.vacate(unit, from);
        self.occupancy.insert(to, unit);
        true
    }

    /// Free hexes adjacent to `coord`, in the fixed neighbor order
    pub fn free_neighbors(&self, coord: HexCoord) -> Vec<HexCoord> {
        coord
            .neighbors()
            .into_iter()
            .filter(|n| self.is_free(*n))
            .collect()
    }

    /// Closest free hex to `center`, ties broken by coordinate order
    pub fn nearest_free(&self, center: HexCoord) -> Option<HexCoord> {
        let max_radius = self.width.max(self.height);
        (0..=max_radius).find_map(|radius| {
            center
                .hexes_in_range(radius)
                .into_iter()
                .filter(|c| c.distance(&center) == radius && self.is_free(*c))
                .min()
        })
    }
}
