//! A* pathfinding over free battlefield hexes
//!
//! Occupied hexes are walls. Every step costs one. Ties in the open set are
//! broken by coordinate order so the same board always yields the same path.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::battle::battlefield::Battlefield;
use crate::battle::hex::HexCoord;

/// Node in the A* open set
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathNode {
    coord: HexCoord,
    f_cost: u32, // g_cost + heuristic
    g_cost: u32,
}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; prefer deeper nodes, then lower coordinates
        other
            .f_cost
            .cmp(&self.f_cost)
            .then(self.g_cost.cmp(&other.g_cost))
            .then(other.coord.cmp(&self.coord))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a path from `start` to the closest reachable hex in `goals`
///
/// The returned path starts at `start` and ends on a goal hex. Returns None
/// when no goal can be reached through free hexes.
pub fn find_path(
    field: &Battlefield,
    start: HexCoord,
    goals: &BTreeSet<HexCoord>,
) -> Option<Vec<HexCoord>> {
    if goals.is_empty() {
        return None;
    }
    if goals.contains(&start) {
        return Some(vec![start]);
    }

    let heuristic = |coord: HexCoord| {
        goals
            .iter()
            .map(|goal| coord.distance(goal))
            .min()
            .unwrap_or(0)
    };

    let mut open_set = BinaryHeap::new();
    let mut came_from: BTreeMap<HexCoord, HexCoord> = BTreeMap::new();
    let mut g_scores: BTreeMap<HexCoord, u32> = BTreeMap::new();

    g_scores.insert(start, 0);
    open_set.push(PathNode {
        coord: start,
        f_cost: heuristic(start),
        g_cost: 0,
    });

    while let Some(current) = open_set.pop() {
        if goals.contains(&current.coord) {
            return Some(reconstruct_path(&came_from, current.coord));
        }

        let current_g = g_scores.get(&current.coord).copied().unwrap_or(u32::MAX);
        if current.g_cost > current_g {
            // Stale heap entry
            continue;
        }

        for neighbor in current.coord.neighbors() {
            if !field.is_free(neighbor) {
                continue;
            }

            let tentative_g = current_g + 1;
            let neighbor_g = g_scores.get(&neighbor).copied().unwrap_or(u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.coord);
                g_scores.insert(neighbor, tentative_g);
                open_set.push(PathNode {
                    coord: neighbor,
                    f_cost: tentative_g + heuristic(neighbor),
                    g_cost: tentative_g,
                });
            }
        }
    }

    None
}

/// Path toward any free hex from which `target` is within `range`
pub fn path_into_range(
    field: &Battlefield,
    start: HexCoord,
    target: HexCoord,
    range: u32,
) -> Option<Vec<HexCoord>> {
    let goals: BTreeSet<HexCoord> = target
        .hexes_in_range(range)
        .into_iter()
        .filter(|coord| *coord == start || field.is_free(*coord))
        .collect();
    find_path(field, start, &goals)
}

/// Reconstruct path from came_from map
fn reconstruct_path(came_from: &BTreeMap<HexCoord, HexCoord>, mut current: HexCoord) -> Vec<HexCoord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::hex::OffsetCoord;
    use crate::core::types::UnitId;

    #[test]
    fn test_pathfind_straight_line() {
        let field = Battlefield::new(7, 8);
        let start = OffsetCoord::new(0, 0).to_hex();
        let goal = OffsetCoord::new(4, 0).to_hex();

        let path = find_path(&field, start, &BTreeSet::from([goal])).unwrap();
        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&goal));
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn test_pathfind_around_wall() {
        let mut field = Battlefield::new(7, 8);
        // Wall across row 2 except the last column
        for col in 0..6 {
            field.place(UnitId(col as u32), OffsetCoord::new(col, 2).to_hex());
        }
        let start = OffsetCoord::new(0, 0).to_hex();
        let goal = OffsetCoord::new(0, 4).to_hex();

        let path = find_path(&field, start, &BTreeSet::from([goal])).unwrap();
        assert_eq!(path.last(), Some(&goal));
        assert!(path.contains(&OffsetCoord::new(6, 2).to_hex()));
        for pair in path.windows(2) {
            assert!(pair[0].is_adjacent(&pair[1]));
        }
    }

    #[test]
    fn test_pathfind_blocked() {
        let mut field = Battlefield::new(7, 8);
        for col in 0..7 {
            field.place(UnitId(col as u32), OffsetCoord::new(col, 2).to_hex());
        }
        let start = OffsetCoord::new(0, 0).to_hex();
        let goal = OffsetCoord::new(0, 4).to_hex();
        assert!(find_path(&field, start, &BTreeSet::from([goal])).is_none());
    }

    #[test]
    fn test_path_into_range_stops_at_range() {
        let mut field = Battlefield::new(7, 8);
        let start = OffsetCoord::new(3, 0).to_hex();
        let target = OffsetCoord::new(3, 7).to_hex();
        field.place(UnitId(0), start);
        field.place(UnitId(1), target);

        let path = path_into_range(&field, start, target, 2).unwrap();
        let end = *path.last().unwrap();
        assert_eq!(end.distance(&target), 2);
        assert_eq!(path.len() as u32 - 1, start.distance(&target) - 2);
    }

    #[test]
    fn test_pathfinding_is_deterministic() {
        let field = Battlefield::new(7, 8);
        let start = OffsetCoord::new(0, 0).to_hex();
        let goal = OffsetCoord::new(6, 7).to_hex();
        let goals = BTreeSet::from([goal]);
        assert_eq!(find_path(&field, start, &goals), find_path(&field, start, &goals));
    }
}
