//! Grid geometry: the 20x20 city grid, Manhattan step counts and the
//! narrow/wide pricing classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cells per axis; valid coordinates are `0..GRID_SIZE`.
pub const GRID_SIZE: u8 = 20;

/// Inner-ring bounds. A route touching any coordinate outside
/// `[INNER_MIN, INNER_MAX]` is priced as wide-area.
pub const INNER_MIN: u8 = 5;
pub const INNER_MAX: u8 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub x: u8,
    pub y: u8,
}

impl GridCell {
    /// Returns `None` when either coordinate lies outside the grid.
    pub fn new(x: u8, y: u8) -> Option<Self> {
        (x < GRID_SIZE && y < GRID_SIZE).then_some(Self { x, y })
    }

    /// Manhattan step count to `other`.
    pub fn steps_to(&self, other: GridCell) -> u32 {
        u32::from(self.x.abs_diff(other.x)) + u32::from(self.y.abs_diff(other.y))
    }

    fn in_inner_ring(&self) -> bool {
        (INNER_MIN..=INNER_MAX).contains(&self.x) && (INNER_MIN..=INNER_MAX).contains(&self.y)
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Pricing area of a route, derived from its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    Narrow,
    Wide,
}

impl Area {
    /// Wide if any of the four endpoint coordinates lies outside the inner ring.
    pub fn classify(start: GridCell, goal: GridCell) -> Area {
        if start.in_inner_ring() && goal.in_inner_ring() {
            Area::Narrow
        } else {
            Area::Wide
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Area::Narrow => write!(f, "narrow"),
            Area::Wide => write!(f, "wide"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_bounds_coordinates() {
        assert!(GridCell::new(19, 19).is_some());
        assert!(GridCell::new(20, 0).is_none());
        assert!(GridCell::new(0, 20).is_none());
    }

    #[test]
    fn manhattan_steps() {
        let a = GridCell::new(2, 5).expect("cell");
        let b = GridCell::new(5, 9).expect("cell");
        assert_eq!(a.steps_to(b), 7);
        assert_eq!(b.steps_to(a), 7);
        assert_eq!(a.steps_to(a), 0);
    }

    #[test]
    fn inner_route_classifies_narrow() {
        let start = GridCell::new(5, 14).expect("cell");
        let goal = GridCell::new(14, 5).expect("cell");
        assert_eq!(Area::classify(start, goal), Area::Narrow);
    }

    #[test]
    fn boundary_values_flip_classification() {
        let inner = GridCell::new(10, 10).expect("cell");
        let low = GridCell::new(4, 10).expect("cell");
        let high = GridCell::new(10, 15).expect("cell");
        assert_eq!(Area::classify(low, inner), Area::Wide);
        assert_eq!(Area::classify(inner, high), Area::Wide);
        // 5 and 14 are still inside.
        let edge = GridCell::new(5, 14).expect("cell");
        assert_eq!(Area::classify(edge, inner), Area::Narrow);
    }

    #[test]
    fn any_single_coordinate_outside_makes_wide() {
        let inner = GridCell::new(7, 7).expect("cell");
        let outer = GridCell::new(7, 17).expect("cell");
        assert_eq!(Area::classify(inner, outer), Area::Wide);
        assert_eq!(Area::classify(outer, inner), Area::Wide);
    }
}
