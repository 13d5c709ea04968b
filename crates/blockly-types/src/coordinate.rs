//! Workspace-surface coordinates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A position on the workspace surface, in workspace units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset by a delta.
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Compact `"x,y"` form used in event records. Components are rounded
    /// to whole units.
    pub fn to_pair(&self) -> String {
        format!("{},{}", self.x.round() as i64, self.y.round() as i64)
    }

    /// Parse the `"x,y"` form. Whitespace around either component is allowed.
    pub fn from_pair(s: &str) -> Option<Self> {
        let (x, y) = s.split_once(',')?;
        let x: f64 = x.trim().parse().ok()?;
        let y: f64 = y.trim().parse().ok()?;
        Some(Self::new(x, y))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_rounds() {
        assert_eq!(Coordinate::new(10.4, -3.6).to_pair(), "10,-4");
    }

    #[test]
    fn test_from_pair() {
        assert_eq!(Coordinate::from_pair("12, 40"), Some(Coordinate::new(12.0, 40.0)));
        assert_eq!(Coordinate::from_pair("12"), None);
        assert_eq!(Coordinate::from_pair("a,b"), None);
    }

    #[test]
    fn test_translate() {
        assert_eq!(Coordinate::new(1.0, 2.0).translate(3.0, -2.0), Coordinate::new(4.0, 0.0));
    }
}
