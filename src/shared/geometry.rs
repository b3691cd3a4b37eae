//! Plain geometry values.
//!
//! Positions are signed (frames may sit partly off-screen), sizes unsigned.

/// Window geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn origin(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Whether a point relative to the window's own origin lies inside it.
    pub fn contains_local(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width as i32 && y < self.height as i32
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }
}

/// Window size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges() {
        let g = Geometry::new(-10, 5, 30, 20);
        assert_eq!(g.right(), 20);
        assert_eq!(g.bottom(), 25);
        assert_eq!(g.size(), Size::new(30, 20));
        assert!(g.contains_local(0, 19) && !g.contains_local(30, 0) && !g.contains_local(-1, 3));
    }
}
