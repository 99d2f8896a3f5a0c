use serde::{Deserialize, Serialize};

/// A position in surface coordinates, in logical pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle. `origin` is the top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub origin: Point,
    pub size: Size,
}

impl Bounds {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn top(&self) -> f32 {
        self.origin.y
    }

    pub fn bottom(&self) -> f32 {
        self.origin.y + self.size.height
    }

    pub fn left(&self) -> f32 {
        self.origin.x
    }

    pub fn right(&self) -> f32 {
        self.origin.x + self.size.width
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    pub fn mid_y(&self) -> f32 {
        self.origin.y + self.size.height / 2.
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x < self.right()
            && point.y >= self.top()
            && point.y < self.bottom()
    }

    /// The same rectangle expressed relative to `origin`.
    pub fn relative_to(&self, origin: Point) -> Self {
        Self::new(
            self.origin.x - origin.x,
            self.origin.y - origin.y,
            self.size.width,
            self.size.height,
        )
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Bounds) -> Self {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::new(left, top, right - left, bottom - top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let bounds = Bounds::new(10., 10., 20., 10.);
        assert!(bounds.contains(Point::new(10., 10.)));
        assert!(!bounds.contains(Point::new(30., 15.)));
        assert!(!bounds.contains(Point::new(15., 20.)));
    }

    #[test]
    fn union_covers_both() {
        let a = Bounds::new(0., 0., 10., 10.);
        let b = Bounds::new(5., 20., 10., 5.);
        assert_eq!(a.union(&b), Bounds::new(0., 0., 15., 25.));
    }
}
