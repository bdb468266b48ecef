//! Window geometry
//!
//! Positions and sizes as both protocol worlds see them. X11 uses 16-bit
//! coordinates on the wire; everything here is widened to `i32`.

use std::ops::{Add, Sub};

/// Top-left position in global (root window) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn as_displacement(self) -> Displacement {
        Displacement::new(self.x, self.y)
    }
}

/// Offset between two points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Displacement {
    pub dx: i32,
    pub dy: i32,
}

impl Displacement {
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

/// Window size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Window geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rectangle {
    pub top_left: Point,
    pub size: Size,
}

impl Rectangle {
    pub fn new(top_left: Point, size: Size) -> Self {
        Self { top_left, size }
    }
}

impl Add<Displacement> for Point {
    type Output = Point;

    fn add(self, rhs: Displacement) -> Point {
        Point::new(self.x + rhs.dx, self.y + rhs.dy)
    }
}

impl Sub<Displacement> for Point {
    type Output = Point;

    fn sub(self, rhs: Displacement) -> Point {
        Point::new(self.x - rhs.dx, self.y - rhs.dy)
    }
}

impl Sub<Point> for Point {
    type Output = Displacement;

    fn sub(self, rhs: Point) -> Displacement {
        Displacement::new(self.x - rhs.x, self.y - rhs.y)
    }
}
