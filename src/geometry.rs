//! Integer 2-D geometry: points and axis-aligned rectangles.
//!
//! `Rect` uses inclusive `(x0,y0)`-`(x1,y1)` bounds. The "invalid" (empty)
//! rectangle is represented with `i32::MAX`/`i32::MIN` sentinels so that
//! `grow`-ing an invalid rect with any real rect yields that real rect.

/// A single integer-valued 2-D point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned rectangle with inclusive bounds on both corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    /// Construct a rect from inclusive corners.
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Rect { x0, y0, x1, y1 }
    }

    /// Construct a rect from an origin and a width/height in cells/pixels.
    pub fn from_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        if width <= 0 || height <= 0 {
            return Rect::invalid();
        }
        Rect::new(x, y, x + width - 1, y + height - 1)
    }

    /// The canonical empty rectangle: no point satisfies `valid()` math against it
    /// except itself being merged away by `grow`.
    pub fn invalid() -> Self {
        Rect::new(i32::MAX, i32::MAX, i32::MIN, i32::MIN)
    }

    pub fn valid(&self) -> bool {
        self.x0 <= self.x1 && self.y0 <= self.y1
    }

    pub fn width(&self) -> i32 {
        if self.valid() {
            self.x1 - self.x0 + 1
        } else {
            0
        }
    }

    pub fn height(&self) -> i32 {
        if self.valid() {
            self.y1 - self.y0 + 1
        } else {
            0
        }
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    pub fn contains_point(&self, p: Point) -> bool {
        self.valid() && p.x >= self.x0 && p.x <= self.x1 && p.y >= self.y0 && p.y <= self.y1
    }

    /// Clip a point to fall within this rect, or return `None` if this rect is empty.
    pub fn clip_point(&self, p: Point) -> Option<Point> {
        if !self.valid() {
            return None;
        }
        Some(Point::new(
            p.x.clamp(self.x0, self.x1),
            p.y.clamp(self.y0, self.y1),
        ))
    }

    /// Intersect two rects; result is `invalid()` if they do not overlap.
    pub fn clip(&self, other: &Rect) -> Rect {
        if !self.valid() || !other.valid() {
            return Rect::invalid();
        }
        let r = Rect::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        );
        if r.valid() {
            r
        } else {
            Rect::invalid()
        }
    }

    /// Bounding-box union of two rects. An invalid operand is absorbed.
    pub fn grow(&self, other: &Rect) -> Rect {
        if !self.valid() {
            return *other;
        }
        if !other.valid() {
            return *self;
        }
        Rect::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    /// Bounding-box union with a single point.
    pub fn grow_point(&self, p: Point) -> Rect {
        self.grow(&Rect::new(p.x, p.y, p.x, p.y))
    }

    /// Translate both corners by `delta`.
    pub fn translate(&self, delta: Point) -> Rect {
        if !self.valid() {
            return *self;
        }
        Rect::new(
            self.x0 + delta.x,
            self.y0 + delta.y,
            self.x1 + delta.x,
            self.y1 + delta.y,
        )
    }
}

impl std::ops::AddAssign<Point> for Rect {
    fn add_assign(&mut self, rhs: Point) {
        *self = self.translate(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_rect_is_absorbed_by_grow() {
        let r = Rect::invalid();
        let s = Rect::new(1, 2, 3, 4);
        assert_eq!(r.grow(&s), s);
        assert_eq!(s.grow(&r), s);
    }

    #[test]
    fn valid_and_dimensions() {
        let r = Rect::new(0, 0, 9, 4);
        assert!(r.valid());
        assert_eq!(r.width(), 10);
        assert_eq!(r.height(), 5);
        assert_eq!(r.area(), 50);
    }

    #[test]
    fn from_size_zero_is_invalid() {
        assert!(!Rect::from_size(0, 0, 0, 5).valid());
    }

    #[test]
    fn clip_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 15, 15);
        let c = a.clip(&b);
        assert_eq!(c, Rect::new(5, 5, 10, 10));
    }

    #[test]
    fn clip_no_overlap_is_invalid() {
        let a = Rect::new(0, 0, 1, 1);
        let b = Rect::new(5, 5, 6, 6);
        assert!(!a.clip(&b).valid());
    }

    #[test]
    fn grow_union_rectangles() {
        let a = Rect::new(0, 0, 9, 9);
        let b = Rect::new(5, 5, 14, 14);
        assert_eq!(a.grow(&b), Rect::new(0, 0, 14, 14));
    }

    #[test]
    fn translate_moves_both_corners() {
        let r = Rect::new(1, 1, 5, 5);
        let moved = r.translate(Point::new(2, -1));
        assert_eq!(moved, Rect::new(3, 0, 7, 4));
    }

    #[test]
    fn contains_point_respects_inclusive_bounds() {
        let r = Rect::new(0, 0, 3, 3);
        assert!(r.contains_point(Point::new(0, 0)));
        assert!(r.contains_point(Point::new(3, 3)));
        assert!(!r.contains_point(Point::new(4, 0)));
    }
}
