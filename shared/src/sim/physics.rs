//! Axis-aligned geometry helpers used by every variant.

/// Axis-aligned rectangle, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Square centred on (`cx`, `cy`).
    pub fn centered(cx: f32, cy: f32, half: f32) -> Self {
        Self::new(cx - half, cy - half, half * 2.0, half * 2.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Touching edges do not count as overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        !(self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y)
    }
}

/// Bounded movement: applies `delta` only when the result stays within
/// `[min, max]`, otherwise the whole step is rejected. Positions are never
/// clamped onto the bound.
pub fn bounded_move(pos: f32, delta: f32, min: f32, max: f32) -> f32 {
    let next = pos + delta;
    if next < min || next > max {
        pos
    } else {
        next
    }
}

/// Returns the velocity that points back into `[min, max]` when `pos` has
/// crossed a bound while still moving outward. The magnitude is unchanged.
pub fn reflect_into(pos: f32, vel: f32, min: f32, max: f32) -> f32 {
    if (pos < min && vel < 0.0) || (pos > max && vel > 0.0) {
        -vel
    } else {
        vel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.overlaps(&Rect::new(5.0, 5.0, 10.0, 10.0)));
        assert!(!a.overlaps(&Rect::new(50.0, 50.0, 10.0, 10.0)));
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(!a.overlaps(&Rect::new(10.0, 0.0, 10.0, 10.0)));
        assert!(!a.overlaps(&Rect::new(0.0, 10.0, 10.0, 10.0)));
    }

    #[test]
    fn test_centered_rect() {
        let r = Rect::centered(100.0, 50.0, 8.0);
        assert_eq!(r, Rect::new(92.0, 42.0, 16.0, 16.0));
        assert_eq!(r.right(), 108.0);
        assert_eq!(r.bottom(), 58.0);
    }

    #[test]
    fn test_bounded_move_rejects_whole_step() {
        assert_eq!(bounded_move(5.0, -6.0, 0.0, 100.0), 5.0);
        assert_eq!(bounded_move(95.0, 6.0, 0.0, 100.0), 95.0);
        assert_eq!(bounded_move(50.0, 6.0, 0.0, 100.0), 56.0);
        assert_eq!(bounded_move(6.0, -6.0, 0.0, 100.0), 0.0);
    }

    #[test]
    fn test_reflect_only_when_moving_outward() {
        assert_eq!(reflect_into(-1.0, -3.0, 0.0, 10.0), 3.0);
        assert_eq!(reflect_into(11.0, 3.0, 0.0, 10.0), -3.0);
        // Already heading back in: leave it alone.
        assert_eq!(reflect_into(-1.0, 3.0, 0.0, 10.0), 3.0);
        assert_eq!(reflect_into(5.0, -3.0, 0.0, 10.0), -3.0);
    }
}
