//! Canonical/display coordinate spaces and the transform between them.
//!
//! Canonical space is the native pixel grid of the frame image; display
//! space is canonical scaled by the session's fixed render factor. The
//! transform truncates toward zero on both legs so a round trip settles
//! after one step.

/// Box in canonical space: top-left origin, native image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxCoords {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BoxCoords {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }
}

/// Box in display space (canonical scaled for rendering/hit-testing).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl DisplayRect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Inclusive containment check.
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }
}

pub fn to_display(c: BoxCoords, scale: f32) -> DisplayRect {
    DisplayRect {
        x: (c.x as f32 * scale).trunc(),
        y: (c.y as f32 * scale).trunc(),
        w: (c.w as f32 * scale).trunc(),
        h: (c.h as f32 * scale).trunc(),
    }
}

pub fn to_canonical(r: DisplayRect, scale: f32) -> BoxCoords {
    BoxCoords {
        x: (r.x / scale).trunc() as i32,
        y: (r.y / scale).trunc() as i32,
        w: (r.w / scale).trunc() as i32,
        h: (r.h / scale).trunc() as i32,
    }
}

/// Single display-space point back to canonical pixels.
pub fn point_to_canonical(px: f32, py: f32, scale: f32) -> (i32, i32) {
    ((px / scale).trunc() as i32, (py / scale).trunc() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_exact_at_unit_scale() {
        let b = BoxCoords::new(100, 100, 40, 60);
        assert_eq!(to_canonical(to_display(b, 1.0), 1.0), b);
    }

    #[test]
    fn round_trip_error_bounded_by_one_pixel() {
        let scales = [0.25f32, 0.5, 0.75, 1.5, 2.0];
        for &s in &scales {
            for x in [0, 1, 7, 100, 333] {
                let b = BoxCoords::new(x, x + 3, 17, 29);
                let back = to_canonical(to_display(b, s), s);
                assert!((back.x - b.x).abs() <= 1, "x off at scale {s}: {back:?}");
                assert!((back.y - b.y).abs() <= 1);
                assert!((back.w - b.w).abs() <= 1);
                assert!((back.h - b.h).abs() <= 1);
            }
        }
    }

    #[test]
    fn second_round_trip_is_idempotent() {
        let b = BoxCoords::new(13, 27, 31, 53);
        let s = 0.5;
        let once = to_canonical(to_display(b, s), s);
        let twice = to_canonical(to_display(once, s), s);
        assert_eq!(once, twice);
    }

    #[test]
    fn display_scales_all_four_fields() {
        let b = BoxCoords::new(20, 20, 80, 80);
        let d = to_display(b, 0.5);
        assert_eq!(d, DisplayRect::new(10.0, 10.0, 40.0, 40.0));
    }

    #[test]
    fn contains_is_inclusive_at_edges() {
        let r = DisplayRect::new(10.0, 10.0, 40.0, 40.0);
        assert!(r.contains(10.0, 10.0));
        assert!(r.contains(50.0, 50.0));
        assert!(!r.contains(50.1, 50.0));
    }
}
