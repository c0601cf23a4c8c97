//! Pointer hit testing against display-space box rectangles.

use crate::geometry::DisplayRect;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// What a pointer-down landed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hit {
    Corner { index: usize, corner: Corner },
    Interior { index: usize },
}

fn near(px: f32, py: f32, cx: f32, cy: f32, margin: f32) -> bool {
    // Chebyshev distance: each axis independently within the margin.
    (px - cx).abs() <= margin && (py - cy).abs() <= margin
}

/// True if the point is within `margin` of any of the rect's four corners.
pub fn is_near_corner(px: f32, py: f32, rect: DisplayRect, margin: f32) -> bool {
    corner_at(px, py, rect, margin).is_some()
}

/// Which corner the point touches, if any.
///
/// Tested in the fixed order top-left, bottom-right, top-right,
/// bottom-left; the first match wins when a degenerate box puts two
/// corners within the margin at once.
pub fn corner_at(px: f32, py: f32, rect: DisplayRect, margin: f32) -> Option<Corner> {
    if near(px, py, rect.x, rect.y, margin) {
        Some(Corner::TopLeft)
    } else if near(px, py, rect.right(), rect.bottom(), margin) {
        Some(Corner::BottomRight)
    } else if near(px, py, rect.right(), rect.y, margin) {
        Some(Corner::TopRight)
    } else if near(px, py, rect.x, rect.bottom(), margin) {
        Some(Corner::BottomLeft)
    } else {
        None
    }
}

/// Scan boxes in list order; per box a corner hit is checked before the
/// interior, and the first hit of any kind ends the scan.
pub fn scan(px: f32, py: f32, rects: &[DisplayRect], margin: f32) -> Option<Hit> {
    for (index, rect) in rects.iter().enumerate() {
        if let Some(corner) = corner_at(px, py, *rect, margin) {
            return Some(Hit::Corner { index, corner });
        }
        if rect.contains(px, py) {
            return Some(Hit::Interior { index });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARGIN: f32 = 8.0;

    fn rect() -> DisplayRect {
        DisplayRect::new(100.0, 100.0, 40.0, 60.0)
    }

    #[test]
    fn corner_hit_uses_chebyshev_margin() {
        // (8, 8) off the corner is within max-abs margin 8 but farther
        // than 8 in euclidean distance.
        assert!(is_near_corner(108.0, 108.0, rect(), MARGIN));
        assert!(!is_near_corner(108.1, 100.0, rect(), MARGIN));
    }

    #[test]
    fn all_four_corners_resolve() {
        let r = rect();
        assert_eq!(corner_at(100.0, 100.0, r, MARGIN), Some(Corner::TopLeft));
        assert_eq!(corner_at(140.0, 100.0, r, MARGIN), Some(Corner::TopRight));
        assert_eq!(corner_at(100.0, 160.0, r, MARGIN), Some(Corner::BottomLeft));
        assert_eq!(corner_at(140.0, 160.0, r, MARGIN), Some(Corner::BottomRight));
    }

    #[test]
    fn degenerate_box_resolves_in_fixed_order() {
        // Near-zero box: every corner is within margin of the same point.
        let r = DisplayRect::new(100.0, 100.0, 1.0, 1.0);
        assert_eq!(corner_at(100.0, 100.0, r, MARGIN), Some(Corner::TopLeft));
    }

    #[test]
    fn interior_only_after_corners_fail() {
        let hit = scan(120.0, 130.0, &[rect()], MARGIN);
        assert_eq!(hit, Some(Hit::Interior { index: 0 }));
        let hit = scan(101.0, 101.0, &[rect()], MARGIN);
        assert_eq!(
            hit,
            Some(Hit::Corner {
                index: 0,
                corner: Corner::TopLeft
            })
        );
    }

    #[test]
    fn first_box_in_list_order_wins() {
        let a = DisplayRect::new(0.0, 0.0, 50.0, 50.0);
        let b = DisplayRect::new(20.0, 20.0, 50.0, 50.0);
        assert_eq!(scan(30.0, 30.0, &[a, b], MARGIN), Some(Hit::Interior { index: 0 }));
    }

    #[test]
    fn empty_canvas_hits_nothing() {
        assert_eq!(scan(10.0, 10.0, &[], MARGIN), None);
    }
}
