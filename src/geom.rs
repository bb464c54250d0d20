//! Geometry helpers for axis-aligned bounds checks

use geo::{Coord, Rect};

/// Check if two rectangles intersect (touching edges count)
#[inline(always)]
pub fn rects_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    let (amin, amax) = (a.min(), a.max());
    let (bmin, bmax) = (b.min(), b.max());
    !(amax.x < bmin.x || amin.x > bmax.x || amax.y < bmin.y || amin.y > bmax.y)
}

/// Check if a rectangle contains a coordinate (inclusive on all edges)
#[inline(always)]
pub fn rect_contains(rect: &Rect<f64>, coord: Coord<f64>) -> bool {
    let (min, max) = (rect.min(), rect.max());
    coord.x >= min.x && coord.x <= max.x && coord.y >= min.y && coord.y <= max.y
}

/// Compute the bounding rectangle of a coordinate sequence
///
/// Returns `None` for an empty sequence.
pub fn bounds_of<I>(coords: I) -> Option<Rect<f64>>
where
    I: IntoIterator<Item = Coord<f64>>,
{
    let mut iter = coords.into_iter();
    let first = iter.next()?;
    let (mut min_x, mut max_x) = (first.x, first.x);
    let (mut min_y, mut max_y) = (first.y, first.y);

    for c in iter {
        min_x = min_x.min(c.x);
        max_x = max_x.max(c.x);
        min_y = min_y.min(c.y);
        max_y = max_y.max(c.y);
    }

    Some(Rect::new(
        Coord { x: min_x, y: min_y },
        Coord { x: max_x, y: max_y },
    ))
}

/// Expand a rectangle so it has a usable positive extent on both axes
///
/// A dataset where all points share an x or y value would otherwise produce a
/// degenerate root for the quadtree.
pub fn ensure_extent(rect: Rect<f64>, min_extent: f64) -> Rect<f64> {
    let (min, max) = (rect.min(), rect.max());
    let pad_x = if max.x - min.x < min_extent {
        min_extent / 2.0
    } else {
        0.0
    };
    let pad_y = if max.y - min.y < min_extent {
        min_extent / 2.0
    } else {
        0.0
    };
    Rect::new(
        Coord {
            x: min.x - pad_x,
            y: min.y - pad_y,
        },
        Coord {
            x: max.x + pad_x,
            y: max.y + pad_y,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rects_intersect() {
        let a = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 10.0 });
        let b = Rect::new(Coord { x: 5.0, y: 5.0 }, Coord { x: 15.0, y: 15.0 });
        let c = Rect::new(Coord { x: 20.0, y: 20.0 }, Coord { x: 30.0, y: 30.0 });

        assert!(rects_intersect(&a, &b));
        assert!(rects_intersect(&b, &a));
        assert!(!rects_intersect(&a, &c));

        // Touching edges intersect
        let d = Rect::new(Coord { x: 10.0, y: 0.0 }, Coord { x: 20.0, y: 10.0 });
        assert!(rects_intersect(&a, &d));
    }

    #[test]
    fn test_rect_contains() {
        let r = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 10.0 });
        assert!(rect_contains(&r, Coord { x: 5.0, y: 5.0 }));
        assert!(rect_contains(&r, Coord { x: 0.0, y: 0.0 }));
        assert!(rect_contains(&r, Coord { x: 10.0, y: 10.0 }));
        assert!(!rect_contains(&r, Coord { x: 10.1, y: 5.0 }));
        assert!(!rect_contains(&r, Coord { x: 5.0, y: -0.1 }));
    }

    #[test]
    fn test_bounds_of() {
        assert!(bounds_of(std::iter::empty()).is_none());

        let coords = vec![
            Coord { x: 3.0, y: -1.0 },
            Coord { x: -2.0, y: 4.0 },
            Coord { x: 1.0, y: 1.0 },
        ];
        let bounds = bounds_of(coords).unwrap();
        assert_eq!(bounds.min(), Coord { x: -2.0, y: -1.0 });
        assert_eq!(bounds.max(), Coord { x: 3.0, y: 4.0 });
    }

    #[test]
    fn test_ensure_extent_degenerate() {
        let flat = Rect::new(Coord { x: 1.0, y: 5.0 }, Coord { x: 1.0, y: 5.0 });
        let padded = ensure_extent(flat, 1.0);
        assert!(padded.width() >= 1.0);
        assert!(padded.height() >= 1.0);
        assert!(rect_contains(&padded, Coord { x: 1.0, y: 5.0 }));
    }
}
