// Viewport framing around the player's cells
use protocol::Rect;

/// Share of the bounds added as margin on each side.
const MARGIN: f64 = 0.05;

/// Pad `bounds` by 5% on every side, or grow it (centered) to at least
/// `min_width` x `min_height` when the padded box would still be smaller.
pub fn frame(bounds: Rect, min_width: f64, min_height: f64) -> Rect {
    let pad_x = pad(bounds.width, min_width);
    let pad_y = pad(bounds.height, min_height);
    Rect::new(
        bounds.x - pad_x,
        bounds.y - pad_y,
        bounds.width + pad_x * 2.0,
        bounds.height + pad_y * 2.0,
    )
}

fn pad(extent: f64, min_extent: f64) -> f64 {
    if extent * (1.0 + 2.0 * MARGIN) < min_extent {
        (min_extent - extent) * 0.5
    } else {
        extent * MARGIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Rect, b: Rect) -> bool {
        (a.x - b.x).abs() < 1e-9
            && (a.y - b.y).abs() < 1e-9
            && (a.width - b.width).abs() < 1e-9
            && (a.height - b.height).abs() < 1e-9
    }

    #[test]
    fn large_bounds_get_margin() {
        let framed = frame(Rect::new(100.0, 200.0, 100.0, 60.0), 50.0, 50.0);
        assert!(approx(framed, Rect::new(95.0, 197.0, 110.0, 66.0)));
    }

    #[test]
    fn small_bounds_grow_to_minimum() {
        let framed = frame(Rect::new(10.0, 10.0, 2.0, 2.0), 50.0, 40.0);
        assert!(approx(framed, Rect::new(-14.0, -9.0, 50.0, 40.0)));
    }

    #[test]
    fn axes_are_independent() {
        let framed = frame(Rect::new(0.0, 0.0, 100.0, 2.0), 50.0, 50.0);
        assert!((framed.width - 110.0).abs() < 1e-9);
        assert!((framed.height - 50.0).abs() < 1e-9);
    }
}
