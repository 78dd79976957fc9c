use super::projection::Viewport;
use crate::braille::BrailleCanvas;
use geo::LineString;

/// Bresenham line between two pixels
pub fn draw_line(canvas: &mut BrailleCanvas, (x0, y0): (i32, i32), (x1, y1): (i32, i32)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        canvas.set_pixel_signed(x, y);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Project and draw a ring, culling segments off the canvas.
///
/// Segments longer than the canvas width are antimeridian jumps and skipped.
pub fn draw_ring(canvas: &mut BrailleCanvas, ring: &LineString<f64>, viewport: &Viewport) {
    let mut prev: Option<(i32, i32)> = None;
    for coord in ring.coords() {
        let p = viewport.project(coord.x, coord.y);
        if let Some(q) = prev {
            let span = ((p.0 - q.0).abs() + (p.1 - q.1).abs()) as usize;
            if span < viewport.width && viewport.line_might_be_visible(q, p) {
                draw_line(canvas, q, p);
            }
        }
        prev = Some(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, (0, 0), (9, 0));
        assert_eq!(canvas.to_string(), "⠉⠉⠉⠉⠉");
    }

    #[test]
    fn test_vertical_line() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, (0, 0), (0, 7));
        assert_eq!(canvas.to_string(), "⡇\n⡇");
    }

    #[test]
    fn test_ring_off_canvas_draws_nothing() {
        let mut canvas = BrailleCanvas::new(10, 5);
        let viewport = Viewport::new(0.0, 0.0, 50.0, 20, 20);
        let ring = LineString::from(vec![(120.0, 10.0), (130.0, 10.0), (130.0, 20.0), (120.0, 10.0)]);
        draw_ring(&mut canvas, &ring, &viewport);
        assert!(canvas.is_blank());
    }

    #[test]
    fn test_ring_in_view_draws() {
        let mut canvas = BrailleCanvas::new(20, 10);
        let viewport = Viewport::new(0.0, 0.0, 1.0, 40, 40);
        let ring = LineString::from(vec![(-20.0, -20.0), (20.0, -20.0), (20.0, 20.0), (-20.0, -20.0)]);
        draw_ring(&mut canvas, &ring, &viewport);
        assert!(!canvas.is_blank());
    }
}
