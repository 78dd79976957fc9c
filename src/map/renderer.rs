use super::geometry::draw_ring;
use super::projection::Viewport;
use crate::braille::BrailleCanvas;
use geo::MultiPolygon;

/// How a region is drawn
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Highlight {
    None,
    Selected,
    Cursor,
}

/// Braille layers, drawn back to front
pub struct MapLayers {
    pub outlines: BrailleCanvas,
    pub selected: BrailleCanvas,
    pub cursor: BrailleCanvas,
}

/// Draws region outlines, routing each region to the layer of its highlight
pub struct MapRenderer<'a> {
    shapes: &'a [MultiPolygon<f64>],
}

impl<'a> MapRenderer<'a> {
    pub fn new(shapes: &'a [MultiPolygon<f64>]) -> Self {
        Self { shapes }
    }

    pub fn has_data(&self) -> bool {
        self.shapes.iter().any(|shape| !shape.0.is_empty())
    }

    /// Render onto character dimensions `width x height`
    pub fn render<F>(&self, width: usize, height: usize, viewport: &Viewport, highlight: F) -> MapLayers
    where
        F: Fn(usize) -> Highlight,
    {
        let mut layers = MapLayers {
            outlines: BrailleCanvas::new(width, height),
            selected: BrailleCanvas::new(width, height),
            cursor: BrailleCanvas::new(width, height),
        };

        for (index, shape) in self.shapes.iter().enumerate() {
            let canvas = match highlight(index) {
                Highlight::None => &mut layers.outlines,
                Highlight::Selected => &mut layers.selected,
                Highlight::Cursor => &mut layers.cursor,
            };
            for polygon in shape.0.iter() {
                draw_ring(canvas, polygon.exterior(), viewport);
            }
        }

        layers
    }
}
