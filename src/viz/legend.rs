//! Inside-the-plot legend box. It sits at a fixed pixel spot, so the labels
//! treat it as a Fixed obstacle.

use anyhow::{Result, anyhow};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontFamily;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::text::{estimate_text_width_px, line_height_px};
use crate::collision::{BBox, Boundable, CoordTransform, Point};

const PAD: f64 = 6.0;
const SWATCH_W: f64 = 16.0;
const SWATCH_GAP: f64 = 6.0;

#[derive(Debug, Clone)]
pub struct LegendBox {
    /// Top-left corner in pixels.
    pub origin: Point,
    pub items: Vec<(String, RGBColor)>,
    pub font_px: u32,
}

impl LegendBox {
    pub fn new(origin: Point, items: Vec<(String, RGBColor)>, font_px: u32) -> Self {
        Self {
            origin,
            items,
            font_px,
        }
    }

    fn size(&self) -> (f64, f64) {
        let text_w = self
            .items
            .iter()
            .map(|(t, _)| estimate_text_width_px(t, self.font_px))
            .max()
            .unwrap_or(0) as f64;
        let rows = self.items.len() as f64;
        (
            PAD * 2.0 + SWATCH_W + SWATCH_GAP + text_w,
            PAD * 2.0 + rows * line_height_px(self.font_px) as f64,
        )
    }

    /// Keep the box inside `area` with its top-right corner `inset` pixels
    /// from the area's top-right corner.
    pub fn place_top_right(&mut self, area: &BBox, inset: f64) {
        let (w, _) = self.size();
        self.origin = Point::new(area.x_max - inset - w, area.y_min + inset);
    }

    pub fn draw<DB: DrawingBackend>(&self, area: &DrawingArea<DB, Shift>) -> Result<()> {
        if self.items.is_empty() {
            return Ok(());
        }
        let b = self.bbox(&CoordTransform::identity());
        let corners = [
            (b.x_min.round() as i32, b.y_min.round() as i32),
            (b.x_max.round() as i32, b.y_max.round() as i32),
        ];
        area.draw(&Rectangle::new(corners, WHITE.mix(0.9).filled()))
            .map_err(|e| anyhow!("{:?}", e))?;
        area.draw(&Rectangle::new(corners, BLACK.mix(0.4).stroke_width(1)))
            .map_err(|e| anyhow!("{:?}", e))?;

        let line_h = line_height_px(self.font_px) as f64;
        for (i, (text, color)) in self.items.iter().enumerate() {
            let cy = b.y_min + PAD + line_h * (i as f64 + 0.5);
            let x0 = b.x_min + PAD;
            area.draw(&PathElement::new(
                vec![
                    (x0.round() as i32, cy.round() as i32),
                    ((x0 + SWATCH_W).round() as i32, cy.round() as i32),
                ],
                color.stroke_width(3),
            ))
            .map_err(|e| anyhow!("{:?}", e))?;
            let style = (FontFamily::SansSerif, self.font_px)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Left, VPos::Center));
            area.draw(&Text::new(
                text.clone(),
                (
                    (x0 + SWATCH_W + SWATCH_GAP).round() as i32,
                    cy.round() as i32,
                ),
                style,
            ))
            .map_err(|e| anyhow!("{:?}", e))?;
        }
        Ok(())
    }
}

impl Boundable for LegendBox {
    /// Pixel-anchored; the transform is ignored.
    fn bbox(&self, _ctx: &CoordTransform) -> BBox {
        let (w, h) = self.size();
        BBox::from_origin(self.origin, w, h)
    }

    fn is_visible(&self) -> bool {
        !self.items.is_empty()
    }
}
