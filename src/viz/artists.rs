//! Concrete chart elements. Each one keeps its geometry in data coordinates,
//! reports its pixel box through the collision capability traits and draws
//! itself onto the root area through a surface transform, so what is drawn
//! is exactly what the resolver saw.

use anyhow::{Result, anyhow};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontFamily;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::text::{LABEL_PAD_PX, label_box_px};
use super::types::LabelPlacement;
use crate::collision::connector::dash_segments;
use crate::collision::{BBox, Boundable, CoordTransform, PathGeometry, Point, Positionable};

fn px(p: Point) -> (i32, i32) {
    (p.x.round() as i32, p.y.round() as i32)
}

/// Which side of the anchor a label box extends to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    /// Box starts at the anchor and grows right.
    #[default]
    Left,
    /// Box ends at the anchor.
    Right,
}

/// One-line annotation in a padded box. Moveable.
#[derive(Debug, Clone)]
pub struct TextLabel {
    pub text: String,
    anchor: Point,
    position: Point,
    /// Pixel offset of the box from the anchor point.
    pub offset_px: (f64, f64),
    pub align: HAlign,
    pub font_px: u32,
    pub color: RGBColor,
    pub visible: bool,
}

impl TextLabel {
    pub fn new(text: impl Into<String>, at: Point, font_px: u32) -> Self {
        Self {
            text: text.into(),
            anchor: at,
            position: at,
            offset_px: (0.0, 0.0),
            align: HAlign::Left,
            font_px,
            color: BLACK,
            visible: true,
        }
    }

    pub fn with_offset(mut self, dx: f64, dy: f64) -> Self {
        self.offset_px = (dx, dy);
        self
    }

    pub fn aligned(mut self, align: HAlign) -> Self {
        self.align = align;
        self
    }

    pub fn colored(mut self, color: RGBColor) -> Self {
        self.color = color;
        self
    }

    /// Position the label was created at, in data coordinates.
    pub fn anchor(&self) -> Point {
        self.anchor
    }

    pub fn placement(&self, ctx: &CoordTransform) -> LabelPlacement {
        let a = ctx.to_pixel(self.anchor);
        let r = ctx.to_pixel(self.position);
        LabelPlacement {
            text: self.text.clone(),
            anchor_px: [a.x, a.y],
            resolved_px: [r.x, r.y],
            displacement: a.distance(r),
        }
    }

    pub fn draw<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        ctx: &CoordTransform,
    ) -> Result<()> {
        if !self.visible {
            return Ok(());
        }
        let b = self.bbox(ctx);
        let corners = [
            px(Point::new(b.x_min, b.y_min)),
            px(Point::new(b.x_max, b.y_max)),
        ];
        area.draw(&Rectangle::new(corners, WHITE.mix(0.85).filled()))
            .map_err(|e| anyhow!("{:?}", e))?;
        area.draw(&Rectangle::new(corners, self.color.mix(0.5).stroke_width(1)))
            .map_err(|e| anyhow!("{:?}", e))?;
        let style = (FontFamily::SansSerif, self.font_px)
            .into_font()
            .color(&self.color)
            .pos(Pos::new(HPos::Left, VPos::Center));
        let at = px(Point::new(b.x_min + LABEL_PAD_PX as f64, b.center().y));
        area.draw(&Text::new(self.text.clone(), at, style))
            .map_err(|e| anyhow!("{:?}", e))?;
        Ok(())
    }
}

impl Boundable for TextLabel {
    fn bbox(&self, ctx: &CoordTransform) -> BBox {
        let p = ctx.to_pixel(self.position);
        let (w, h) = label_box_px(&self.text, self.font_px);
        let (dx, dy) = self.offset_px;
        let x0 = match self.align {
            HAlign::Left => p.x + dx,
            HAlign::Right => p.x + dx - w,
        };
        BBox::from_origin(Point::new(x0, p.y + dy - h / 2.0), w, h)
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}

impl Positionable for TextLabel {
    fn position(&self) -> Point {
        self.position
    }

    fn set_position(&mut self, position: Point) {
        self.position = position;
    }
}

/// Horizontal reference line at a data value (e.g. all-time high). Fixed.
#[derive(Debug, Clone)]
pub struct HLine {
    pub y: f64,
    pub x_from: f64,
    pub x_to: f64,
    pub color: RGBColor,
    pub width: u32,
    pub dashed: bool,
}

impl HLine {
    pub fn draw<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        ctx: &CoordTransform,
    ) -> Result<()> {
        let a = ctx.to_pixel(Point::new(self.x_from, self.y));
        let b = ctx.to_pixel(Point::new(self.x_to, self.y));
        let style = self.color.stroke_width(self.width);
        let pieces = if self.dashed {
            dash_segments(a, b, 6.0, 4.0)
        } else {
            vec![(a, b)]
        };
        for (p0, p1) in pieces {
            area.draw(&PathElement::new(vec![px(p0), px(p1)], style))
                .map_err(|e| anyhow!("{:?}", e))?;
        }
        Ok(())
    }
}

impl Boundable for HLine {
    fn bbox(&self, ctx: &CoordTransform) -> BBox {
        let a = ctx.to_pixel(Point::new(self.x_from, self.y));
        let b = ctx.to_pixel(Point::new(self.x_to, self.y));
        let half = self.width as f64 / 2.0;
        BBox::new(a.x, a.y - half, b.x, b.y + half)
    }
}

/// Polyline series (close, moving averages). Registered as a line path.
#[derive(Debug, Clone)]
pub struct LineArtist {
    pub name: String,
    pub points: Vec<Point>,
    pub color: RGBColor,
    pub width: u32,
    pub visible: bool,
}

impl LineArtist {
    pub fn new(name: impl Into<String>, points: Vec<Point>, color: RGBColor, width: u32) -> Self {
        Self {
            name: name.into(),
            points,
            color,
            width,
            visible: true,
        }
    }

    pub fn draw<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        ctx: &CoordTransform,
    ) -> Result<()> {
        if !self.visible || self.points.len() < 2 {
            return Ok(());
        }
        let pts: Vec<(i32, i32)> = self.points.iter().map(|p| px(ctx.to_pixel(*p))).collect();
        area.draw(&PathElement::new(pts, self.color.stroke_width(self.width)))
            .map_err(|e| anyhow!("{:?}", e))?;
        Ok(())
    }
}

impl PathGeometry for LineArtist {
    fn vertices(&self) -> &[Point] {
        &self.points
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}

/// Filled dot on a data point (period low/high). Fixed.
#[derive(Debug, Clone)]
pub struct Marker {
    pub at: Point,
    pub radius_px: f64,
    pub color: RGBColor,
}

impl Marker {
    pub fn draw<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        ctx: &CoordTransform,
    ) -> Result<()> {
        let c = px(ctx.to_pixel(self.at));
        area.draw(&Circle::new(
            c,
            self.radius_px.round() as i32,
            self.color.filled(),
        ))
        .map_err(|e| anyhow!("{:?}", e))?;
        Ok(())
    }
}

impl Boundable for Marker {
    fn bbox(&self, ctx: &CoordTransform) -> BBox {
        BBox::point(ctx.to_pixel(self.at)).pad(self.radius_px)
    }
}

/// One volume bar from zero to `value`, centered on `x`. Drawn as a patch.
#[derive(Debug, Clone)]
pub struct BarPatch {
    pub x: f64,
    pub half_width: f64,
    pub value: f64,
    pub color: RGBColor,
}

impl BarPatch {
    pub fn draw<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        ctx: &CoordTransform,
    ) -> Result<()> {
        let b = self.bbox(ctx);
        let corners = [
            px(Point::new(b.x_min, b.y_min)),
            px(Point::new(b.x_max, b.y_max)),
        ];
        area.draw(&Rectangle::new(corners, self.color.mix(0.45).filled()))
            .map_err(|e| anyhow!("{:?}", e))?;
        Ok(())
    }
}

impl Boundable for BarPatch {
    fn bbox(&self, ctx: &CoordTransform) -> BBox {
        let a = ctx.to_pixel(Point::new(self.x - self.half_width, 0.0));
        let b = ctx.to_pixel(Point::new(self.x + self.half_width, self.value));
        BBox::new(a.x, a.y, b.x, b.y)
    }
}

/// Translucent vertical band over an x range (recent period). Passive.
#[derive(Debug, Clone)]
pub struct Band {
    pub x_from: f64,
    pub x_to: f64,
    pub y_lo: f64,
    pub y_hi: f64,
    pub color: RGBColor,
}

impl Band {
    pub fn draw<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        ctx: &CoordTransform,
    ) -> Result<()> {
        let b = self.bbox(ctx);
        let corners = [
            px(Point::new(b.x_min, b.y_min)),
            px(Point::new(b.x_max, b.y_max)),
        ];
        area.draw(&Rectangle::new(corners, self.color.mix(0.10).filled()))
            .map_err(|e| anyhow!("{:?}", e))?;
        Ok(())
    }
}

impl Boundable for Band {
    fn bbox(&self, ctx: &CoordTransform) -> BBox {
        let a = ctx.to_pixel(Point::new(self.x_from, self.y_lo));
        let b = ctx.to_pixel(Point::new(self.x_to, self.y_hi));
        BBox::new(a.x, a.y, b.x, b.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_box_follows_position_and_alignment() {
        let ctx = CoordTransform::identity();
        let mut label = TextLabel::new("abcd", Point::new(100.0, 50.0), 10).with_offset(4.0, 0.0);
        assert_eq!(label.bbox(&ctx), BBox::new(104.0, 41.0, 134.0, 59.0));
        label.set_position(Point::new(100.0, 20.0));
        assert_eq!(label.bbox(&ctx), BBox::new(104.0, 11.0, 134.0, 29.0));
        assert_eq!(label.anchor(), Point::new(100.0, 50.0));

        let right = TextLabel::new("abcd", Point::new(100.0, 50.0), 10).aligned(HAlign::Right);
        assert_eq!(right.bbox(&ctx).x_max, 100.0);
    }

    #[test]
    fn placement_reports_displacement() {
        let ctx = CoordTransform::identity();
        let mut label = TextLabel::new("x", Point::new(0.0, 0.0), 10);
        label.set_position(Point::new(0.0, -30.0));
        let p = label.placement(&ctx);
        assert_eq!(p.displacement, 30.0);
        assert_eq!(p.resolved_px, [0.0, -30.0]);
    }

    #[test]
    fn bar_spans_zero_to_value() {
        let bar = BarPatch {
            x: 10.0,
            half_width: 2.0,
            value: 5.0,
            color: BLUE,
        };
        assert_eq!(bar.bbox(&CoordTransform::identity()), BBox::new(8.0, 0.0, 12.0, 5.0));
    }
}
