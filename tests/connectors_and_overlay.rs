use plotters::prelude::*;
use plotters_svg::SVGBackend;
use stockviz::collision::{
    BBox, Boundable, CoordTransform, ParticipationRegistry, PathGeometry, Point, Positionable,
    Shared, Surface, draw_connectors, draw_debug_overlay, plan_connectors, resolve,
    resolve_and_render, shared,
};
use stockviz::config::{CollisionConfig, ConnectorStyle};

struct Tag {
    pos: Point,
    w: f64,
    h: f64,
}

impl Boundable for Tag {
    fn bbox(&self, ctx: &CoordTransform) -> BBox {
        BBox::from_origin(ctx.to_pixel(self.pos), self.w, self.h)
    }
}

impl Positionable for Tag {
    fn position(&self) -> Point {
        self.pos
    }
    fn set_position(&mut self, position: Point) {
        self.pos = position;
    }
}

struct Block(BBox);

impl Boundable for Block {
    fn bbox(&self, _ctx: &CoordTransform) -> BBox {
        self.0
    }
}

struct Line(Vec<Point>);

impl PathGeometry for Line {
    fn vertices(&self) -> &[Point] {
        &self.0
    }
}

fn tag(x: f64, y: f64) -> Tag {
    Tag {
        pos: Point::new(x, y),
        w: 100.0,
        h: 20.0,
    }
}

fn surface() -> Surface {
    Surface::new(
        "main",
        BBox::new(-50.0, -50.0, 400.0, 300.0),
        CoordTransform::identity(),
    )
}

fn cfg() -> CollisionConfig {
    CollisionConfig {
        obstacle_padding: 4.0,
        label_padding: 4.0,
        ..CollisionConfig::default()
    }
}

#[test]
fn connectors_need_strictly_more_than_threshold() {
    let s = surface();
    let a = shared(tag(0.0, 0.0));
    let b = shared(tag(0.0, 10.0));
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&s, &a);
    reg.register_moveable(&s, &b);
    resolve(&reg, &[s.clone()], &cfg());

    // Each label moved exactly 7 px.
    assert!(plan_connectors(&reg, &[s.clone()], 7.0).is_empty());
    let groups = plan_connectors(&reg, &[s.clone()], 6.5);
    let group = groups.get(&s.id()).expect("one group for the surface");
    assert_eq!(group.connectors.len(), 2);
    let first = group.connectors[0];
    assert_eq!(first.anchor, Point::new(0.0, 0.0));
    assert!((first.resolved.y + 7.0).abs() < 1e-9);
    assert!((first.distance - 7.0).abs() < 1e-9);
}

#[test]
fn connectors_are_grouped_per_surface() {
    let price = surface();
    let volume = price.twin("volume", CoordTransform::identity());
    let a = shared(tag(0.0, 0.0));
    let b = shared(tag(0.0, 10.0));
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&price, &a);
    reg.register_moveable(&volume, &b);
    let surfaces = [price.clone(), volume.clone()];
    resolve(&reg, &surfaces, &cfg());

    let groups = plan_connectors(&reg, &surfaces, 1.0);
    assert_eq!(groups.len(), 2);
    assert!(groups.values().all(|g| g.connectors.len() == 1));

    let mut svg = String::new();
    let drawn = {
        let root = SVGBackend::with_string(&mut svg, (400, 300)).into_drawing_area();
        let style = ConnectorStyle {
            dash: None,
            ..ConnectorStyle::default()
        };
        let n = draw_connectors(&root, &groups, &style).unwrap();
        root.present().unwrap();
        n
    };
    assert_eq!(drawn, 2);
    assert!(svg.contains("<svg"));
}

#[test]
fn unmoved_labels_get_no_connector() {
    let s = surface();
    let a = shared(tag(0.0, 0.0));
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&s, &a);
    resolve(&reg, &[s.clone()], &cfg());
    assert!(plan_connectors(&reg, &[s.clone()], 0.0).is_empty());
}

type Scene = (
    Surface,
    ParticipationRegistry,
    Vec<Shared<Tag>>,
    Shared<Block>,
    Shared<Line>,
);

fn scene() -> Scene {
    let s = surface();
    let labels = vec![shared(tag(0.0, 0.0)), shared(tag(0.0, 10.0))];
    let block = shared(Block(BBox::new(0.0, 40.0, 100.0, 60.0)));
    let line = shared(Line(vec![Point::new(0.0, 120.0), Point::new(300.0, 120.0)]));
    let mut reg = ParticipationRegistry::new();
    for l in &labels {
        reg.register_moveable(&s, l);
    }
    reg.register_fixed(&s, &block);
    reg.register_line_path(&s, &line);
    (s, reg, labels, block, line)
}

#[test]
fn overlay_counts_what_the_engine_sees() {
    let (s, reg, _labels, _block, _line) = scene();
    let mut svg = String::new();
    let stats = {
        let root = SVGBackend::with_string(&mut svg, (400, 300)).into_drawing_area();
        let stats = draw_debug_overlay(&root, &reg, &[s.clone()]).unwrap();
        root.present().unwrap();
        stats
    };
    assert_eq!(stats.surfaces, 1);
    assert_eq!(stats.obstacles, 1);
    assert_eq!(stats.paths, 1);
    assert_eq!(stats.labels, 2);
    assert!(svg.contains("<rect"));
}

#[test]
fn overlay_does_not_change_the_layout() {
    let positions = |debug: bool| {
        let (s, reg, labels, _block, _line) = scene();
        let mut svg = String::new();
        let outcome = {
            let root = SVGBackend::with_string(&mut svg, (400, 300)).into_drawing_area();
            let outcome = resolve_and_render(&root, &reg, &[s.clone()], &cfg(), debug).unwrap();
            root.present().unwrap();
            outcome
        };
        assert_eq!(outcome.overlay.is_some(), debug);
        let pts: Vec<Point> = labels.iter().map(|l| l.borrow().pos).collect();
        (pts, outcome.report)
    };
    let (plain, plain_report) = positions(false);
    let (debugged, debug_report) = positions(true);
    assert_eq!(plain, debugged);
    assert_eq!(plain_report, debug_report);
}
