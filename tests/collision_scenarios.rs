use stockviz::collision::{
    BBox, Boundable, CoordTransform, ParticipationRegistry, PathGeometry, Point, Positionable,
    Shared, Surface, resolve, resolve_composed, resolve_surface, shared,
};
use stockviz::config::{CollisionConfig, Movement};

/// Label whose position is its top-left corner.
struct Tag {
    pos: Point,
    w: f64,
    h: f64,
}

impl Tag {
    fn at(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            pos: Point::new(x, y),
            w,
            h,
        }
    }
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

fn wide_surface() -> Surface {
    Surface::new(
        "main",
        BBox::new(-200.0, -200.0, 600.0, 600.0),
        CoordTransform::identity(),
    )
}

fn config(obstacle_padding: f64, label_padding: f64) -> CollisionConfig {
    CollisionConfig {
        obstacle_padding,
        label_padding,
        ..CollisionConfig::default()
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn overlapping_labels_split_symmetrically() {
    let s = wide_surface();
    let a = shared(Tag::at(0.0, 0.0, 100.0, 20.0));
    let b = shared(Tag::at(0.0, 10.0, 100.0, 20.0));
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&s, &a);
    reg.register_moveable(&s, &b);

    let report = resolve(&reg, &[s.clone()], &config(4.0, 4.0));

    assert!(close(a.borrow().pos.y, -7.0), "a at {:?}", a.borrow().pos);
    assert!(close(b.borrow().pos.y, 17.0), "b at {:?}", b.borrow().pos);
    assert!(report.converged);
    assert_eq!(report.unresolved, 0);
    assert_eq!(report.moves, 1);
    let gap = b.borrow().pos.y - (a.borrow().pos.y + 20.0);
    assert!(gap >= 4.0 - 1e-9);
}

#[test]
fn label_moves_up_off_fixed_obstacle() {
    let s = wide_surface();
    let label = shared(Tag::at(0.0, 0.0, 50.0, 20.0));
    let wall = shared(Block(BBox::new(0.0, 15.0, 50.0, 40.0)));
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&s, &label);
    reg.register_fixed(&s, &wall);

    let report = resolve(&reg, &[s.clone()], &config(5.0, 4.0));

    let bbox = label.borrow().bbox(&s.transform());
    assert_eq!(bbox, BBox::new(0.0, -10.0, 50.0, 10.0));
    assert_eq!(report.obstacles, 1);
    assert_eq!(report.unresolved, 0);
}

#[test]
fn trapped_label_stays_put() {
    let s = Surface::new(
        "main",
        BBox::new(0.0, 0.0, 100.0, 90.0),
        CoordTransform::identity(),
    );
    let label = shared(Tag::at(10.0, 35.0, 50.0, 20.0));
    let upper = shared(Block(BBox::new(0.0, 0.0, 100.0, 40.0)));
    let lower = shared(Block(BBox::new(0.0, 50.0, 100.0, 90.0)));
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&s, &label);
    reg.register_fixed(&s, &upper);
    reg.register_fixed(&s, &lower);

    let report = resolve(&reg, &[s.clone()], &config(0.0, 0.0));

    assert_eq!(label.borrow().pos, Point::new(10.0, 35.0));
    assert_eq!(report.moves, 0);
    assert_eq!(report.unresolved, 1);
    assert!(report.converged);
}

/// Label boxed in on every single axis; only a diagonal step escapes.
fn boxed_in_scene() -> (Surface, ParticipationRegistry, Vec<Shared<Block>>, Shared<Tag>) {
    let s = Surface::new(
        "boxed",
        BBox::new(0.0, 0.0, 200.0, 200.0),
        CoordTransform::identity(),
    );
    let label = shared(Tag::at(50.0, 50.0, 40.0, 20.0));
    let blocks: Vec<_> = [
        BBox::new(40.0, 40.0, 100.0, 80.0),
        BBox::new(0.0, 0.0, 100.0, 30.0),
        BBox::new(0.0, 90.0, 200.0, 200.0),
        BBox::new(100.0, 45.0, 200.0, 75.0),
    ]
    .into_iter()
    .map(|b| shared(Block(b)))
    .collect();
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&s, &label);
    for b in &blocks {
        reg.register_fixed(&s, b);
    }
    (s, reg, blocks, label)
}

#[test]
fn xy_movement_falls_back_to_a_diagonal_step() {
    let (s, reg, _blocks, label) = boxed_in_scene();
    let cfg = CollisionConfig {
        movement: Movement::XY,
        ..config(2.0, 2.0)
    };

    let report = resolve(&reg, &[s.clone()], &cfg);

    // Up 32 and right 52 combined: clear of the top and right blocks.
    assert_eq!(report.moves, 1);
    assert_eq!(report.unresolved, 0);
    assert_eq!(label.borrow().pos, Point::new(102.0, 18.0));
}

#[test]
fn vertical_only_movement_cannot_take_the_diagonal() {
    let (s, reg, _blocks, label) = boxed_in_scene();

    let report = resolve(&reg, &[s.clone()], &config(2.0, 2.0));

    assert_eq!(report.moves, 0);
    assert_eq!(report.unresolved, 1);
    assert_eq!(label.borrow().pos, Point::new(50.0, 50.0));
}

#[test]
fn diagonal_line_does_not_block_box_beside_it() {
    let s = wide_surface();
    let label = shared(Tag::at(70.0, 0.0, 20.0, 20.0));
    let line = shared(Line(vec![Point::new(0.0, 0.0), Point::new(100.0, 100.0)]));
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&s, &label);
    reg.register_line_path(&s, &line);

    let report = resolve(&reg, &[s.clone()], &CollisionConfig::default());

    assert_eq!(label.borrow().pos, Point::new(70.0, 0.0));
    assert_eq!(report.moves, 0);
    assert_eq!(report.obstacles, 1);
}

#[test]
fn label_clears_line_locally() {
    let s = wide_surface();
    let label = shared(Tag::at(20.0, 45.0, 40.0, 20.0));
    let line = shared(Line(vec![Point::new(0.0, 50.0), Point::new(200.0, 50.0)]));
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&s, &label);
    reg.register_line_path(&s, &line);

    resolve(&reg, &[s.clone()], &config(4.0, 4.0));

    // Down by 9 clears the line by the padding; up would need 19.
    assert!(close(label.borrow().pos.y, 54.0), "{:?}", label.borrow().pos);
}

#[test]
fn vertical_movement_never_changes_x() {
    let s = wide_surface();
    let tags: Vec<_> = (0..5)
        .map(|i| shared(Tag::at(i as f64 * 7.0, i as f64 * 3.0, 60.0, 15.0)))
        .collect();
    let wall = shared(Block(BBox::new(-10.0, 5.0, 120.0, 12.0)));
    let mut reg = ParticipationRegistry::new();
    for t in &tags {
        reg.register_moveable(&s, t);
    }
    reg.register_fixed(&s, &wall);

    let report = resolve(&reg, &[s.clone()], &CollisionConfig::default());

    for (i, t) in tags.iter().enumerate() {
        assert_eq!(t.borrow().pos.x, i as f64 * 7.0);
    }
    // Too crowded for greedy vertical moves: three labels stay stuck.
    assert!(report.converged);
    assert_eq!(report.unresolved, 3);
}

#[test]
fn resolvable_labels_end_clear_of_everything() {
    let s = wide_surface();
    let tags: Vec<_> = [
        (0.0, 0.0),
        (40.0, 10.0),
        (120.0, 30.0),
        (150.0, 38.0),
        (260.0, 0.0),
    ]
    .into_iter()
    .map(|(x, y)| shared(Tag::at(x, y, 60.0, 15.0)))
    .collect();
    let band = BBox::new(-10.0, 60.0, 400.0, 70.0);
    let block = BBox::new(250.0, 10.0, 330.0, 20.0);
    let mut reg = ParticipationRegistry::new();
    for t in &tags {
        reg.register_moveable(&s, t);
    }
    let walls = [shared(Block(band)), shared(Block(block))];
    for w in &walls {
        reg.register_fixed(&s, w);
    }
    let cfg = config(4.0, 4.0);

    let report = resolve(&reg, &[s.clone()], &cfg);
    assert!(report.converged);
    assert_eq!(report.unresolved, 0);

    let boxes: Vec<BBox> = tags
        .iter()
        .map(|t| t.borrow().bbox(&CoordTransform::identity()))
        .collect();
    for (i, b) in boxes.iter().enumerate() {
        let padded = b.pad(cfg.obstacle_padding);
        assert!(!padded.overlaps(&band) && !padded.overlaps(&block), "label {i} at {b:?}");
        for (j, other) in boxes.iter().enumerate().skip(i + 1) {
            assert!(
                !b.pad(cfg.label_padding).overlaps(other),
                "labels {i} and {j} overlap: {b:?} {other:?}"
            );
        }
    }
    let xs: Vec<f64> = tags.iter().map(|t| t.borrow().pos.x).collect();
    assert_eq!(xs, vec![0.0, 40.0, 120.0, 150.0, 260.0]);
}

#[test]
fn horizontal_movement_never_changes_y() {
    let s = wide_surface();
    let label = shared(Tag::at(0.0, 0.0, 50.0, 20.0));
    let wall = shared(Block(BBox::new(40.0, -50.0, 60.0, 50.0)));
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&s, &label);
    reg.register_fixed(&s, &wall);
    let cfg = CollisionConfig {
        movement: Movement::X,
        ..config(4.0, 4.0)
    };

    resolve(&reg, &[s.clone()], &cfg);

    let pos = label.borrow().pos;
    assert_eq!(pos.y, 0.0);
    // Left: (40 - 4) - 50 = -14.
    assert!(close(pos.x, -14.0), "{pos:?}");
}

#[test]
fn resolving_twice_is_a_no_op() {
    let s = wide_surface();
    let tags: Vec<_> = (0..4)
        .map(|i| shared(Tag::at(0.0, i as f64 * 5.0, 80.0, 18.0)))
        .collect();
    let mut reg = ParticipationRegistry::new();
    for t in &tags {
        reg.register_moveable(&s, t);
    }
    let cfg = CollisionConfig::default();

    let first = resolve(&reg, &[s.clone()], &cfg);
    assert!(first.converged);
    let after_first: Vec<Point> = tags.iter().map(|t| t.borrow().pos).collect();

    let second = resolve(&reg, &[s.clone()], &cfg);
    let after_second: Vec<Point> = tags.iter().map(|t| t.borrow().pos).collect();
    assert_eq!(second.moves, 0);
    assert_eq!(second.passes, 1);
    assert_eq!(after_first, after_second);
}

#[test]
fn passes_are_bounded_by_max_iterations() {
    let s = wide_surface();
    let tags: Vec<_> = (0..6)
        .map(|_| shared(Tag::at(0.0, 0.0, 80.0, 18.0)))
        .collect();
    let mut reg = ParticipationRegistry::new();
    for t in &tags {
        reg.register_moveable(&s, t);
    }
    let cfg = CollisionConfig {
        max_iterations: 1,
        ..CollisionConfig::default()
    };

    let report = resolve(&reg, &[s.clone()], &cfg);
    assert_eq!(report.passes, 1);
    assert_eq!(report.labels, 6);
}

#[test]
fn zero_iterations_leaves_everything_in_place() {
    let s = wide_surface();
    let a = shared(Tag::at(0.0, 0.0, 50.0, 20.0));
    let b = shared(Tag::at(0.0, 5.0, 50.0, 20.0));
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&s, &a);
    reg.register_moveable(&s, &b);
    let cfg = CollisionConfig {
        max_iterations: 0,
        ..CollisionConfig::default()
    };

    let report = resolve(&reg, &[s.clone()], &cfg);
    assert_eq!(report.passes, 0);
    assert_eq!(report.unresolved, 2);
    assert_eq!(a.borrow().pos, Point::new(0.0, 0.0));
    assert_eq!(b.borrow().pos, Point::new(0.0, 5.0));
}

#[test]
fn passive_elements_are_ignored() {
    let s = wide_surface();
    let label = shared(Tag::at(0.0, 0.0, 50.0, 20.0));
    let shade = shared(Block(BBox::new(-100.0, -100.0, 300.0, 300.0)));
    s.add_patch(&shade);
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&s, &label);
    reg.register_passive(&s, &shade);

    let report = resolve(&reg, &[s.clone()], &CollisionConfig::default());
    assert_eq!(report.obstacles, 0);
    assert_eq!(label.borrow().pos, Point::new(0.0, 0.0));
}

#[test]
fn unclassified_patches_are_obstacles() {
    let s = wide_surface();
    let label = shared(Tag::at(0.0, 0.0, 50.0, 20.0));
    let bar = shared(Block(BBox::new(0.0, 10.0, 50.0, 200.0)));
    s.add_patch(&bar);
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&s, &label);

    let report = resolve(&reg, &[s.clone()], &config(4.0, 4.0));
    assert_eq!(report.obstacles, 1);
    // Up: (10 - 4) - 20 = -14.
    assert!(close(label.borrow().pos.y, -14.0));
}

#[test]
fn moveable_patch_is_not_its_own_obstacle() {
    let s = wide_surface();
    let label = shared(Tag::at(0.0, 0.0, 50.0, 20.0));
    s.add_patch(&label);
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&s, &label);

    let report = resolve(&reg, &[s.clone()], &CollisionConfig::default());
    assert_eq!(report.obstacles, 0);
    assert_eq!(report.moves, 0);
}

#[test]
fn invisible_labels_do_not_take_part() {
    struct Hidden(Tag);
    impl Boundable for Hidden {
        fn bbox(&self, ctx: &CoordTransform) -> BBox {
            self.0.bbox(ctx)
        }
        fn is_visible(&self) -> bool {
            false
        }
    }
    impl Positionable for Hidden {
        fn position(&self) -> Point {
            self.0.pos
        }
        fn set_position(&mut self, position: Point) {
            self.0.pos = position;
        }
    }

    let s = wide_surface();
    let ghost = shared(Hidden(Tag::at(0.0, 0.0, 50.0, 20.0)));
    let wall = shared(Block(BBox::new(0.0, 0.0, 50.0, 20.0)));
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&s, &ghost);
    reg.register_fixed(&s, &wall);

    let report = resolve(&reg, &[s.clone()], &CollisionConfig::default());
    assert_eq!(report.labels, 0);
    assert_eq!(ghost.borrow().0.pos, Point::new(0.0, 0.0));
}

#[test]
fn twin_patches_repel_primary_labels() {
    let price = wide_surface();
    let volume = price.twin("volume", CoordTransform::identity());
    let label = shared(Tag::at(0.0, 100.0, 50.0, 20.0));
    let bar = shared(Block(BBox::new(0.0, 110.0, 50.0, 300.0)));
    volume.add_patch(&bar);
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&price, &label);

    let report = resolve_composed(&reg, &price, &config(4.0, 4.0));
    assert_eq!(report.obstacles, 1);
    assert!(close(label.borrow().pos.y, 86.0), "{:?}", label.borrow().pos);
}

#[test]
fn composition_pools_labels_across_twins() {
    let price = wide_surface();
    let volume = price.twin("volume", CoordTransform::identity());
    let a = shared(Tag::at(0.0, 0.0, 100.0, 20.0));
    let b = shared(Tag::at(0.0, 10.0, 100.0, 20.0));
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&price, &a);
    reg.register_moveable(&volume, &b);

    let report = resolve_composed(&reg, &price, &config(4.0, 4.0));
    assert_eq!(report.labels, 2);
    assert!(close(a.borrow().pos.y, -7.0));
    assert!(close(b.borrow().pos.y, 17.0));
}

#[test]
fn resolving_one_twin_pins_the_other_twins_labels() {
    let price = wide_surface();
    let volume = price.twin("volume", CoordTransform::identity());
    let a = shared(Tag::at(0.0, 0.0, 100.0, 20.0));
    let b = shared(Tag::at(0.0, 10.0, 100.0, 20.0));
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&price, &a);
    reg.register_moveable(&volume, &b);

    let alone = resolve_surface(&reg, &volume, &config(4.0, 4.0));
    assert_eq!(alone.labels, 1);
    assert_eq!(alone.obstacles, 1);
    assert_eq!(alone.moves, 1);
    assert_eq!(alone.unresolved, 0);
    // The price label does not move; the volume label clears it downwards.
    assert_eq!(a.borrow().pos, Point::new(0.0, 0.0));
    assert!(close(b.borrow().pos.y, 24.0), "{:?}", b.borrow().pos);
}

#[test]
fn data_coordinates_round_trip_through_transform() {
    let area = BBox::new(0.0, 0.0, 200.0, 100.0);
    let t = CoordTransform::from_ranges(0.0..100.0, 0.0..50.0, area);
    let s = Surface::new("scaled", area, t);
    // 2 px per unit in both axes; y flipped.
    let label = shared(Tag::at(10.0, 30.0, 40.0, 10.0));
    let wall = shared(Block(BBox::new(0.0, 45.0, 200.0, 60.0)));
    let mut reg = ParticipationRegistry::new();
    reg.register_moveable(&s, &label);
    reg.register_fixed(&s, &wall);

    resolve(&reg, &[s.clone()], &config(0.0, 0.0));

    // Box starts at pixel y 40 and spans to 50; up by 5 px is 2.5 data units higher.
    assert!(close(label.borrow().pos.y, 32.5), "{:?}", label.borrow().pos);
    assert_eq!(label.borrow().pos.x, 10.0);
}
