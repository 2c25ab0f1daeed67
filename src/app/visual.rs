use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

use crate::history::{EntityKind, RelationKind};

const GLOW_BY_DEPTH: [f32; 4] = [1.0, 0.75, 0.5, 0.3];
const LABEL_BY_DEPTH: [f32; 3] = [1.0, 0.8, 0.6];

pub const NODE_RADIUS: f32 = 18.0;
pub const EMPHASIZED_NODE_RADIUS: f32 = 24.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Emphasis {
    pub selected: bool,
    pub hovered: bool,
}

impl Emphasis {
    pub fn any(self) -> bool {
        self.selected || self.hovered
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeVisual {
    pub radius: f32,
    pub fill: Color32,
    pub glow_opacity: f32,
    pub label_opacity: f32,
    pub opacity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkStyle {
    pub width: f32,
    /// Dash and gap length; `None` draws a solid stroke.
    pub dash: Option<(f32, f32)>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkVisual {
    pub style: LinkStyle,
    pub color: Color32,
    pub opacity: f32,
}

/// Base opacity for an element at `depth` degrees from the root. The store
/// keeps this per node, and it is also the glow tier.
pub fn depth_opacity(depth: usize) -> f32 {
    GLOW_BY_DEPTH[depth.min(GLOW_BY_DEPTH.len() - 1)]
}

pub fn label_opacity(emphasis: Emphasis, depth: usize) -> f32 {
    if emphasis.any() {
        1.0
    } else {
        LABEL_BY_DEPTH[depth.min(LABEL_BY_DEPTH.len() - 1)]
    }
}

pub fn node_radius(emphasis: Emphasis) -> f32 {
    if emphasis.any() {
        EMPHASIZED_NODE_RADIUS
    } else {
        NODE_RADIUS
    }
}

/// On-screen radius of a node disc, in points.
pub fn screen_radius(radius: f32, zoom: f32) -> f32 {
    (radius * zoom.powf(0.5)).clamp(4.0, 48.0)
}

pub fn link_style(kind: RelationKind) -> LinkStyle {
    match kind {
        RelationKind::Influenced => LinkStyle {
            width: 2.0,
            dash: None,
        },
        RelationKind::Created => LinkStyle {
            width: 3.0,
            dash: None,
        },
        RelationKind::Participated => LinkStyle {
            width: 2.0,
            dash: Some((8.0, 4.0)),
        },
        RelationKind::Documented => LinkStyle {
            width: 1.5,
            dash: Some((3.0, 3.0)),
        },
        RelationKind::Custom => LinkStyle {
            width: 1.5,
            dash: Some((10.0, 3.0)),
        },
    }
}

pub fn entity_color(kind: EntityKind) -> Color32 {
    match kind {
        EntityKind::Person => Color32::from_rgb(96, 165, 250),
        EntityKind::Event => Color32::from_rgb(248, 113, 113),
        EntityKind::Document => Color32::from_rgb(74, 222, 128),
        EntityKind::Concept => Color32::from_rgb(192, 132, 252),
        EntityKind::Term => Color32::from_rgb(251, 191, 36),
    }
}

pub fn relation_color(kind: RelationKind) -> Color32 {
    match kind {
        RelationKind::Influenced => Color32::from_rgb(148, 163, 184),
        RelationKind::Created => Color32::from_rgb(125, 211, 252),
        RelationKind::Participated => Color32::from_rgb(253, 186, 116),
        RelationKind::Documented => Color32::from_rgb(134, 239, 172),
        RelationKind::Custom => Color32::from_rgb(203, 213, 225),
    }
}

/// `base_opacity` is the node's stored opacity, which already carries the
/// depth tier, so the glow uses it as is.
pub fn node_visual(
    kind: EntityKind,
    depth: usize,
    base_opacity: f32,
    emphasis: Emphasis,
    temporal_visibility: f32,
) -> NodeVisual {
    let opacity = (base_opacity * temporal_visibility).clamp(0.0, 1.0);
    NodeVisual {
        radius: node_radius(emphasis),
        fill: entity_color(kind),
        glow_opacity: opacity,
        label_opacity: label_opacity(emphasis, depth) * temporal_visibility,
        opacity,
    }
}

pub fn link_visual(kind: RelationKind, base_opacity: f32, temporal_visibility: f32) -> LinkVisual {
    LinkVisual {
        style: link_style(kind),
        color: relation_color(kind),
        opacity: (base_opacity * temporal_visibility).clamp(0.0, 1.0),
    }
}

/// Sideways bow of a link arc, as a function of the endpoint distance only.
pub fn link_bow(distance: f32) -> f32 {
    (distance * 0.12).min(36.0)
}

/// The control point of the quadratic curve drawn for a link.
pub fn link_control_point(start: Pos2, end: Pos2) -> Pos2 {
    let delta = end - start;
    let distance = delta.length();
    let mid = start + delta * 0.5;
    if distance <= f32::EPSILON {
        return mid;
    }
    let normal = Vec2::new(-delta.y, delta.x) / distance;
    mid + normal * link_bow(distance)
}

/// Points along the quadratic curve from `start` through `control` to `end`.
pub fn quadratic_points(start: Pos2, control: Pos2, end: Pos2, segments: usize) -> Vec<Pos2> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|step| {
            let t = step as f32 / segments as f32;
            let inverse = 1.0 - t;
            let point = start.to_vec2() * (inverse * inverse)
                + control.to_vec2() * (2.0 * inverse * t)
                + end.to_vec2() * (t * t);
            point.to_pos2()
        })
        .collect()
}

pub fn with_opacity(color: Color32, opacity: f32) -> Color32 {
    let opacity = opacity.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        color.r(),
        color.g(),
        color.b(),
        (color.a() as f32 * opacity) as u8,
    )
}

pub fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(17, 20, 27));

    let step = (64.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 84, 60));

    let mut x = origin.x.rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = origin.y.rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + world * zoom
}

pub fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - rect.center() - pan) / zoom
}
