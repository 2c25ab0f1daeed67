use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use eframe::egui::{Color32, Vec2, vec2};

use crate::history::EntityKind;
use crate::util::short_label;

use super::persist::write_layout;
use super::session::GraphSession;
use super::visual::{
    Emphasis, LinkVisual, NodeVisual, link_control_point, link_visual, node_visual, screen_radius,
};

const LABEL_CHARS: usize = 28;
const SVG_MARGIN: f32 = 80.0;
/// Extra screen points around a disc that still count as a hit.
const HIT_SLACK: f32 = 4.0;

/// How a scene is being captured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capture<'a> {
    /// On-screen drawing: emphasis follows the pointer, lock badges are shown.
    Live {
        selected: Option<&'a str>,
        hovered: Option<&'a str>,
    },
    /// Export: every label visible, no emphasis and no affordances.
    Export,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub id: String,
    pub label: String,
    pub kind: EntityKind,
    pub position: Vec2,
    pub visual: NodeVisual,
    pub emphasis: Emphasis,
    pub show_lock_badge: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneLink {
    pub id: String,
    pub source: Vec2,
    pub target: Vec2,
    pub control: Vec2,
    pub visual: LinkVisual,
}

/// Render-ready view of the active graph in world coordinates. Elements that
/// the temporal reveal has not reached yet are left out.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub links: Vec<SceneLink>,
}

impl Scene {
    pub fn capture(session: &GraphSession, capture: Capture<'_>) -> Self {
        let store = session.store();
        let view = session.active_view();

        let links = view
            .links
            .iter()
            .filter_map(|&(link, _)| {
                if !session.is_link_revealed(link) {
                    return None;
                }
                let visibility = session.link_visibility(link);
                let source = store.node(link.source_id())?.position();
                let target = store.node(link.target_id())?.position();
                let control = link_control_point(source.to_pos2(), target.to_pos2()).to_vec2();
                Some(SceneLink {
                    id: link.id().to_string(),
                    source,
                    target,
                    control,
                    visual: link_visual(link.kind(), link.opacity(), visibility),
                })
            })
            .collect();

        let nodes = view
            .nodes
            .iter()
            .filter_map(|&(node, depth)| {
                if !session.temporal().is_revealed(node.year()) {
                    return None;
                }
                let visibility = session.node_visibility(node);

                let emphasis = match capture {
                    Capture::Live { selected, hovered } => Emphasis {
                        selected: selected == Some(node.id()),
                        hovered: hovered == Some(node.id()),
                    },
                    Capture::Export => Emphasis::default(),
                };
                let mut visual = node_visual(
                    node.entity().kind,
                    depth,
                    node.opacity(),
                    emphasis,
                    visibility,
                );
                if capture == Capture::Export {
                    visual.label_opacity = 1.0;
                }

                Some(SceneNode {
                    id: node.id().to_string(),
                    label: short_label(&node.entity().name, LABEL_CHARS),
                    kind: node.entity().kind,
                    position: node.position(),
                    visual,
                    emphasis,
                    show_lock_badge: node.is_locked() && matches!(capture, Capture::Live { .. }),
                })
            })
            .collect();

        Self { nodes, links }
    }

    /// Topmost node whose disc, as drawn at `zoom`, contains `world`.
    pub fn node_at(&self, world: Vec2, zoom: f32) -> Option<&SceneNode> {
        let zoom = zoom.max(0.05);
        self.nodes.iter().rev().find(|node| {
            (node.position - world).length() * zoom
                <= screen_radius(node.visual.radius, zoom) + HIT_SLACK
        })
    }

    /// World-space bounding box of everything in the scene.
    pub fn bounds(&self) -> Option<(Vec2, Vec2)> {
        let points = self
            .nodes
            .iter()
            .flat_map(|node| {
                let reach = vec2(node.visual.radius, node.visual.radius);
                [node.position - reach, node.position + reach]
            })
            .chain(self.links.iter().map(|link| link.control));

        points.fold(None, |bounds, point| match bounds {
            None => Some((point, point)),
            Some((min, max)) => Some((min.min(point), max.max(point))),
        })
    }

    pub fn to_svg(&self) -> String {
        let (min, max) = self.bounds().unwrap_or((Vec2::ZERO, Vec2::ZERO));
        let origin = min - Vec2::splat(SVG_MARGIN);
        let size = (max - min) + Vec2::splat(SVG_MARGIN * 2.0);

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{:.1} {:.1} {:.1} {:.1}" width="{:.0}" height="{:.0}">"#,
            origin.x, origin.y, size.x, size.y, size.x, size.y
        );
        let _ = writeln!(
            svg,
            r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="#11141b"/>"##,
            origin.x, origin.y, size.x, size.y
        );

        for link in &self.links {
            let dash = link
                .visual
                .style
                .dash
                .map(|(dash, gap)| format!(r#" stroke-dasharray="{dash} {gap}""#))
                .unwrap_or_default();
            let _ = writeln!(
                svg,
                r#"<path d="M {:.1} {:.1} Q {:.1} {:.1} {:.1} {:.1}" fill="none" stroke="{}" stroke-width="{}" stroke-opacity="{:.3}"{dash}/>"#,
                link.source.x,
                link.source.y,
                link.control.x,
                link.control.y,
                link.target.x,
                link.target.y,
                hex(link.visual.color),
                link.visual.style.width,
                link.visual.opacity,
            );
        }

        for node in &self.nodes {
            let fill = hex(node.visual.fill);
            let _ = writeln!(
                svg,
                r#"<circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{fill}" fill-opacity="{:.3}"/>"#,
                node.position.x,
                node.position.y,
                node.visual.radius + 8.0,
                node.visual.glow_opacity * 0.3,
            );
            let _ = writeln!(
                svg,
                r##"<circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{fill}" fill-opacity="{:.3}" stroke="#0f0f0f" stroke-opacity="{:.3}"/>"##,
                node.position.x,
                node.position.y,
                node.visual.radius,
                node.visual.opacity,
                node.visual.opacity * 0.75,
            );
            if node.visual.label_opacity > 0.0 {
                let _ = writeln!(
                    svg,
                    r##"<text x="{:.1}" y="{:.1}" fill="#eeeeee" fill-opacity="{:.3}" font-family="sans-serif" font-size="12" dominant-baseline="middle">{}</text>"##,
                    node.position.x + node.visual.radius + 5.0,
                    node.position.y,
                    node.visual.label_opacity,
                    escape_xml(&node.label),
                );
            }
        }

        svg.push_str("</svg>\n");
        svg
    }
}

fn hex(color: Color32) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
}

fn escape_xml(text: &str) -> String {
    text.chars().fold(String::with_capacity(text.len()), |mut escaped, character| {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
        escaped
    })
}

fn timestamped(dir: &Path, extension: &str) -> PathBuf {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    dir.join(format!("history-map-{seconds}.{extension}"))
}

pub fn export_svg(session: &GraphSession, dir: &Path) -> Result<PathBuf> {
    let path = timestamped(dir, "svg");
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let svg = Scene::capture(session, Capture::Export).to_svg();
    fs::write(&path, svg).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "snapshot exported");
    Ok(path)
}

pub fn export_layout(session: &GraphSession, dir: &Path) -> Result<PathBuf> {
    let path = timestamped(dir, "json");
    write_layout(&path, &session.store().to_layout())?;
    tracing::info!(path = %path.display(), "layout exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::history::{EntityDraft, Ingest, demo_dataset};

    fn demo_session() -> GraphSession {
        let mut session = GraphSession::new(SessionConfig::default());
        session.load(Ingest::Dataset(demo_dataset()));
        session
    }

    #[test]
    fn export_forces_labels_and_drops_affordances() {
        let mut session = demo_session();
        session.set_global_lock(true);
        session.focus("luther").expect("focus");

        let live = Scene::capture(
            &session,
            Capture::Live {
                selected: Some("luther"),
                hovered: None,
            },
        );
        assert!(live.nodes.iter().any(|node| node.show_lock_badge));
        assert!(live.nodes.iter().any(|node| node.visual.label_opacity < 1.0));

        let export = Scene::capture(&session, Capture::Export);
        assert_eq!(export.nodes.len(), live.nodes.len());
        assert!(export.nodes.iter().all(|node| !node.show_lock_badge));
        assert!(export.nodes.iter().all(|node| node.visual.label_opacity == 1.0));
        assert!(export.nodes.iter().all(|node| !node.emphasis.any()));
    }

    #[test]
    fn unrevealed_elements_are_left_out() {
        let mut session = demo_session();
        session.temporal_mut().scrub(1450);
        let scene = Scene::capture(&session, Capture::Export);

        let ids = scene.nodes.iter().map(|node| node.id.as_str()).collect::<Vec<_>>();
        assert!(ids.contains(&"gutenberg"));
        assert!(ids.contains(&"humanism"));
        assert!(!ids.contains(&"luther"));
        assert!(scene.links.iter().all(|link| link.id != "r-theses"));
    }

    #[test]
    fn svg_contains_every_element_with_escaped_labels() {
        let mut session = demo_session();
        session
            .create_node(EntityDraft::named("Church & <State>", EntityKind::Concept), None)
            .expect("create");
        let scene = Scene::capture(&session, Capture::Export);
        let svg = scene.to_svg();

        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<path").count(), scene.links.len());
        assert_eq!(svg.matches("<text").count(), scene.nodes.len());
        assert!(svg.contains("Church &amp; &lt;State&gt;"));
        assert!(svg.contains("stroke-dasharray"));
    }

    #[test]
    fn node_lookup_prefers_the_disc_under_the_point() {
        let session = demo_session();
        let scene = Scene::capture(&session, Capture::Export);
        let target = &scene.nodes[3];
        let found = scene.node_at(target.position, 1.0).expect("hit");
        assert!((found.position - target.position).length() <= found.visual.radius + 4.0);
        assert!(scene.node_at(vec2(1.0e6, 1.0e6), 1.0).is_none());
    }

    #[test]
    fn hit_area_matches_the_drawn_disc_when_zoomed() {
        let session = demo_session();
        let mut node = Scene::capture(&session, Capture::Export).nodes[0].clone();
        node.position = Vec2::ZERO;
        let scene = Scene {
            nodes: vec![node],
            links: Vec::new(),
        };

        // At zoom 4 the disc is drawn with a 36 point radius, 9 world units.
        assert!(scene.node_at(vec2(9.5, 0.0), 4.0).is_some());
        assert!(scene.node_at(vec2(12.0, 0.0), 4.0).is_none());
        // Zoomed out the disc stays larger than its world radius.
        assert!(scene.node_at(vec2(40.0, 0.0), 0.25).is_some());
        assert!(scene.node_at(vec2(60.0, 0.0), 0.25).is_none());
    }

    #[test]
    fn glow_follows_the_depth_tier_of_a_focused_session() {
        let mut session = demo_session();
        session.set_max_depth(3).expect("depth");
        session.focus("luther").expect("focus");
        let scene = Scene::capture(&session, Capture::Export);

        let mut depths = Vec::new();
        for node in &scene.nodes {
            let depth = session.neighborhood().depth_of(&node.id).expect("depth");
            let expected = [1.0, 0.75, 0.5, 0.3][depth.min(3)];
            assert!(
                (node.visual.glow_opacity - expected).abs() < 1e-6,
                "{} at depth {depth} glows {}",
                node.id,
                node.visual.glow_opacity
            );
            depths.push(depth);
        }
        assert!(depths.contains(&0));
        assert!(depths.contains(&1));
        assert!(depths.contains(&2));
    }

    #[test]
    fn exports_write_files() {
        let session = demo_session();
        let dir = std::env::temp_dir().join(format!("history-map-export-{}", std::process::id()));
        let svg = export_svg(&session, &dir).expect("svg");
        let layout = export_layout(&session, &dir).expect("layout");
        assert!(fs::read_to_string(svg).expect("read svg").contains("</svg>"));
        assert!(fs::read_to_string(layout).expect("read layout").contains("\"nodes\""));
        let _ = fs::remove_dir_all(dir);
    }
}
