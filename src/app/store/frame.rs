use std::collections::HashMap;

use eframe::egui::Vec2;

use super::{GraphLink, GraphNode};

/// Write access to the motion state of the active nodes for one tick.
///
/// This is the only path through which anything outside [`super::GraphStore`]
/// mutates node data, and it only reaches position and velocity. Links are
/// resolved by id when the frame is built; a link whose endpoint is not part of
/// the frame is left out of this tick.
pub struct SimulationFrame<'a> {
    nodes: Vec<&'a mut GraphNode>,
    edges: Vec<(usize, usize)>,
}

impl<'a> SimulationFrame<'a> {
    pub(super) fn new(
        nodes: &'a mut [GraphNode],
        links: &[GraphLink],
        is_active: impl Fn(&str) -> bool,
    ) -> Self {
        let nodes = nodes
            .iter_mut()
            .filter(|node| is_active(node.id()))
            .collect::<Vec<_>>();

        let index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id().to_string(), index))
            .collect::<HashMap<_, _>>();

        let mut edges = Vec::with_capacity(links.len());
        for link in links {
            match (
                index_by_id.get(link.source_id()),
                index_by_id.get(link.target_id()),
            ) {
                (Some(&source), Some(&target)) if source != target => {
                    edges.push((source, target));
                }
                _ => {
                    tracing::trace!(link = link.id(), "link endpoint outside frame, skipped");
                }
            }
        }

        Self { nodes, edges }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn position(&self, index: usize) -> Vec2 {
        self.nodes[index].position
    }

    pub fn velocity(&self, index: usize) -> Vec2 {
        self.nodes[index].velocity
    }

    pub fn pin(&self, index: usize) -> Option<Vec2> {
        self.nodes[index].pin
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    pub fn set_motion(&mut self, index: usize, position: Vec2, velocity: Vec2) {
        let node = &mut self.nodes[index];
        node.position = position;
        node.velocity = velocity;
    }
}
