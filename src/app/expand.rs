use std::collections::{HashMap, VecDeque};

use crate::config::ViewConfig;

use super::store::{GraphLink, GraphNode, GraphStore};

/// The active part of the graph: which nodes take part, at which degree of
/// separation from the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Neighborhood {
    order: Vec<String>,
    depths: HashMap<String, usize>,
}

/// The nodes of a neighborhood and the links between them, each with its
/// depth. Nodes come in discovery order.
#[derive(Clone, Debug, PartialEq)]
pub struct Subgraph<'a> {
    pub nodes: Vec<(&'a GraphNode, usize)>,
    pub links: Vec<(&'a GraphLink, usize)>,
}

pub fn clamp_depth(max_depth: usize) -> usize {
    max_depth.clamp(ViewConfig::MIN_DEPTH, ViewConfig::MAX_DEPTH)
}

fn adjacency(store: &GraphStore) -> HashMap<&str, Vec<&str>> {
    let mut neighbors: HashMap<&str, Vec<&str>> = HashMap::new();
    for link in store.links() {
        neighbors
            .entry(link.source_id())
            .or_default()
            .push(link.target_id());
        neighbors
            .entry(link.target_id())
            .or_default()
            .push(link.source_id());
    }
    neighbors
}

/// Breadth-first expansion from `root_id`, ignoring link direction. Every node
/// keeps the depth at which it was first discovered.
pub fn expand(store: &GraphStore, root_id: &str, max_depth: usize) -> Neighborhood {
    let max_depth = clamp_depth(max_depth);
    let mut neighborhood = Neighborhood {
        order: Vec::new(),
        depths: HashMap::new(),
    };

    if !store.contains_node(root_id) {
        return neighborhood;
    }

    let neighbors = adjacency(store);
    let mut queue = VecDeque::from([(root_id, 0usize)]);
    neighborhood.admit(root_id, 0);

    while let Some((node_id, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }

        let Some(next_ids) = neighbors.get(node_id) else {
            continue;
        };

        for &next_id in next_ids {
            if neighborhood.contains(next_id) {
                continue;
            }
            neighborhood.admit(next_id, depth + 1);
            queue.push_back((next_id, depth + 1));
        }
    }

    neighborhood
}

/// Degrees of separation between two entities, if they are within `max_depth`
/// of each other.
pub fn degrees_between(store: &GraphStore, from: &str, to: &str, max_depth: usize) -> Option<usize> {
    expand(store, from, max_depth).depth_of(to)
}

impl Neighborhood {
    /// Every node of the store at depth 0; the view when no root is selected.
    pub fn everything(store: &GraphStore) -> Self {
        let order = store
            .nodes()
            .iter()
            .map(|node| node.id().to_string())
            .collect::<Vec<_>>();
        let depths = order.iter().map(|id| (id.clone(), 0)).collect();
        Self { order, depths }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.depths.contains_key(id)
    }

    pub fn depth_of(&self, id: &str) -> Option<usize> {
        self.depths.get(id).copied()
    }

    pub fn depth_map(&self) -> &HashMap<String, usize> {
        &self.depths
    }

    pub fn link_depth(&self, link: &GraphLink) -> Option<usize> {
        let source = self.depth_of(link.source_id())?;
        let target = self.depth_of(link.target_id())?;
        Some(source.min(target))
    }

    /// Adds a node discovered outside an expansion, such as one created while
    /// this neighborhood is on screen. Known nodes keep their depth.
    pub fn admit(&mut self, id: &str, depth: usize) {
        if self.depths.contains_key(id) {
            return;
        }
        self.order.push(id.to_string());
        self.depths.insert(id.to_string(), depth);
    }

    /// Drops nodes that no longer exist in the store. Depths of the remaining
    /// nodes are left as they were.
    pub fn retain_existing(&mut self, store: &GraphStore) {
        self.order.retain(|id| store.contains_node(id));
        self.depths.retain(|id, _| store.contains_node(id));
    }

    pub fn subgraph<'a>(&self, store: &'a GraphStore) -> Subgraph<'a> {
        let nodes = self
            .order
            .iter()
            .filter_map(|id| Some((store.node(id)?, self.depth_of(id)?)))
            .collect();
        let links = store
            .links()
            .iter()
            .filter_map(|link| Some((link, self.link_depth(link)?)))
            .collect();
        Subgraph { nodes, links }
    }
}
