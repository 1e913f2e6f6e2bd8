use std::collections::HashSet;

use petgraph::graph::EdgeIndex;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use super::network::{LinkNodeIndex, NetworkGraph};
use super::shortest_path::GraphView;
use super::LinkId;


/// The part of the street graph a route runs on: the nodes its links touch, and the edges among
/// them that carry one of its links.  Holds edge indices into the base graph rather than a copy,
/// so loads still land on the shared edges.
pub struct Subgraph<'a> {
    route_links: &'a HashSet<LinkId>,
    node_index: LinkNodeIndex,
    nodes: HashSet<NodeIndex>,
    edges: HashSet<EdgeIndex>,
}

impl<'a> Subgraph<'a> {
    pub fn extract(network: &NetworkGraph, route_links: &'a HashSet<LinkId>) -> Subgraph<'a> {
        let node_index = LinkNodeIndex::for_links(network, route_links);
        let nodes = node_index.node_bunch();

        // inducing on the node bunch also picks up edges of other streets between corridor
        // intersections.  Those get pruned.
        let mut edges = HashSet::new();
        let mut num_pruned = 0;
        for er in network.get_graph().edge_references() {
            if ! (nodes.contains(&er.source()) && nodes.contains(&er.target())) {
                continue;
            }
            if route_links.contains(&er.weight().link_id) {
                edges.insert(er.id());
            } else {
                num_pruned += 1;
            }
        }
        log::debug!("corridor has {} nodes and {} edges, {} off-route edges pruned", nodes.len(),
                    edges.len(), num_pruned);

        Subgraph{route_links, node_index, nodes, edges}
    }

    pub fn get_node_index(&self) -> &LinkNodeIndex {
        &self.node_index
    }

    pub fn get_route_links(&self) -> &HashSet<LinkId> {
        self.route_links
    }

    pub fn contains_node(&self, node: NodeIndex) -> bool {
        self.nodes.contains(&node)
    }

    pub fn get_num_edges(&self) -> usize {
        self.edges.len()
    }
}

impl<'a> GraphView for Subgraph<'a> {
    fn admits(&self, edge: EdgeIndex) -> bool {
        self.edges.contains(&edge)
    }
}
