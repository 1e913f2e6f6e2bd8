use std::collections::HashSet;

use itertools::Itertools;
use petgraph::algo::astar;
use petgraph::graph::{EdgeIndex, EdgeReference};
use petgraph::graph::NodeIndex;
use petgraph::visit::{EdgeFiltered, EdgeRef};

use super::network::{NetworkGraph, Segment};
use super::LinkId;


/// A restriction of the street graph to a subset of its edges.
pub trait GraphView {
    fn admits(&self, edge: EdgeIndex) -> bool;
}

/// The unrestricted street graph.
pub struct WholeGraph;

impl GraphView for WholeGraph {
    fn admits(&self, _edge: EdgeIndex) -> bool {
        true
    }
}


/// Minimum-cost search over the edges of `network` admitted by `view`, using segment cost as
/// the weight.  With no distance heuristic, petgraph's A* is Dijkstra with an early exit at the
/// target and a path tracker.
///
/// Returns the nodes of a minimum-cost path from `source` to `target`, both included, or None
/// if `target` can't be reached.
pub fn shortest_path<VV>(network: &NetworkGraph, view: &VV, source: NodeIndex,
                         target: NodeIndex) -> Option<Vec<NodeIndex>>
    where VV: GraphView
{
    let admitted = EdgeFiltered::from_fn(network.get_graph(),
                                         |er: EdgeReference<Segment>| view.admits(er.id()));
    let result = astar(&admitted, source, |node| node == target,
                       |er: EdgeReference<Segment>| er.weight().cost, |_| 0.);
    result.map(|(_cost, path)| path)
}


/// Maps a node path to the link ids travelled, one per consecutive node pair.  Where several
/// edges join a pair, an edge on the route wins; failing that, the cheapest one.  Among equals,
/// the most recently added edge is taken.
pub fn resolve_links(network: &NetworkGraph, node_path: &[NodeIndex],
                     route_links: &HashSet<LinkId>) -> Vec<LinkId> {
    let mut links = vec![];
    for (from_idx, to_idx) in node_path.iter().tuple_windows() {
        let segments: Vec<&Segment> = network.edges_between(*from_idx, *to_idx).into_iter()
            .filter_map(|edge| network.get_segment(edge))
            .collect();
        let on_route = segments.iter().filter(|seg| route_links.contains(&seg.link_id)).last();
        let chosen = match on_route {
            Some(seg) => Some(*seg),
            None => segments.iter().fold(None, |best: Option<&Segment>, seg| match best {
                Some(best_seg) if best_seg.cost < seg.cost => Some(best_seg),
                _ => Some(*seg),
            }),
        };
        match chosen {
            Some(seg) => links.push(seg.link_id),
            None => log::warn!("no edge from {:?} to {:?} on path", from_idx, to_idx),
        }
    }
    return links;
}
