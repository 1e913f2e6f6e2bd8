// Turns per-stop boardings and alightings into load on the street edges between stops.
use itertools::Itertools;

use super::network::{EdgeLoads, LinkEnds, LinkNodeIndex, NetworkGraph};
use super::route_data::{Direction, RouteDirectionTotals, StopData};
use super::shortest_path::{resolve_links, shortest_path, WholeGraph};
use super::subgraph::Subgraph;
use super::{LinkId, RouteId};


/// What to do with a stop pair when no path joins its stops.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum NoPathPolicy {
    /// Apportion along the links resolved for the previous stop pair.
    ReusePrevious,
    /// Apportion onto the source link only.
    SkipPath,
}

impl Default for NoPathPolicy {
    fn default() -> NoPathPolicy {
        NoPathPolicy::ReusePrevious
    }
}

/// Problems found while walking one route direction.
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct DirectionFlags {
    /// More riders alighted somewhere than were aboard.
    pub bad_data: bool,
    /// A stop's link isn't in the street graph; the rest of the direction was abandoned.
    pub missing_link: bool,
    /// The boarding or alighting total is zero, so the direction was not walked.
    pub zero_totals: bool,
}


/// Scales up whichever of a stop's boardings or alightings belongs to the smaller of the two
/// route totals, so that boardings and alightings balance over the whole direction.
///
/// Returns (adjusted boardings, adjusted alightings).  Both totals must be non-zero.
pub fn adjust_ridership(ons: i64, offs: i64, totals: RouteDirectionTotals) -> (f64, f64) {
    let (ons, offs) = (ons as f64, offs as f64);
    let total_on = totals.boardings as f64;
    let total_off = totals.alightings as f64;
    if total_on > total_off {
        let diff = total_on - total_off;
        return (ons, offs + diff * (offs / total_off));
    } else {
        let diff = total_off - total_on;
        return (ons + diff * (ons / total_on), offs);
    }
}


/// The links of two consecutive stops and the edges found for them.
struct StopPair {
    src_link: LinkId,
    tgt_link: LinkId,
    src_ends: LinkEnds,
    tgt_ends: LinkEnds,
}

/// Where the ends of a stop pair were found.
enum PairLookup {
    /// Both links are on the route's corridor.
    Corridor(StopPair),
    /// At least one link is off the corridor but both are in the street graph.
    WholeGraph(StopPair),
    Missing,
}


pub struct Apportioner<'a> {
    network: &'a NetworkGraph,
    all_links: &'a LinkNodeIndex,
    policy: NoPathPolicy,
}

impl<'a> Apportioner<'a> {
    pub fn new(network: &'a NetworkGraph, all_links: &'a LinkNodeIndex, policy: NoPathPolicy)
               -> Apportioner<'a> {
        Apportioner{network, all_links, policy}
    }

    /// Walks the stops of one route direction in sequence order, adding the riders on board
    /// between each pair of consecutive stops to `loads`.
    pub fn apportion_direction(&self, route: RouteId, direction: Direction, subgraph: &Subgraph,
                               stops: &[StopData], totals: RouteDirectionTotals,
                               loads: &mut EdgeLoads) -> DirectionFlags {
        let mut flags = DirectionFlags::default();
        if stops.len() < 2 {
            return flags;
        }
        if totals.boardings == 0 || totals.alightings == 0 {
            log::warn!("route {} {}: {} boardings and {} alightings in total, skipping", route,
                       direction, totals.boardings, totals.alightings);
            flags.zero_totals = true;
            return flags;
        }

        let mut total = 0.;
        let mut prev_links: Vec<LinkId> = vec![];
        for (ii, (src_stop, tgt_stop)) in stops.iter().tuple_windows().enumerate() {
            let (pair, path) = match self.locate_pair(subgraph, src_stop.link_id,
                                                      tgt_stop.link_id) {
                PairLookup::Corridor(pair) => {
                    let path = shortest_path(self.network, subgraph, pair.src_ends.from,
                                             pair.tgt_ends.from);
                    (pair, path)
                }
                PairLookup::WholeGraph(pair) => {
                    log::debug!("route {} {}: links {} -> {} not both on the corridor, using the \
                                 whole graph", route, direction, pair.src_link, pair.tgt_link);
                    let path = shortest_path(self.network, &WholeGraph, pair.src_ends.from,
                                             pair.tgt_ends.from);
                    (pair, path)
                }
                PairLookup::Missing => {
                    log::warn!("route {} {}: link {:?} or {:?} is not in the street graph, \
                                abandoning the rest of the direction", route, direction,
                               src_stop.link_id, tgt_stop.link_id);
                    flags.missing_link = true;
                    break;
                }
            };
            let StopPair{src_link, tgt_link, src_ends, ..} = pair;

            let mut links = match path {
                Some(path) => resolve_links(self.network, &path, subgraph.get_route_links()),
                None => {
                    log::warn!("route {} {}: no path from link {} to link {}", route, direction,
                               src_link, tgt_link);
                    match self.policy {
                        NoPathPolicy::ReusePrevious => prev_links.clone(),
                        NoPathPolicy::SkipPath => vec![],
                    }
                }
            };
            // the path starts on the source link and stops short of the target link, which is
            // the next pair's source
            if ! links.contains(&src_link) {
                links.insert(0, src_link);
            }
            if links.contains(&tgt_link) {
                links.pop();
            }

            let (adjusted_ons, adjusted_offs) = adjust_ridership(src_stop.boardings,
                                                                 src_stop.alightings, totals);
            if ii == 0 {
                // everyone boarding or alighting at the first stop counts toward it
                total += adjusted_ons + adjusted_offs;
            } else {
                total += adjusted_ons;
            }
            loads.add(src_ends.edge, total);

            if total < adjusted_offs {
                log::warn!("route {} {}: {} alightings at link {} but only {} aboard", route,
                           direction, adjusted_offs, src_link, total);
                flags.bad_data = true;
                total = totals.boardings.max(totals.alightings) as f64;
            } else {
                total -= adjusted_offs;
            }
            for link_id in links.iter().skip(1) {
                match self.all_links.get(Some(*link_id)) {
                    Some(ends) => loads.add(ends.edge, total),
                    None => log::warn!("link {} on path is not indexed", link_id),
                }
            }
            prev_links = links;
        }
        return flags;
    }

    /// Finds the ends of both links on the corridor if it can, otherwise anywhere in the graph.
    fn locate_pair(&self, subgraph: &Subgraph, src_link: Option<LinkId>,
                   tgt_link: Option<LinkId>) -> PairLookup {
        let (src_link, tgt_link) = match (src_link, tgt_link) {
            (Some(src_link), Some(tgt_link)) => (src_link, tgt_link),
            _ => return PairLookup::Missing,
        };
        let corridor = subgraph.get_node_index();
        if let (Some(src_ends), Some(tgt_ends)) = (corridor.get(Some(src_link)),
                                                   corridor.get(Some(tgt_link))) {
            let pair = StopPair{src_link, tgt_link, src_ends: *src_ends, tgt_ends: *tgt_ends};
            return PairLookup::Corridor(pair);
        }
        // the ridership and the route definitions can come from different service periods
        if let (Some(src_ends), Some(tgt_ends)) = (self.all_links.get(Some(src_link)),
                                                   self.all_links.get(Some(tgt_link))) {
            let pair = StopPair{src_link, tgt_link, src_ends: *src_ends, tgt_ends: *tgt_ends};
            return PairLookup::WholeGraph(pair);
        }
        return PairLookup::Missing;
    }
}
