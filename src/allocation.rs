use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use rayon::prelude::*;

use super::apportion::{Apportioner, DirectionFlags, NoPathPolicy};
use super::config_utils::RidershipConfig;
use super::error::RidershipError;
use super::network::{EdgeLoads, Ledger, LinkNodeIndex, NetworkGraph, SegmentRecord};
use super::route_data::{Direction, RouteMetrics, RouteSegmentIndex};
use super::subgraph::Subgraph;
use super::{LinkId, RouteId};


/// The ledger of a finished run and the route directions that had problems along the way.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RunReport {
    pub ledger: Ledger,
    /// Route directions where more riders alighted than were aboard.
    pub bad_data: Vec<(RouteId, Direction)>,
    /// Route directions cut short by a stop on a link missing from the street graph.
    pub missing_link: Vec<(RouteId, Direction)>,
    /// Route directions not walked because they had no boardings or no alightings.
    pub zero_totals: Vec<(RouteId, Direction)>,
    /// Routes with ridership but no links in the route segments table, in ascending order.
    pub unmatched_routes: Vec<RouteId>,
}

impl RunReport {
    fn record(&mut self, route: RouteId, direction: Direction, flags: &DirectionFlags) {
        let key = (route, direction);
        if flags.bad_data && ! self.bad_data.contains(&key) {
            self.bad_data.push(key);
        }
        if flags.missing_link && ! self.missing_link.contains(&key) {
            self.missing_link.push(key);
        }
        if flags.zero_totals && ! self.zero_totals.contains(&key) {
            self.zero_totals.push(key);
        }
    }
}

/// One route's contribution to the edge loads.
struct RouteAllocation {
    route: RouteId,
    loads: EdgeLoads,
    flags: Vec<(Direction, DirectionFlags)>,
}


/// Applies stop-level ridership to the street network, route by route.
pub struct RidershipAllocator {
    network: NetworkGraph,
    all_links: LinkNodeIndex,
    route_segments: RouteSegmentIndex,
    metrics: RouteMetrics,
    // the link of every input segment, for writing results back in input order
    segment_links: Vec<LinkId>,
    no_path_policy: NoPathPolicy,
    parallel: bool,
}

impl RidershipAllocator {
    pub fn new(segments: &[SegmentRecord], route_segments: RouteSegmentIndex,
               metrics: RouteMetrics) -> RidershipAllocator {
        let network = NetworkGraph::from_records(segments);
        let all_links = LinkNodeIndex::whole_graph(&network);
        RidershipAllocator {
            network,
            all_links,
            route_segments,
            metrics,
            segment_links: segments.iter().map(|seg| seg.link_id).collect(),
            no_path_policy: NoPathPolicy::default(),
            parallel: false,
        }
    }

    pub fn from_cfg(cfg: &RidershipConfig) -> Result<RidershipAllocator, RidershipError> {
        let segments = SegmentRecord::all_from_csv(&cfg.streets_csv)?;
        let route_segments = RouteSegmentIndex::from_csv(&cfg.route_segments_csv)?;
        let metrics = RouteMetrics::from_csv(&cfg.ridership_csv)?;
        Ok(RidershipAllocator::new(&segments, route_segments, metrics)
           .with_no_path_policy(cfg.no_path_policy)
           .with_parallel(cfg.parallel))
    }

    pub fn with_no_path_policy(mut self, no_path_policy: NoPathPolicy) -> RidershipAllocator {
        self.no_path_policy = no_path_policy;
        self
    }

    /// Whether to compute routes concurrently.  Results are the same either way.
    pub fn with_parallel(mut self, parallel: bool) -> RidershipAllocator {
        self.parallel = parallel;
        self
    }

    pub fn get_network(&self) -> &NetworkGraph {
        &self.network
    }

    pub fn get_segment_links(&self) -> &[LinkId] {
        &self.segment_links
    }

    /// Apportions every route's ridership onto the network and sums the edge loads by link.
    /// Loads from an earlier run are discarded first.
    pub fn run(&mut self) -> RunReport {
        log::info!("allocating ridership for {} routes", self.route_segments.len());
        let routes: Vec<(RouteId, &HashSet<LinkId>)> = self.route_segments.routes().collect();

        // merge in route order so the sums come out the same however they were computed
        self.network.clear_loads();
        let mut report = RunReport::default();
        if self.parallel {
            let allocations: Vec<RouteAllocation> = routes.par_iter()
                .map(|(route, links)| self.allocate_route(*route, links))
                .collect();
            for allocation in &allocations {
                merge_allocation(&mut self.network, &mut report, allocation);
            }
        } else {
            for (route, links) in &routes {
                let allocation = self.allocate_route(*route, links);
                merge_allocation(&mut self.network, &mut report, &allocation);
            }
        }
        report.ledger = self.network.ledger();

        for route in self.metrics.routes() {
            if self.route_segments.get_links(route).is_none() {
                report.unmatched_routes.push(route);
            }
        }

        log::info!("ridership applied to {} links", report.ledger.len());
        if ! report.bad_data.is_empty() {
            log::warn!("bad data on {} route directions: {:?}", report.bad_data.len(),
                       report.bad_data);
        }
        if ! report.missing_link.is_empty() {
            log::warn!("missing links on {} route directions: {:?}", report.missing_link.len(),
                       report.missing_link);
        }
        if ! report.unmatched_routes.is_empty() {
            log::warn!("ridership for {} routes not in the route segments table was not applied: \
                        {:?}", report.unmatched_routes.len(), report.unmatched_routes);
        }
        return report;
    }

    fn allocate_route(&self, route: RouteId, route_links: &HashSet<LinkId>) -> RouteAllocation {
        log::debug!("route {}: {} corridor links", route, route_links.len());
        let subgraph = Subgraph::extract(&self.network, route_links);
        let apportioner = Apportioner::new(&self.network, &self.all_links, self.no_path_policy);
        let mut loads = EdgeLoads::new();
        let mut flags = vec![];
        for direction in Direction::ALL.iter() {
            let stops = self.metrics.get_stops(*direction, route);
            let totals = self.metrics.get_totals(*direction, route);
            let dir_flags = apportioner.apportion_direction(route, *direction, &subgraph, &stops,
                                                            totals, &mut loads);
            flags.push((*direction, dir_flags));
        }
        log::debug!("route {}: load on {} edges", route, loads.len());
        RouteAllocation{route, loads, flags}
    }
}

fn merge_allocation(network: &mut NetworkGraph, report: &mut RunReport,
                    allocation: &RouteAllocation) {
    network.add_loads(&allocation.loads);
    for (direction, flags) in &allocation.flags {
        report.record(allocation.route, *direction, flags);
    }
}


/// Writes one `TLINK_ID,RIDERS` row per input segment.  Links with no ridership get zero.
pub fn write_ledger_csv(csvpath: &Path, segment_links: &[LinkId], ledger: &Ledger)
                        -> Result<(), RidershipError> {
    let file = File::create(csvpath)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(&["TLINK_ID", "RIDERS"])?;
    for link_id in segment_links {
        let riders = match ledger.get(link_id) {
            Some(riders) => *riders,
            None => 0.,
        };
        writer.write_record(&[link_id.to_string(), riders.to_string()])?;
    }
    writer.flush()?;
    log::info!("wrote ridership for {} segments to {:?}", segment_links.len(), csvpath);
    Ok(())
}
