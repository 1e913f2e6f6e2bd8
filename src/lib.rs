// imports of other modules from this crate
mod error;
pub use error::RidershipError;

mod network;
pub use network::{EdgeLoads, FlowCode, Ledger, LinkEnds, LinkNodeIndex, NetworkGraph, Segment,
                  SegmentRecord};

mod route_data;
pub use route_data::{Direction, RidershipRecord, RouteDirectionTotals, RouteMetrics,
                     RouteSegmentIndex, StopData};

mod subgraph;
pub use subgraph::Subgraph;

mod shortest_path;
pub use shortest_path::{resolve_links, shortest_path, GraphView, WholeGraph};

mod apportion;
pub use apportion::{adjust_ridership, Apportioner, DirectionFlags, NoPathPolicy};

mod allocation;
pub use allocation::{write_ledger_csv, RidershipAllocator, RunReport};

mod config_utils;
pub use config_utils::RidershipConfig;

#[cfg(test)]
mod test_utils;


/// Intersection id from the streets table.
pub type NodeId = i64;
/// Street segment id.  Both directed edges of a two-way segment share one.
pub type LinkId = i64;
pub type RouteId = i64;


/// Reads the inputs named in a config file, applies the ridership, and writes the per-segment
/// totals if the config names an output.
pub fn run_from_cfg(config_path: &std::path::Path) -> Result<RunReport, RidershipError> {
    let cfg = RidershipConfig::from_path(config_path)?;
    let mut allocator = RidershipAllocator::from_cfg(&cfg)?;
    let report = allocator.run();
    if let Some(output_csv) = &cfg.output_csv {
        write_ledger_csv(output_csv, allocator.get_segment_links(), &report.ledger)?;
    }
    Ok(report)
}
