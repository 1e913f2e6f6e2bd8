// this file defines the street network the ridership is applied to.  It's a wrapper around a
// petgraph graph whose edges are the directed halves of the street segments.
use std::collections::HashMap;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use petgraph::graph::DiGraph;
use petgraph::graph::EdgeIndex;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use super::error::RidershipError;
use super::{LinkId, NodeId};

pub type GG = DiGraph<NodeId, Segment>;

/// Final ridership per link id.
pub type Ledger = HashMap<LinkId, f64>;

// A convenience type for parsing csv data
type Row = HashMap<String, String>;

const STREET_COLUMNS: [&str; 5] = ["FR_TPOINT", "TO_TPOINT", "TLINK_ID", "CAR_FLOW", "ROLL_LEN"];


#[derive(PartialEq, Debug, Clone, Copy)]
pub enum FlowCode {
    Bidirectional,
    Forward,
    Reverse,
}

impl FlowCode {
    /// 1 is forward-only and 2 is reverse-only.  Anything else, including a missing code, is
    /// two-way.
    pub fn from_code(code: Option<i64>) -> FlowCode {
        match code {
            Some(1) => FlowCode::Forward,
            Some(2) => FlowCode::Reverse,
            _ => FlowCode::Bidirectional,
        }
    }
}

/// One street segment as it comes out of the streets table.
#[derive(PartialEq, Debug, Clone)]
pub struct SegmentRecord {
    pub from_node: Option<NodeId>,
    pub to_node: Option<NodeId>,
    pub link_id: LinkId,
    pub flow: FlowCode,
    pub cost: f64,
}

impl SegmentRecord {
    pub fn new(from_node: NodeId, to_node: NodeId, link_id: LinkId, flow: FlowCode, cost: f64)
               -> SegmentRecord {
        return SegmentRecord {
            from_node: Some(from_node),
            to_node: Some(to_node),
            link_id,
            flow,
            cost,
        };
    }

    /// Reads the streets table.  A file that can't be opened, or that lacks one of the needed
    /// columns, is an error.  Rows that can't be parsed are skipped with a warning.
    pub fn all_from_csv(csvpath: &Path) -> Result<Vec<SegmentRecord>, RidershipError> {
        let construction_err = |reason: String| RidershipError::GraphConstruction {
            path: csvpath.to_path_buf(),
            reason,
        };
        let file = File::open(csvpath).map_err(|err| construction_err(err.to_string()))?;
        let mut reader = csv::Reader::from_reader(file);
        let headers = reader.headers().map_err(|err| construction_err(err.to_string()))?;
        for column in STREET_COLUMNS.iter() {
            if ! headers.iter().any(|header| header.trim() == *column) {
                return Err(construction_err(format!("no {} column", column)));
            }
        }

        let mut records = vec![];
        let mut num_bad_rows = 0;
        for (ii, result) in reader.deserialize().enumerate() {
            // header is line 1
            let line = ii + 2;
            let parsed = match result {
                Ok(row) => SegmentRecord::from_row(&row),
                Err(err) if err.is_io_error() => return Err(construction_err(err.to_string())),
                Err(err) => Err(err.to_string()),
            };
            match parsed {
                Ok(record) => records.push(record),
                Err(reason) => {
                    log::warn!("{:?} line {}: {}, skipping", csvpath, line, reason);
                    num_bad_rows += 1;
                }
            }
        }
        if num_bad_rows > 0 {
            log::warn!("skipped {} unparseable rows of {:?}", num_bad_rows, csvpath);
        }
        log::info!("read {} street segments from {:?}", records.len(), csvpath);
        Ok(records)
    }

    fn from_row(row: &Row) -> Result<SegmentRecord, String> {
        let get_field = |name: &str| -> Result<Option<i64>, String> {
            let value = match row.get(name) {
                Some(value) => value.trim(),
                None => return Err(format!("no {} field", name)),
            };
            if value.is_empty() {
                return Ok(None);
            }
            match value.parse::<i64>() {
                Ok(val) => Ok(Some(val)),
                Err(_) => Err(format!("{} value {:?} is not an integer", name, value)),
            }
        };

        let from_node = get_field("FR_TPOINT")?;
        let to_node = get_field("TO_TPOINT")?;
        let flow = FlowCode::from_code(get_field("CAR_FLOW")?);
        let link_id = match get_field("TLINK_ID")? {
            Some(link_id) => link_id,
            None => return Err(String::from("no TLINK_ID")),
        };
        let cost = match row.get("ROLL_LEN").map(|ss| ss.trim().parse::<f64>()) {
            Some(Ok(cost)) if cost >= 0. => cost,
            _ => return Err(String::from("ROLL_LEN must be a non-negative number")),
        };
        Ok(SegmentRecord{from_node, to_node, link_id, flow, cost})
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct Segment {
    pub link_id: LinkId,
    pub cost: f64,
    pub load: f64,
}

impl Segment {
    pub fn new(link_id: LinkId, cost: f64) -> Segment {
        return Segment{link_id, cost, load: 0.};
    }
}


/// Directed multigraph of the street network.  Topology is fixed once built; only the
/// per-edge `load` changes afterwards.
pub struct NetworkGraph {
    graph: GG,
    node_idxs_by_id: HashMap<NodeId, NodeIndex>,
}

impl NetworkGraph {
    pub fn from_records<'r, II>(records: II) -> NetworkGraph
        where II: IntoIterator<Item = &'r SegmentRecord>
    {
        let mut network = NetworkGraph {
            graph: DiGraph::new(),
            node_idxs_by_id: HashMap::new(),
        };
        let mut num_skipped = 0;
        for record in records {
            let (from_id, to_id) = match (record.from_node, record.to_node) {
                (Some(from_id), Some(to_id)) => (from_id, to_id),
                _ => {
                    num_skipped += 1;
                    continue;
                }
            };
            match record.flow {
                FlowCode::Reverse => network.add_edge(to_id, from_id, record.link_id, record.cost),
                FlowCode::Forward => network.add_edge(from_id, to_id, record.link_id, record.cost),
                FlowCode::Bidirectional => {
                    network.add_edge(from_id, to_id, record.link_id, record.cost);
                    network.add_edge(to_id, from_id, record.link_id, record.cost);
                }
            }
        }
        if num_skipped > 0 {
            log::info!("skipped {} segments with a missing endpoint", num_skipped);
        }
        log::info!("street graph has {} nodes and {} edges", network.get_num_nodes(),
                   network.get_num_edges());
        return network;
    }

    fn add_edge(&mut self, from_id: NodeId, to_id: NodeId, link_id: LinkId, cost: f64) {
        let from_idx = self.get_or_add_node(from_id);
        let to_idx = self.get_or_add_node(to_id);
        self.graph.add_edge(from_idx, to_idx, Segment::new(link_id, cost));
    }

    fn get_or_add_node(&mut self, node_id: NodeId) -> NodeIndex {
        if let Some(idx) = self.node_idxs_by_id.get(&node_id) {
            return *idx;
        }
        let idx = self.graph.add_node(node_id);
        self.node_idxs_by_id.insert(node_id, idx);
        return idx;
    }

    pub fn get_graph(&self) -> &GG {
        &self.graph
    }

    pub fn get_node_idx_by_id(&self, node_id: NodeId) -> Option<NodeIndex> {
        self.node_idxs_by_id.get(&node_id).copied()
    }

    pub fn get_node_id_by_idx(&self, idx: NodeIndex) -> Option<NodeId> {
        self.graph.node_weight(idx).copied()
    }

    pub fn get_segment(&self, edge: EdgeIndex) -> Option<&Segment> {
        self.graph.edge_weight(edge)
    }

    pub fn get_num_nodes(&self) -> usize {
        return self.graph.node_count();
    }

    pub fn get_num_edges(&self) -> usize {
        return self.graph.edge_count();
    }

    /// All parallel edges from `from_idx` to `to_idx`, in insertion order.
    pub fn edges_between(&self, from_idx: NodeIndex, to_idx: NodeIndex) -> Vec<EdgeIndex> {
        let mut edges: Vec<EdgeIndex> = self.graph.edges_connecting(from_idx, to_idx)
            .map(|er| er.id())
            .collect();
        edges.sort();
        return edges;
    }

    pub fn clear_loads(&mut self) {
        for segment in self.graph.edge_weights_mut() {
            segment.load = 0.;
        }
    }

    pub fn add_loads(&mut self, loads: &EdgeLoads) {
        for (edge, load) in loads.iter() {
            match self.graph.edge_weight_mut(edge) {
                Some(segment) => segment.load += load,
                None => log::warn!("load on edge {:?}, which is not in the graph", edge),
            }
        }
    }

    /// Sums the load on every edge by link id.
    pub fn ledger(&self) -> Ledger {
        let mut ledger = HashMap::new();
        for segment in self.graph.edge_weights() {
            *ledger.entry(segment.link_id).or_insert(0.) += segment.load;
        }
        return ledger;
    }
}


/// Load increments for the edges of one `NetworkGraph`, kept apart from the graph so they can
/// be computed independently and summed in later.  Only edges that received load are stored,
/// since a route touches little of the network.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct EdgeLoads {
    loads: HashMap<EdgeIndex, f64>,
}

impl EdgeLoads {
    pub fn new() -> EdgeLoads {
        return EdgeLoads::default();
    }

    pub fn add(&mut self, edge: EdgeIndex, value: f64) {
        *self.loads.entry(edge).or_insert(0.) += value;
    }

    pub fn get(&self, edge: EdgeIndex) -> f64 {
        match self.loads.get(&edge) {
            Some(val) => *val,
            None => 0.,
        }
    }

    /// The number of edges with load recorded.
    pub fn len(&self) -> usize {
        self.loads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EdgeIndex, f64)> + '_ {
        self.loads.iter().map(|(edge, load)| (*edge, *load))
    }
}


/// The endpoints of one edge carrying a link.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct LinkEnds {
    pub from: NodeIndex,
    pub to: NodeIndex,
    pub edge: EdgeIndex,
}

/// Maps link ids to the ends of an edge that carries them.  When a link is carried by more than
/// one edge (two-way segments), the last edge added wins.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct LinkNodeIndex {
    ends_by_link: HashMap<LinkId, LinkEnds>,
}

impl LinkNodeIndex {
    pub fn whole_graph(network: &NetworkGraph) -> LinkNodeIndex {
        return LinkNodeIndex::build(network, |_| true);
    }

    pub fn for_links(network: &NetworkGraph, links: &HashSet<LinkId>) -> LinkNodeIndex {
        return LinkNodeIndex::build(network, |link_id| links.contains(&link_id));
    }

    fn build<F>(network: &NetworkGraph, include: F) -> LinkNodeIndex
        where F: Fn(LinkId) -> bool
    {
        let mut ends_by_link = HashMap::new();
        for er in network.get_graph().edge_references() {
            let link_id = er.weight().link_id;
            if include(link_id) {
                ends_by_link.insert(link_id, LinkEnds {
                    from: er.source(),
                    to: er.target(),
                    edge: er.id(),
                });
            }
        }
        LinkNodeIndex{ends_by_link}
    }

    pub fn get(&self, link_id: Option<LinkId>) -> Option<&LinkEnds> {
        link_id.and_then(|link_id| self.ends_by_link.get(&link_id))
    }

    pub fn len(&self) -> usize {
        self.ends_by_link.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends_by_link.is_empty()
    }

    /// Every node touched by an indexed link.
    pub fn node_bunch(&self) -> HashSet<NodeIndex> {
        self.ends_by_link.values().flat_map(|ends| vec![ends.from, ends.to]).collect()
    }
}


#[cfg(test)]
mod tests {
    use std::io::Write;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    use super::*;

    fn edges_as_ids(network: &NetworkGraph) -> Vec<(NodeId, NodeId, LinkId, f64, f64)> {
        network.get_graph().edge_references().map(|er| {
            let from = network.get_node_id_by_idx(er.source()).unwrap();
            let to = network.get_node_id_by_idx(er.target()).unwrap();
            (from, to, er.weight().link_id, er.weight().cost, er.weight().load)
        }).collect()
    }

    #[test]
    fn test_bidirectional_segment() {
        let records = vec![SegmentRecord::new(1, 2, 100, FlowCode::Bidirectional, 3.5)];
        let network = NetworkGraph::from_records(&records);
        assert_eq!(network.get_num_nodes(), 2);
        assert_eq!(edges_as_ids(&network), vec![
            (1, 2, 100, 3.5, 0.),
            (2, 1, 100, 3.5, 0.),
        ]);
    }

    #[test]
    fn test_one_way_segments() {
        let records = vec![
            SegmentRecord::new(1, 2, 100, FlowCode::Forward, 1.),
            SegmentRecord::new(3, 4, 200, FlowCode::Reverse, 2.),
        ];
        let network = NetworkGraph::from_records(&records);
        assert_eq!(edges_as_ids(&network), vec![
            (1, 2, 100, 1., 0.),
            (4, 3, 200, 2., 0.),
        ]);
    }

    #[test]
    fn test_missing_endpoint_skipped() {
        let mut record = SegmentRecord::new(1, 2, 100, FlowCode::Forward, 1.);
        record.to_node = None;
        let records = vec![record, SegmentRecord::new(2, 3, 101, FlowCode::Forward, 1.)];
        let network = NetworkGraph::from_records(&records);
        assert_eq!(network.get_num_edges(), 1);
        assert_eq!(network.get_num_nodes(), 2);
        assert!(network.get_node_idx_by_id(1).is_none());
    }

    #[test]
    fn test_flow_codes() {
        assert_eq!(FlowCode::from_code(Some(0)), FlowCode::Bidirectional);
        assert_eq!(FlowCode::from_code(Some(1)), FlowCode::Forward);
        assert_eq!(FlowCode::from_code(Some(2)), FlowCode::Reverse);
        assert_eq!(FlowCode::from_code(Some(7)), FlowCode::Bidirectional);
        assert_eq!(FlowCode::from_code(None), FlowCode::Bidirectional);
    }

    #[test]
    fn test_parallel_edges_kept() {
        let records = vec![
            SegmentRecord::new(1, 2, 100, FlowCode::Forward, 1.),
            SegmentRecord::new(1, 2, 101, FlowCode::Forward, 5.),
        ];
        let network = NetworkGraph::from_records(&records);
        let aa = network.get_node_idx_by_id(1).unwrap();
        let bb = network.get_node_idx_by_id(2).unwrap();
        let edges = network.edges_between(aa, bb);
        assert_eq!(edges.len(), 2);
        assert_eq!(network.get_segment(edges[0]).unwrap().link_id, 100);
        assert_eq!(network.get_segment(edges[1]).unwrap().link_id, 101);
        assert!(network.edges_between(bb, aa).is_empty());
    }

    #[test]
    fn test_link_node_index_last_edge_wins() {
        let records = vec![
            SegmentRecord::new(1, 2, 100, FlowCode::Bidirectional, 1.),
            SegmentRecord::new(2, 3, 101, FlowCode::Forward, 1.),
        ];
        let network = NetworkGraph::from_records(&records);
        let index = LinkNodeIndex::whole_graph(&network);
        assert_eq!(index.len(), 2);

        let ends = index.get(Some(100)).unwrap();
        assert_eq!(network.get_node_id_by_idx(ends.from), Some(2));
        assert_eq!(network.get_node_id_by_idx(ends.to), Some(1));
        assert_eq!(ends.edge, EdgeIndex::new(1));

        assert!(index.get(Some(999)).is_none());
        assert!(index.get(None).is_none());

        let links: HashSet<LinkId> = [101].iter().cloned().collect();
        let route_index = LinkNodeIndex::for_links(&network, &links);
        assert_eq!(route_index.len(), 1);
        let bunch: HashSet<NodeId> = route_index.node_bunch().iter()
            .map(|ni| network.get_node_id_by_idx(*ni).unwrap())
            .collect();
        assert_eq!(bunch, [2, 3].iter().cloned().collect());
    }

    #[test]
    fn test_ledger_sums_both_directions() {
        let records = vec![
            SegmentRecord::new(1, 2, 100, FlowCode::Bidirectional, 1.),
            SegmentRecord::new(2, 3, 101, FlowCode::Forward, 1.),
        ];
        let mut network = NetworkGraph::from_records(&records);
        let mut loads = EdgeLoads::new();
        loads.add(EdgeIndex::new(0), 4.);
        loads.add(EdgeIndex::new(1), 2.5);
        loads.add(EdgeIndex::new(2), 1.);
        loads.add(EdgeIndex::new(1), 0.5);
        assert_eq!(loads.len(), 3);
        assert_relative_eq!(loads.get(EdgeIndex::new(1)), 3.);
        assert_relative_eq!(loads.get(EdgeIndex::new(7)), 0.);
        network.add_loads(&loads);
        network.add_loads(&loads);

        let ledger = network.ledger();
        assert_eq!(ledger.len(), 2);
        assert_relative_eq!(ledger[&100], 14.);
        assert_relative_eq!(ledger[&101], 2.);

        network.clear_loads();
        assert!(network.ledger().values().all(|load| *load == 0.));
    }

    #[test]
    fn test_segments_from_csv() -> Result<(), Box<dyn std::error::Error>> {
        let test_csv = "FR_TPOINT,TO_TPOINT,TLINK_ID,CAR_FLOW,ROLL_LEN,NAME
1,2,100,0,10.5,Main St
2,,101,1,3,Dead End
3,2,102,,7,Side St
";
        let dir = tempdir()?;
        let file_path = dir.path().join("streets.csv");
        {
            let mut file = File::create(&file_path)?;
            file.write_all(test_csv.as_bytes())?;
        }

        let records = SegmentRecord::all_from_csv(&file_path)?;
        let mut dead_end = SegmentRecord::new(2, 0, 101, FlowCode::Forward, 3.);
        dead_end.to_node = None;
        let true_records = vec![
            SegmentRecord::new(1, 2, 100, FlowCode::Bidirectional, 10.5),
            dead_end,
            SegmentRecord::new(3, 2, 102, FlowCode::Bidirectional, 7.),
        ];
        assert_eq!(records, true_records);
        Ok(())
    }

    #[test]
    fn test_unreadable_streets() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let missing = SegmentRecord::all_from_csv(&dir.path().join("nope.csv"));
        assert!(matches!(missing, Err(RidershipError::GraphConstruction{..})));

        let file_path = dir.path().join("streets.csv");
        {
            let mut file = File::create(&file_path)?;
            file.write_all(b"FR_TPOINT,TO_TPOINT,TLINK_ID,ROLL_LEN\n1,2,100,1\n")?;
        }
        let no_flow = SegmentRecord::all_from_csv(&file_path);
        assert!(matches!(no_flow, Err(RidershipError::GraphConstruction{..})));
        Ok(())
    }

    #[test]
    fn test_bad_street_rows_skipped() -> Result<(), Box<dyn std::error::Error>> {
        let test_csv = "FR_TPOINT,TO_TPOINT,TLINK_ID,CAR_FLOW,ROLL_LEN
1,2,abc,0,1
1,2,100,0,4
2,3,101,0,-2
2,3,102,x,1
3,4,,0,1
3,4,103,1,two
4,5,104,2,1
5,6,105,0
";
        let dir = tempdir()?;
        let file_path = dir.path().join("streets.csv");
        {
            let mut file = File::create(&file_path)?;
            file.write_all(test_csv.as_bytes())?;
        }
        let records = SegmentRecord::all_from_csv(&file_path)?;
        assert_eq!(records, vec![
            SegmentRecord::new(1, 2, 100, FlowCode::Bidirectional, 4.),
            SegmentRecord::new(4, 5, 104, FlowCode::Reverse, 1.),
        ]);
        Ok(())
    }
}
