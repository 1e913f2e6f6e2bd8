use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::path::Path;

use super::error::RidershipError;
use super::{LinkId, RouteId};

// column offsets in the ridership query export
const ROUTE_COL: usize = 0;
const DIRECTION_COL: usize = 1;
const SEQUENCE_COL: usize = 3;
const BOARDINGS_COL: usize = 6;
const ALIGHTINGS_COL: usize = 7;
const LINK_COL: usize = 8;

type Row = HashMap<String, String>;


#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, PartialOrd, Ord)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Inbound, Direction::Outbound];

    /// Case-insensitive.
    pub fn parse(text: &str) -> Option<Direction> {
        match text.trim().to_lowercase().as_str() {
            "inbound" => Some(Direction::Inbound),
            "outbound" => Some(Direction::Outbound),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, ff: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Inbound => write!(ff, "inbound"),
            Direction::Outbound => write!(ff, "outbound"),
        }
    }
}


/// The set of links making up each route's corridor.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RouteSegmentIndex {
    links_by_route: BTreeMap<RouteId, HashSet<LinkId>>,
}

impl RouteSegmentIndex {
    pub fn from_pairs<II>(pairs: II) -> RouteSegmentIndex
        where II: IntoIterator<Item = (RouteId, LinkId)>
    {
        let mut links_by_route: BTreeMap<RouteId, HashSet<LinkId>> = BTreeMap::new();
        for (route, link_id) in pairs {
            links_by_route.entry(route).or_default().insert(link_id);
        }
        RouteSegmentIndex{links_by_route}
    }

    pub fn from_csv(csvpath: &Path) -> Result<RouteSegmentIndex, RidershipError> {
        let file = File::open(csvpath)?;
        let mut reader = csv::Reader::from_reader(file);
        let mut pairs = vec![];
        for (ii, result) in reader.deserialize().enumerate() {
            let row: Row = result?;
            let line = ii as u64 + 2;
            let parse = |name: &str| -> Result<i64, RidershipError> {
                match row.get(name).map(|ss| ss.trim().parse::<i64>()) {
                    Some(Ok(val)) => Ok(val),
                    Some(Err(_)) => Err(RidershipError::malformed(
                        line, format!("{} value {:?} is not an integer", name, row[name]))),
                    None => Err(RidershipError::malformed(line, format!("no {} column", name))),
                }
            };
            pairs.push((parse("ROUTE_NUM")?, parse("TLINK_ID")?));
        }
        let index = RouteSegmentIndex::from_pairs(pairs);
        log::info!("read corridors for {} routes from {:?}", index.len(), csvpath);
        Ok(index)
    }

    pub fn get_links(&self, route: RouteId) -> Option<&HashSet<LinkId>> {
        self.links_by_route.get(&route)
    }

    /// Routes in ascending id order.
    pub fn routes(&self) -> impl Iterator<Item = (RouteId, &HashSet<LinkId>)> {
        self.links_by_route.iter().map(|(route, links)| (*route, links))
    }

    pub fn len(&self) -> usize {
        self.links_by_route.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links_by_route.is_empty()
    }
}


/// One row of the ridership query.
#[derive(PartialEq, Debug, Clone)]
pub struct RidershipRecord {
    pub route: RouteId,
    pub direction: Direction,
    pub sequence: f64,
    pub link_id: Option<LinkId>,
    pub boardings: i64,
    pub alightings: i64,
}

impl RidershipRecord {
    pub fn new(route: RouteId, direction: Direction, sequence: f64, link_id: Option<LinkId>,
               boardings: i64, alightings: i64) -> RidershipRecord {
        return RidershipRecord{route, direction, sequence, link_id, boardings, alightings};
    }

    fn from_csv_record(record: &csv::StringRecord, line: u64)
                       -> Result<RidershipRecord, RidershipError> {
        let field = |col: usize, name: &str| get_field(record, col, name, line);
        let number = |col: usize, name: &str| -> Result<i64, RidershipError> {
            let value = get_field(record, col, name, line)?;
            value.parse::<i64>().map_err(|_| RidershipError::malformed(
                line, format!("{} value {:?} is not an integer", name, value)))
        };

        let route = number(ROUTE_COL, "route")?;
        let direction_str = field(DIRECTION_COL, "direction")?;
        let direction = match Direction::parse(direction_str) {
            Some(direction) => direction,
            None => return Err(RidershipError::malformed(
                line, format!("unknown direction {:?}", direction_str))),
        };
        let sequence_str = field(SEQUENCE_COL, "sequence")?;
        let sequence: f64 = match sequence_str.parse() {
            Ok(seq) if f64::is_finite(seq) => seq,
            _ => return Err(RidershipError::malformed(
                line, format!("sequence value {:?} is not a number", sequence_str))),
        };
        let boardings = number(BOARDINGS_COL, "boardings")?;
        let alightings = number(ALIGHTINGS_COL, "alightings")?;
        if boardings < 0 || alightings < 0 {
            return Err(RidershipError::malformed(line, "negative boardings or alightings"));
        }
        // stops that couldn't be matched to a link come through with junk in this column
        let link_id = field(LINK_COL, "link")?.parse::<LinkId>().ok();

        Ok(RidershipRecord{route, direction, sequence, link_id, boardings, alightings})
    }
}

fn get_field<'r>(record: &'r csv::StringRecord, col: usize, name: &str, line: u64)
                 -> Result<&'r str, RidershipError> {
    match record.get(col) {
        Some(value) => Ok(value.trim()),
        None => Err(RidershipError::malformed(line, format!("no {} field", name))),
    }
}

/// A stop's link and its boarding/alighting counts.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct StopData {
    pub link_id: Option<LinkId>,
    pub boardings: i64,
    pub alightings: i64,
}

#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct RouteDirectionTotals {
    pub boardings: i64,
    pub alightings: i64,
}

/// Orders stop sequence numbers.  They're always finite, and -0.0 is folded into 0.0 on
/// construction, so total ordering matches numeric ordering.
#[derive(Debug, Clone, Copy)]
struct SequenceKey(f64);

impl SequenceKey {
    fn new(sequence: f64) -> SequenceKey {
        if sequence == 0. {
            return SequenceKey(0.);
        }
        SequenceKey(sequence)
    }
}

impl Ord for SequenceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for SequenceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SequenceKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SequenceKey {}


/// Per-stop ridership for each route and direction, plus the totals used for weighting.
#[derive(Debug, Clone, Default)]
pub struct RouteMetrics {
    stops: HashMap<(Direction, RouteId), BTreeMap<SequenceKey, StopData>>,
    totals: HashMap<(Direction, RouteId), RouteDirectionTotals>,
}

impl RouteMetrics {
    pub fn from_records<II>(records: II) -> RouteMetrics
        where II: IntoIterator<Item = RidershipRecord>
    {
        let mut metrics = RouteMetrics::default();
        for record in records {
            let key = (record.direction, record.route);
            let stop = StopData {
                link_id: record.link_id,
                boardings: record.boardings,
                alightings: record.alightings,
            };
            // a repeated sequence number replaces the stop but still counts toward the totals
            metrics.stops.entry(key).or_default().insert(SequenceKey::new(record.sequence), stop);
            let totals = metrics.totals.entry(key).or_default();
            totals.boardings += record.boardings;
            totals.alightings += record.alightings;
        }
        return metrics;
    }

    /// Reads the ridership query export.  The header row is skipped and fields are taken from
    /// fixed column positions.  Any malformed row fails the whole read.
    pub fn from_csv(csvpath: &Path) -> Result<RouteMetrics, RidershipError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(csvpath)?;
        let mut records = vec![];
        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|pos| pos.line()).unwrap_or(0);
            records.push(RidershipRecord::from_csv_record(&record, line)?);
        }
        log::info!("read {} ridership records from {:?}", records.len(), csvpath);
        Ok(RouteMetrics::from_records(records))
    }

    /// The stops of one route and direction, in sequence order.
    pub fn get_stops(&self, direction: Direction, route: RouteId) -> Vec<StopData> {
        match self.stops.get(&(direction, route)) {
            Some(stops) => stops.values().cloned().collect(),
            None => vec![],
        }
    }

    /// Every route with ridership in either direction.
    pub fn routes(&self) -> BTreeSet<RouteId> {
        self.stops.keys().map(|(_, route)| *route).collect()
    }

    pub fn get_totals(&self, direction: Direction, route: RouteId) -> RouteDirectionTotals {
        match self.totals.get(&(direction, route)) {
            Some(totals) => *totals,
            None => RouteDirectionTotals::default(),
        }
    }
}
