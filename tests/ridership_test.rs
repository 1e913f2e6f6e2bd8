use std::collections::HashMap;
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};
use approx::assert_relative_eq;
use glob::glob;
use tempfile::tempdir;

use transit_ridership::run_from_cfg;
use transit_ridership::Direction;
use transit_ridership::Ledger;
use transit_ridership::RidershipAllocator;
use transit_ridership::RidershipConfig;
use transit_ridership::RidershipError;


fn read_ledger_csv(path: &Path) -> Ledger {
    let file = File::open(path).unwrap();
    let mut reader = csv::Reader::from_reader(file);
    let mut ledger = HashMap::new();
    for result in reader.deserialize() {
        let row: HashMap<String, String> = result.unwrap();
        let link_id: i64 = row.get("TLINK_ID").unwrap().parse().unwrap();
        let riders: f64 = row.get("RIDERS").unwrap().parse().unwrap();
        ledger.insert(link_id, riders);
    }
    ledger
}

fn assert_ledgers_match(ledger: &Ledger, expected: &Ledger, env_dir: &Path) {
    assert_eq!(ledger.len(), expected.len(), "{:?}: wrong number of links", env_dir);
    for (link_id, true_riders) in expected {
        match ledger.get(link_id) {
            Some(riders) => assert_relative_eq!(*riders, *true_riders, epsilon = 1e-9),
            None => panic!("{:?}: link {} missing!", env_dir, link_id),
        }
    }
}

fn env_path(env: &str, file: &str) -> PathBuf {
    let mut path = PathBuf::from("tests/envs");
    path.push(env);
    path.push(file);
    path
}

// writes a config in `dir` naming the inputs of a test environment by absolute path
fn write_config(dir: &Path, env: &str, extra: &str) -> PathBuf {
    let abs = |file: &str| fs::canonicalize(env_path(env, file)).unwrap();
    let contents = format!("streets_csv: {}\nroute_segments_csv: {}\nridership_csv: {}\n{}",
                           abs("streets.csv").display(), abs("routes.csv").display(),
                           abs("ridership.csv").display(), extra);
    let cfg_path = dir.join("config.yaml");
    fs::write(&cfg_path, contents).unwrap();
    cfg_path
}


/// Every environment's ledger matches its expected.csv.
#[test]
fn test_envs_match_expected() {
    let mut num_envs = 0;
    for path in glob("tests/envs/*/config.yaml").expect("Failed to read glob pattern") {
        let cfg_path = path.unwrap();
        let env_dir = cfg_path.parent().unwrap().to_path_buf();
        println!("Testing {:?}", env_dir);

        let report = run_from_cfg(&cfg_path).unwrap();
        let expected = read_ledger_csv(&env_dir.join("expected.csv"));
        assert_ledgers_match(&report.ledger, &expected, &env_dir);
        num_envs += 1;
    }
    assert!(num_envs >= 2);
}

#[test]
fn test_corridor_report() {
    let report = run_from_cfg(&env_path("corridor", "config.yaml")).unwrap();
    // route 2's inbound stop has no link
    assert_eq!(report.missing_link, vec![(2, Direction::Inbound)]);
    assert!(report.bad_data.is_empty());
    assert!(report.zero_totals.is_empty());
}

#[test]
fn test_fallback_report() {
    let report = run_from_cfg(&env_path("fallback", "config.yaml")).unwrap();
    assert_eq!(report.bad_data, vec![(7, Direction::Outbound)]);
    assert!(report.missing_link.is_empty());
}

#[test]
fn test_parallel_and_policy_configs() {
    let dir = tempdir().unwrap();
    let serial = run_from_cfg(&env_path("corridor", "config.yaml")).unwrap();

    let cfg_path = write_config(dir.path(), "corridor", "parallel: true\n");
    let parallel = run_from_cfg(&cfg_path).unwrap();
    assert_eq!(serial, parallel);

    // every stop pair in this environment has a path, so the policy changes nothing
    let cfg_path = write_config(dir.path(), "corridor", "no_path_policy: skip_path\n");
    let skip = run_from_cfg(&cfg_path).unwrap();
    assert_eq!(serial, skip);
}

#[test]
fn test_output_written() {
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("riders.csv");
    let cfg_path = write_config(dir.path(), "corridor",
                                &format!("output_csv: {}\n", out_path.display()));
    run_from_cfg(&cfg_path).unwrap();

    let written = read_ledger_csv(&out_path);
    let mut expected = read_ledger_csv(&env_path("corridor", "expected.csv"));
    // the segment with no end node is written back with no riders
    expected.insert(99, 0.);
    assert_ledgers_match(&written, &expected, dir.path());
}

#[test]
fn test_allocator_from_cfg() {
    let cfg = RidershipConfig::from_path(&env_path("fallback", "config.yaml")).unwrap();
    let mut allocator = RidershipAllocator::from_cfg(&cfg).unwrap();
    assert_eq!(allocator.get_network().get_num_edges(), 8);
    assert_eq!(allocator.get_segment_links(), &[30, 31, 32, 33]);
    let first = allocator.run();
    let second = allocator.run();
    assert_eq!(first, second);
}

#[test]
fn test_malformed_ridership_aborts() {
    let dir = tempdir().unwrap();
    let ridership = "ROUTE,DIRECTION,STOP_ID,STOP_SEQ,STOP_NAME,TRIPS,AVG_ONS,AVG_OFFS,TLINK_ID
7,inbound,100,1,Alder St,10,4,0,33
7,inbound,101,2,Birch St,10,lots,4,32
";
    let ridership_path = dir.path().join("ridership.csv");
    fs::write(&ridership_path, ridership).unwrap();
    let abs = |file: &str| fs::canonicalize(env_path("fallback", file)).unwrap();
    let contents = format!("streets_csv: {}\nroute_segments_csv: {}\nridership_csv: {}\n",
                           abs("streets.csv").display(), abs("routes.csv").display(),
                           ridership_path.display());
    let cfg_path = dir.path().join("config.yaml");
    fs::write(&cfg_path, contents).unwrap();

    match run_from_cfg(&cfg_path) {
        Err(RidershipError::MalformedRecord{line, ..}) => assert_eq!(line, 3),
        other => panic!("expected a malformed record, got {:?}", other),
    }
}

#[test]
fn test_unreadable_streets_aborts() {
    let dir = tempdir().unwrap();
    let cfg_path = write_config(dir.path(), "corridor", "");
    let contents = fs::read_to_string(&cfg_path).unwrap();
    let streets = fs::canonicalize(env_path("corridor", "streets.csv")).unwrap();
    let contents = contents.replace(&streets.display().to_string(),
                                    &dir.path().join("nope.csv").display().to_string());
    fs::write(&cfg_path, contents).unwrap();

    let result = run_from_cfg(&cfg_path);
    assert!(matches!(result, Err(RidershipError::GraphConstruction{..})));
}
