use std::path::Path;
use std::process;

use transit_ridership::run_from_cfg;


fn main () {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: {} <config.yaml>", args[0]);
        process::exit(2);
    }

    match run_from_cfg(Path::new(&args[1])) {
        Ok(report) => {
            println!("ridership applied to {} links", report.ledger.len());
            for (route, direction) in &report.bad_data {
                println!("bad data: route {} {}", route, direction);
            }
            for (route, direction) in &report.missing_link {
                println!("missing link: route {} {}", route, direction);
            }
            for (route, direction) in &report.zero_totals {
                println!("no boardings or no alightings: route {} {}", route, direction);
            }
            for route in &report.unmatched_routes {
                println!("not in route segments table: route {}", route);
            }
        }
        Err(err) => {
            log::error!("{}", err);
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    }
}
