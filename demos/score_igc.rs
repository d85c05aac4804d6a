use std::{env::args_os, io};

use parascoring::{
    config::ScoringConfig, engine::EngineKind, scorer::score_files, waypoint::Waypoints,
};

fn main() {
    tracing_subscriber::fmt().with_writer(io::stderr).init();
    let mut args = args_os().skip(1);
    let config = args.next().expect("missing argument: path to scoring config .json");
    let wpts = args.next().expect("missing argument: path to .wpt");
    let igcs = args.collect::<Vec<_>>();

    let config = ScoringConfig::read(config).expect("unsuccessful config parse");
    let wpts = Waypoints::read(wpts).expect("unsuccessful .wpt parse");
    let engine = EngineKind::default().build(&wpts, config);
    let report = score_files(engine, &igcs).expect("unsuccessful scoring");

    println!("{}", serde_json::to_string(&report).unwrap());
}
