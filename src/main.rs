// RipScenarios: Distance-vector routing scenarios
// Copyright (C) 2023 Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use std::path::PathBuf;

use clap::Parser;
use ripsim::{formatter::NetworkFormatter, rip::SplitHorizon};

use rip_scenarios::{report::ping_line, ScenarioConfig, ScenarioKind};

/// Simulate RIP on the ring or on the chain topology, and ping from the source to the
/// destination.
#[derive(Debug, Parser)]
struct Cli {
    /// Topology to simulate. Overrides the kind of the configuration file.
    #[clap(long, short = 's')]
    scenario: Option<ScenarioKind>,
    /// Read the scenario configuration from a JSON file.
    #[clap(long, short = 'c')]
    config: Option<PathBuf>,
    /// Print every processed event, and set the log level to debug.
    #[clap(long, short = 'v')]
    verbose: bool,
    /// Print the recorded routing tables.
    #[clap(long, short = 'p')]
    print_routing_tables: bool,
    /// Print every reply, timeout and drop of the probe.
    #[clap(long)]
    show_pings: bool,
    /// Split horizon mode (NoSplitHorizon, SplitHorizon or PoisonReverse)
    #[clap(long)]
    split_horizon: Option<SplitHorizon>,
    /// Number of routers in the chain
    #[clap(long, short = 'n')]
    routers: Option<usize>,
    /// Seed for the random shortcut removal
    #[clap(long)]
    seed: Option<u64>,
    /// Write the report as JSON into this file.
    #[clap(long, short = 'o')]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    if args.verbose && std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "debug");
    }
    pretty_env_logger::init_timed();

    let mut config = match &args.config {
        Some(path) => ScenarioConfig::from_file(path)?,
        None => ScenarioConfig::default(),
    };
    if let Some(kind) = args.scenario {
        config.kind = kind;
    }
    if let Some(mode) = args.split_horizon {
        config.rip.split_horizon = mode;
    }
    if let Some(n) = args.routers {
        config.chain.routers = n;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let mut scenario = config.build()?;
    scenario.network.set_verbose(args.verbose);
    let report = scenario.run()?;
    let topo = scenario.network.topology();

    if args.show_pings {
        let size = config.probe.map(|p| p.size).unwrap_or_default();
        report
            .record
            .probes
            .iter()
            .filter_map(|r| ping_line(r, size, topo))
            .for_each(|l| println!("{l}"));
        println!();
    }

    if args.print_routing_tables {
        for snapshot in report.record.snapshots.iter() {
            println!("{}", snapshot.fmt(topo));
        }
    }

    print!("{}", report.summary());

    if let Some(path) = args.output {
        report.write_json(&path)?;
        log::info!("Report written to {}", path.display());
    }

    Ok(())
}
