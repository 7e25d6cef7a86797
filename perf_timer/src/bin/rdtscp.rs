use anyhow::Context;
use clap::Parser;

use perf_timer::{
    cli::{self, CycleArgs},
    report::{self, CycleReport},
    time,
};

fn main() -> anyhow::Result<()> {
    cli::init_logging();
    let args = CycleArgs::parse();

    // Resolve the rate up front so calibration never lands inside the timed region.
    let freq = args.frequency().context("resolving CPU frequency")?;

    let cycles = time(|| {
        cli::spin(args.common.spin);
    });

    let report = CycleReport::new(cycles, freq);
    println!("{}", report::render(&report, args.common.json)?);
    Ok(())
}
