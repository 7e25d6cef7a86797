use clap::Parser;

use perf_timer::{
    cli::{self, ClockArgs},
    measure_clock,
    report::{self, ClockReport},
};

fn main() -> anyhow::Result<()> {
    cli::init_logging();
    let args = ClockArgs::parse();

    let elapsed = measure_clock(args.clock, || {
        cli::spin(args.common.spin);
    })?;
    tracing::debug!(clock = %args.clock, secs = elapsed.secs(), nanos = elapsed.subsec_nanos());

    let report = ClockReport::new(args.clock, elapsed);
    println!("{}", report::render(&report, args.common.json)?);
    Ok(())
}
