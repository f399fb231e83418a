use std::{fs, path::PathBuf, process};

use anyhow::{anyhow, Context};

use csim::{Config, Simulator, Summary, Trace};

const HELP: &str = "\
Usage: csim [-hv] -s <num> -E <num> -b <num> -t <file>
       csim [-hv] (--config <json> | -p <path>) -t <file>

Options:
  -h            Print this help message.
  -v            Print one line per trace record.
  -s <num>      Number of set index bits (2^s sets).
  -E <num>      Associativity (lines per set).
  -b <num>      Number of block bits (2^b byte blocks).
  -t <file>     Valgrind trace to replay (.xz traces are decompressed).
  --config <j>  Cache geometry as JSON instead of -s/-E/-b.
  -p <path>     File holding the JSON geometry.
  --json <path> Also write the summary as JSON.

Examples:
  csim -s 4 -E 1 -b 4 -t traces/yi.trace
  csim -v -s 8 -E 2 -b 4 -t traces/yi.trace
";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = pico_args::Arguments::from_env();
    if args.contains("-h") {
        print!("{HELP}");
        process::exit(0);
    }
    let verbose = args.contains("-v");

    let config = read_config(&mut args)?;
    let trace_path: PathBuf = args
        .opt_value_from_str("-t")?
        .ok_or_else(|| anyhow!("must provide a trace with -t\n\n{HELP}"))?;
    let stats_path: Option<PathBuf> = args.opt_value_from_str("--json")?;

    let rest = args.finish();
    if !rest.is_empty() {
        return Err(anyhow!("unexpected arguments: {rest:?}\n\n{HELP}"));
    }

    let cache = config
        .to_cache()
        .with_context(|| format!("invalid cache geometry {config:?}"))?;
    log::info!(
        "simulating {} sets (s={}) x {} ways, {}-byte blocks (b={})",
        cache.n_sets(),
        cache.set_bits(),
        cache.n_ways(),
        cache.block_size(),
        cache.block_bits()
    );

    let trace = Trace::open(&trace_path)
        .with_context(|| format!("could not open trace {}", trace_path.display()))?;

    let mut sim = Simulator::new(cache);
    sim.run(trace, |access, outcome| {
        if verbose {
            println!("{access} {outcome}");
        }
    })
    .with_context(|| format!("while replaying {}", trace_path.display()))?;
    let counters = sim.finish();
    log::info!("replayed {} accesses", counters.total());

    println!("{counters}");

    if let Some(stats_path) = stats_path {
        let stats_file = fs::File::create(&stats_path)
            .with_context(|| format!("cannot open output file {}", stats_path.display()))?;
        serde_json::to_writer_pretty(stats_file, &Summary::new(config, counters))?;
    }
    Ok(())
}

fn read_config(args: &mut pico_args::Arguments) -> anyhow::Result<Config> {
    let config_str: Option<String> = match args.opt_value_from_str("--config")? {
        Some(config_str) => Some(config_str),
        None => match args.opt_value_from_str::<_, PathBuf>("-p")? {
            Some(config_path) => Some(fs::read_to_string(&config_path).with_context(|| {
                format!("could not read config file {}", config_path.display())
            })?),
            None => None,
        },
    };
    if let Some(config_str) = config_str {
        return serde_json::from_str(&config_str).context("malformed cache config");
    }

    let set_bits = args
        .opt_value_from_str("-s")?
        .ok_or_else(|| anyhow!("missing -s (or --config / -p)\n\n{HELP}"))?;
    let lines_per_set = args
        .opt_value_from_str("-E")?
        .ok_or_else(|| anyhow!("missing -E (or --config / -p)\n\n{HELP}"))?;
    let block_bits = args
        .opt_value_from_str("-b")?
        .ok_or_else(|| anyhow!("missing -b (or --config / -p)\n\n{HELP}"))?;
    Ok(Config {
        set_bits,
        lines_per_set,
        block_bits,
    })
}
