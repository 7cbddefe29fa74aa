//! vmm-sim: virtual memory manager simulator
//!
//! `vmm-sim run` plays a generated or recorded trace through the simulated TLB, page tables and
//! frames and prints the resulting metrics. `vmm-sim generate` writes a synthetic trace file.

use std::path::PathBuf;
use std::process;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use vmm_sim::config::parse_size;
use vmm_sim::constants::*;
use vmm_sim::io::{Report, read_trace, write_csv, write_json, write_trace};
use vmm_sim::trace::{self, TraceParams};
use vmm_sim::{AccessTimes, Algorithm, Result, SimConfig, Step, TracePattern, VmManager, logger};

#[derive(Parser)]
#[command(name = "vmm-sim")]
#[command(about = "Virtual memory manager simulator: TLB, page tables and frame replacement")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// More output (-v info, -vv per-access debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Errors only
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a trace through the simulator and report metrics
    Run(RunArgs),

    /// Write a synthetic trace file
    Generate(GenerateArgs),
}

#[derive(Args)]
struct MachineArgs {
    /// Physical memory size (e.g. 64MB, 512K, 1G)
    #[arg(long, default_value = "64MB", value_parser = parse_size)]
    ram: u64,

    /// Page size in bytes (power of two)
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = parse_size)]
    page_size: u64,
}

#[derive(Args)]
struct TraceShapeArgs {
    /// Number of processes in a generated trace
    #[arg(long, default_value_t = NUM_PROCESSES, value_parser = clap::value_parser!(u32).range(1..))]
    processes: u32,

    /// Virtual pages per process in a generated trace
    #[arg(long, default_value_t = VIRTUAL_PAGES, value_parser = clap::value_parser!(u32).range(1..))]
    virtual_pages: u32,
}

impl TraceShapeArgs {
    fn params(&self) -> TraceParams {
        TraceParams { processes: self.processes, virtual_pages: self.virtual_pages, frame_count: 0 }
    }
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    machine: MachineArgs,

    /// Number of TLB entries
    #[arg(long, default_value_t = DEFAULT_TLB_CAPACITY)]
    tlb_size: usize,

    /// Replacement algorithm: FIFO, LRU or CLOCK
    #[arg(short, long, default_value = "CLOCK")]
    algorithm: Algorithm,

    /// Access pattern for a generated trace
    #[arg(short, long, default_value = "working_set")]
    pattern: TracePattern,

    /// Number of generated accesses [default: 10000]; with --trace, stop after this many
    #[arg(short = 'n', long)]
    accesses: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[command(flatten)]
    shape: TraceShapeArgs,

    /// Replay a trace file instead of generating one
    #[arg(short, long, conflicts_with_all = ["pattern", "seed", "processes", "virtual_pages"])]
    trace: Option<PathBuf>,

    /// Write the report as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write the report as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Name of this configuration in reports
    #[arg(long)]
    config_name: Option<String>,

    /// Print per-process counters
    #[arg(long)]
    per_process: bool,
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    machine: MachineArgs,

    /// Access pattern
    #[arg(short, long)]
    pattern: TracePattern,

    /// Number of accesses
    #[arg(short = 'n', long)]
    accesses: usize,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[command(flatten)]
    shape: TraceShapeArgs,

    /// Output trace file
    #[arg(short, long)]
    output: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init(logger::level_for(cli.verbose, cli.quiet)) {
        eprintln!("Failed to install logger: {}", e);
    }

    let result = match cli.command {
        Commands::Run(args) => cmd_run(&args, cli.quiet),
        Commands::Generate(args) => cmd_generate(&args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn cmd_run(args: &RunArgs, quiet: bool) -> Result<()> {
    let config = SimConfig::new(args.machine.ram, args.machine.page_size, args.tlb_size, args.algorithm);
    let mut vm = VmManager::new(config)?;

    match &args.trace {
        Some(path) => {
            let mut records = read_trace(path, vm.config().page_size)?;
            info!("Loaded {} accesses from {}", records.len(), path.display());
            if let Some(limit) = args.accesses {
                records.truncate(limit);
            }
            vm.load_trace(records);
        }
        None => {
            let mut rng = StdRng::seed_from_u64(args.seed);
            let count = args.accesses.unwrap_or(DEFAULT_ACCESSES);
            vm.generate_trace_with(args.pattern, count, args.shape.params(), &mut rng);
        }
    }

    if vm.trace().is_empty() {
        warn!("Trace is empty; nothing to simulate");
    }

    let started = Instant::now();
    while let Step::Advanced { record, result, step } = vm.step()? {
        debug!("#{} {}: {}", step, record, result);
    }
    let elapsed = started.elapsed();

    let snapshot = vm.metrics_snapshot();
    let name = args.config_name.clone().unwrap_or_else(|| {
        format!("{}-{}f-tlb{}", vm.config().algorithm, vm.frames().len(), vm.config().tlb_capacity)
    });
    let report = Report::new(&name, vm.config(), snapshot, &AccessTimes::default(), elapsed);

    if !quiet {
        println!("=== Virtual Memory Simulation: {} ===", name);
        println!("{}", vm.config());
        match &args.trace {
            Some(path) => println!("Trace:       {}", path.display()),
            None => println!("Trace:       {} (seed {})", args.pattern, args.seed),
        }
        println!();
        println!("{}", report);
        if args.per_process {
            println!();
            print!("{}", report.metrics.per_process_table());
        }
    }

    if let Some(path) = &args.json {
        write_json(path, &report)?;
        info!("JSON report written to {}", path.display());
    }
    if let Some(path) = &args.csv {
        write_csv(path, std::slice::from_ref(&report))?;
        info!("CSV report written to {}", path.display());
    }

    Ok(())
}

fn cmd_generate(args: &GenerateArgs) -> Result<()> {
    let config = SimConfig::new(args.machine.ram, args.machine.page_size, DEFAULT_TLB_CAPACITY, Algorithm::Clock);
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let params = TraceParams { frame_count: config.frame_count(), ..args.shape.params() };
    let records = trace::generate(args.pattern, args.accesses, &params, &mut rng);

    write_trace(&args.output, &records, config.page_size)?;
    info!("Trace written to {}", args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parse(argv: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("vmm-sim").chain(argv.iter().copied()))
    }

    fn run_args(argv: &[&str]) -> RunArgs {
        match parse(argv).unwrap().command {
            Commands::Run(args) => args,
            Commands::Generate(_) => panic!("expected run"),
        }
    }

    #[test]
    fn test_trace_shape_flags() {
        let args = run_args(&["run", "--processes", "8", "--virtual-pages", "64"]);
        assert_eq!(args.shape.params(), TraceParams { processes: 8, virtual_pages: 64, frame_count: 0 });

        let args = run_args(&["run"]);
        assert_eq!(args.shape.params(), TraceParams::default());
        assert_eq!(args.accesses, None);

        assert!(parse(&["run", "--processes", "0"]).is_err());
        assert!(parse(&["run", "--trace", "t.txt", "--processes", "2"]).is_err());
    }

    #[test]
    fn test_file_trace_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("t.trace");
        let json = dir.path().join("out.json");
        fs::write(&trace, "0 R 0x0\n0 W 0x1000\n1 R 0x2000\n1 R 0x3000\n").unwrap();

        let args = run_args(&[
            "run",
            "--ram", "64K",
            "--trace", trace.to_str().unwrap(),
            "-n", "3",
            "--json", json.to_str().unwrap(),
        ]);
        cmd_run(&args, true).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(value["metrics"]["total_accesses"], 3);
        assert_eq!(value["metrics"]["writes"], 1);
    }

    #[test]
    fn test_generate_writes_addresses() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("gen.trace");

        let cli = parse(&[
            "generate",
            "--pattern", "thrashing",
            "-n", "6",
            "--ram", "16K",
            "--page-size", "1024",
            "--processes", "1",
            "--output", out.to_str().unwrap(),
        ])
        .unwrap();
        let Commands::Generate(args) = cli.command else { panic!("expected generate") };
        cmd_generate(&args).unwrap();

        // 16 frames -> 24 pages cycled, one process, 1 KiB pages
        let text = fs::read_to_string(&out).unwrap();
        assert_eq!(text.lines().take(3).collect::<Vec<_>>(), vec!["0 R 0x0", "0 R 0x400", "0 R 0x800"]);
        assert_eq!(read_trace(&out, 1024).unwrap().len(), 6);
    }
}
