//! Cache Geometry Discovery via Pointer Chasing
//!
//! Measures associativity, capacity and line size of the data cache from walk latencies alone
//! and prints them as a single `associativity=.. cache_size=.. cache_line_size=..` line.
//! Progress and diagnostics go to stderr.

use cache_geometry_rs::{
    Config, Measurer, WORD_BYTES, Workspace, format_size, format_size_fixed_int, run,
};
use clap::Parser;
use log::{LevelFilter, error, info, warn};
use std::process;

// use faster/smaller `mimalloc` allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(
    name = "cache_geometry",
    version,
    about = "Discover data cache associativity, size and line size from access latency"
)]
struct Cli {
    /// Stream per-configuration measurements and search decisions to stderr
    #[arg(long)]
    verbose: bool,

    /// Pin the measuring thread to this CPU core
    #[arg(long)]
    core: Option<usize>,

    /// Extra arguments are accepted and ignored
    #[arg(hide = true, trailing_var_arg = true)]
    _ignored: Vec<String>,
}

/// Best-effort noise reduction, the measurement still runs if either step fails
fn tune_current_thread(core: Option<usize>) {
    if let Some(cpu_num) = core {
        let core_num = core_affinity::CoreId { id: cpu_num };
        if !core_affinity::set_for_current(core_num) {
            warn!(
                "Couldn't pin measurement to CPU core {cpu_num} (NOTE: this is expected on macOS)"
            );
        }
    }

    if thread_priority::set_current_thread_priority(thread_priority::ThreadPriority::Max).is_err() {
        warn!("Couldn't raise measurement thread to maximum priority");
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new().filter_level(level).init();

    tune_current_thread(cli.core);

    let config = Config::default();
    let workspace = match Workspace::new(&config) {
        Ok(workspace) => workspace,
        Err(e) => {
            error!("Cannot set up measurement buffers: {e}");
            process::exit(1);
        }
    };

    info!(
        "Probe buffer {}, clutter buffer {}",
        format_size(config.max_check_words * WORD_BYTES),
        format_size(config.clutter_words * WORD_BYTES)
    );

    let mut measurer = Measurer::new(workspace, config.trials);
    match run(&mut measurer, &config) {
        Ok(geometry) => {
            info!(
                "{} cache, {}-way, {} lines",
                format_size_fixed_int(geometry.cache_size).trim_start(),
                geometry.associativity,
                format_size_fixed_int(geometry.cache_line_size).trim_start()
            );
            println!("{geometry}");
        }
        Err(e) => {
            error!("Measurement failed: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_flag_with_trailing_arguments() {
        let cli = Cli::try_parse_from(["cache_geometry", "--verbose", "extra", "args"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.core, None);
    }

    #[test]
    fn non_flag_first_argument_keeps_diagnostics_off() {
        let cli = Cli::try_parse_from(["cache_geometry", "quiet"]).unwrap();
        assert!(!cli.verbose);
    }

    #[test]
    fn core_is_parsed() {
        let cli = Cli::try_parse_from(["cache_geometry", "--core", "3"]).unwrap();
        assert_eq!(cli.core, Some(3));
    }
}
