use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use ipcstress_common::TestParameters;
use ipcstress_run::{ProgramPaths, RunConfig, RunOrchestrator};
use ipcstress_workload::{create_workload, verify_results};

/// Smallest proxy segment size exercised by the parameter sweep.
const MIN_SEG_SIZE: u64 = 824;

/// IPC stress harness: supervises a cache server, a proxy server, and
/// batched download clients, benchmarking throughput and CPU cost.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Working directory for workload files and process output
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    workdir: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Path to the cache server executable
    #[arg(long, default_value = "./simplecached")]
    cache_bin: PathBuf,

    /// Path to the proxy server executable
    #[arg(long, default_value = "./webproxy")]
    proxy_bin: PathBuf,

    /// Path to the download client executable
    #[arg(long, default_value = "./gfclient_download")]
    client_bin: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Single run with minimal parameters
    Base,
    /// Sweep a wide grid of thread, segment, and size parameters
    Parameter,
    /// High-thread-count runs with fixed large segments
    Stress,
    /// One long multi-batch run with fixed heavy parameters
    Soak,
}

/// Whether the enclosing sweep should keep going after one point.
enum SweepControl {
    Continue,
    Abort(i32),
}

struct Driver {
    workdir: PathBuf,
    programs: ProgramPaths,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    initialize_logging(args.debug);

    let driver = Driver {
        workdir: args.workdir,
        programs: ProgramPaths {
            cache: args.cache_bin,
            proxy: args.proxy_bin,
            client: args.client_bin,
        },
    };

    create_workload(&driver.workdir)?;

    let exit_code = match args.command {
        Command::Base => run_base(&driver).await?,
        Command::Parameter => run_parameter(&driver).await?,
        Command::Stress => run_stress(&driver).await?,
        Command::Soak => run_soak(&driver).await?,
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

fn initialize_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();
}

impl Driver {
    /// Run one parameter point and verify its output. Any server
    /// failure or verification mismatch aborts the enclosing sweep.
    async fn run_point(&self, params: TestParameters) -> Result<SweepControl> {
        info!("{}", params);

        let mut config = RunConfig::new(params, self.workdir.clone());
        config.programs = self.programs.clone();

        let report = RunOrchestrator::new(config).run().await?;
        if !report.outcome.is_success() {
            error!("Run aborted: {}", report.outcome);
            return Ok(SweepControl::Abort(report.exit_code()));
        }

        let verification = verify_results(&self.workdir)?;
        if !verification.success() {
            error!(
                "Verification failed: {} mismatched files",
                verification.mismatches.len()
            );
            return Ok(SweepControl::Abort(0));
        }

        Ok(SweepControl::Continue)
    }
}

async fn run_base(driver: &Driver) -> Result<i32> {
    let params = TestParameters {
        cache_thread_count: 1,
        proxy_thread_count: 1,
        proxy_segment_count: 1,
        proxy_segment_size: 1024,
        download_thread_count: 1,
        request_count: 110,
        port: 10826,
    };

    match driver.run_point(params).await? {
        SweepControl::Continue => Ok(0),
        SweepControl::Abort(code) => Ok(code),
    }
}

async fn run_parameter(driver: &Driver) -> Result<i32> {
    for cache_threads in (1..=100u32).step_by(10) {
        for proxy_threads in (cache_threads..=100).step_by(10) {
            for segment_count in (1..=100u32).step_by(10) {
                let mut segment_size = MIN_SEG_SIZE;
                while segment_size <= 1_048_576 {
                    let params = TestParameters {
                        cache_thread_count: cache_threads,
                        proxy_thread_count: proxy_threads,
                        proxy_segment_count: segment_count,
                        proxy_segment_size: segment_size,
                        download_thread_count: proxy_threads,
                        request_count: 11,
                        port: 10825,
                    };

                    if let SweepControl::Abort(code) = driver.run_point(params).await? {
                        return Ok(code);
                    }
                    segment_size *= 4;
                }
            }
        }
    }
    Ok(0)
}

async fn run_stress(driver: &Driver) -> Result<i32> {
    for cache_threads in (20..=100u32).step_by(10) {
        for proxy_threads in (cache_threads..=100).step_by(10) {
            let params = TestParameters {
                cache_thread_count: cache_threads,
                proxy_thread_count: proxy_threads,
                proxy_segment_count: 50,
                proxy_segment_size: 1_048_576,
                download_thread_count: proxy_threads,
                request_count: 110,
                port: 10824,
            };

            if let SweepControl::Abort(code) = driver.run_point(params).await? {
                return Ok(code);
            }
        }
    }
    Ok(0)
}

async fn run_soak(driver: &Driver) -> Result<i32> {
    let params = TestParameters {
        cache_thread_count: 100,
        proxy_thread_count: 100,
        proxy_segment_count: 50,
        proxy_segment_size: 1_048_576,
        download_thread_count: 100,
        request_count: 1_100_000,
        port: 10825,
    };

    match driver.run_point(params).await? {
        SweepControl::Continue => Ok(0),
        SweepControl::Abort(code) => Ok(code),
    }
}
