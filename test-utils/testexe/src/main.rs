//! Test stand-in for the three supervised collaborators.
//!
//! Accepts the union of the cache, proxy, and download-client launch
//! contracts plus misbehavior knobs, so end-to-end tests can drive the
//! real supervisor command lines without the real servers:
//!
//! - server mode (no `-w`/`-r`): runs until terminated, for a fixed
//!   duration, or crashes after a delay with a chosen exit code;
//! - client mode (`-w` and `-r` given): emulates the download client by
//!   cycling through the request descriptor and copying each requested
//!   file from `--source-dir` into the output tree that mirrors the
//!   request paths, skipping paths with no source file (the not-found
//!   case).

use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(name = "testexe")]
#[command(about = "Stand-in for the stress harness collaborators", long_about = None)]
struct Args {
    /// Cache contract: locals descriptor path (accepted, unused)
    #[arg(short = 'c')]
    locals_file: Option<PathBuf>,

    /// All contracts: worker thread count (accepted, unused)
    #[arg(short = 't', default_value = "1")]
    threads: u32,

    /// Proxy contract: segment count (accepted, unused)
    #[arg(short = 'n')]
    segment_count: Option<u32>,

    /// Proxy and client contracts: port (accepted, unused)
    #[arg(short = 'p')]
    port: Option<u16>,

    /// Proxy contract: segment size (accepted, unused)
    #[arg(short = 'z')]
    segment_size: Option<u64>,

    /// Client contract: request descriptor path
    #[arg(short = 'w')]
    workload_file: Option<PathBuf>,

    /// Client contract: request count
    #[arg(short = 'r')]
    request_count: Option<u64>,

    /// Server mode: seconds to run before exiting (0 = until signalled)
    #[arg(long, default_value = "0")]
    run_duration: u64,

    /// Server mode: crash after this many milliseconds
    #[arg(long)]
    crash_after_ms: Option<u64>,

    /// Exit code to use when exiting on its own
    #[arg(long, default_value = "0")]
    exit_code: i32,

    /// Client mode: directory holding the source files to "download"
    #[arg(long)]
    source_dir: Option<PathBuf>,

    /// Client mode: per-request delay in milliseconds
    #[arg(long, default_value = "0")]
    request_delay_ms: u64,

    /// Write this process's pid to the given file at startup
    #[arg(long)]
    pid_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();
    debug!("testexe args: {:?}", args);

    if let Some(path) = &args.pid_file {
        if let Err(e) = fs::write(path, std::process::id().to_string()) {
            error!("cannot write pid file {}: {}", path.display(), e);
        }
    }

    let code = match (&args.workload_file, args.request_count) {
        (Some(workload), Some(requests)) => run_client(&args, workload, requests).await,
        _ => run_server(&args).await,
    };
    std::process::exit(code);
}

async fn run_server(args: &Args) -> i32 {
    if let Some(crash_ms) = args.crash_after_ms {
        info!(
            "server mode: crashing after {}ms with code {}",
            crash_ms, args.exit_code
        );
        sleep(Duration::from_millis(crash_ms)).await;
        return args.exit_code;
    }

    if args.run_duration > 0 {
        info!("server mode: running for {}s", args.run_duration);
        sleep(Duration::from_secs(args.run_duration)).await;
        return args.exit_code;
    }

    info!("server mode: running until signalled");
    match tokio::signal::ctrl_c().await {
        Ok(()) => 0,
        Err(e) => {
            error!("signal wait failed: {}", e);
            1
        }
    }
}

async fn run_client(args: &Args, workload: &Path, requests: u64) -> i32 {
    let entries = match fs::read_to_string(workload) {
        Ok(content) => content
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>(),
        Err(e) => {
            error!(
                "cannot read workload descriptor {}: {}",
                workload.display(),
                e
            );
            return 1;
        }
    };
    if entries.is_empty() {
        error!("workload descriptor {} is empty", workload.display());
        return 1;
    }

    info!(
        "client mode: issuing {} requests over {} paths",
        requests,
        entries.len()
    );
    let mut fetched = 0u64;
    for i in 0..requests {
        let request_path = &entries[(i % entries.len() as u64) as usize];
        if fetch(request_path, args.source_dir.as_deref()) {
            fetched += 1;
        }
        if args.request_delay_ms > 0 {
            sleep(Duration::from_millis(args.request_delay_ms)).await;
        }
    }

    info!("client mode: fetched {}/{} requests", fetched, requests);
    args.exit_code
}

/// Emulate one download: copy the source file with the requested
/// basename into the output tree mirroring the request path. Returns
/// false for paths with no source file, like a real not-found response.
fn fetch(request_path: &str, source_dir: Option<&Path>) -> bool {
    let source_dir = match source_dir {
        Some(dir) => dir,
        None => return false,
    };
    let relative = request_path.trim_start_matches('/');
    let basename = match Path::new(relative).file_name() {
        Some(name) => name,
        None => return false,
    };

    let source = source_dir.join(basename);
    if !source.is_file() {
        debug!("no source for {}", request_path);
        return false;
    }

    let output = PathBuf::from(relative);
    if let Some(parent) = output.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            error!("cannot create {}: {}", parent.display(), e);
            return false;
        }
    }
    match fs::copy(&source, &output) {
        Ok(_) => true,
        Err(e) => {
            error!("copy {} failed: {}", request_path, e);
            false
        }
    }
}
