// src/main.rs

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bigsid::config::Config;
use bigsid::core::bigsi::{Bigsi, BigsiBuilder};
use bigsid::core::bloom::BloomFilter;
use bigsid::core::errors::AntResult;
use bigsid::core::pipeline;
use bigsid::core::pipeline::seqio::SeqReader;
use bigsid::daemon;

const HELP: &str = "\
bigsid - streaming nucleotide-sequence identification daemon

USAGE:
    bigsid sketch [-k N] [-m N] [-e F] [-o DIR] [FILES...]
    bigsid set [-l FILE] [-w DIR]
    bigsid info [-p]
    bigsid shrink
    bigsid stop
    bigsid -h | --help

OPTIONS:
    -k N        k-mer size (default 21)
    -m N        BIGSI bit-vector capacity, overrides sizing by -e
    -e F        target false-positive rate (default 0.01)
    -o DIR      reference DB output directory (default ./db)
    -l FILE     log file path
    -w DIR      watch directory override
    -p          print PID only
";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "-h" || a == "--help") {
        print!("{HELP}");
        return ExitCode::SUCCESS;
    }

    init_logging();

    let result = match args.get(1).map(String::as_str) {
        Some("sketch") => run_sketch(&args[2..]),
        Some("set") => run_set(&args[2..]),
        Some("info") => run_info(&args[2..]),
        Some("shrink") => run_shrink(&args[2..]),
        Some("stop") => run_stop(&args[2..]),
        Some(other) => {
            eprintln!("unknown subcommand '{other}'\n\n{HELP}");
            return ExitCode::FAILURE;
        }
        None => {
            print!("{HELP}");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(component = "cli", error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn config_path() -> PathBuf {
    std::env::var("BIGSID_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("bigsid.json"))
}

/// Pulls a `-flag value` pair out of an args slice, consuming both
/// entries. No external arg-parsing crate, matching the teacher's
/// hand-matched `argv` style.
fn take_flag(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn run_sketch(args: &[String]) -> AntResult<()> {
    let k: u32 = take_flag(args, "-k")
        .and_then(|v| v.parse().ok())
        .unwrap_or(21);
    let m: Option<u64> = take_flag(args, "-m").and_then(|v| v.parse().ok());
    let p: f64 = take_flag(args, "-e")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0.01);
    let out_dir = take_flag(args, "-o")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("db"));

    const VALUED_FLAGS: &[&str] = &["-k", "-m", "-e", "-o"];
    let files: Vec<&String> = args
        .iter()
        .enumerate()
        .filter(|(i, a)| {
            !a.starts_with('-')
                && (*i == 0 || !VALUED_FLAGS.contains(&args[i - 1].as_str()))
        })
        .map(|(_, a)| a)
        .collect();

    if files.is_empty() {
        return Err(bigsid::AntError::ConfigInvalid(
            "sketch requires at least one reference file".into(),
        ));
    }

    let mut estimated_count = 0u64;
    for file in &files {
        let reader = SeqReader::open(Path::new(file.as_str()))?;
        estimated_count += reader.count() as u64;
    }
    let estimated_count = estimated_count.max(1000);

    let sizing = BloomFilter::with_false_positive_rate(estimated_count, p)?;
    let m = m.unwrap_or_else(|| sizing.capacity());
    let num_hashes = sizing.num_hashes();

    let mut all_entries = Vec::new();
    for file in &files {
        let entries = pipeline::sketch_reference_file(Path::new(file.as_str()), m, k, num_hashes)?;
        all_entries.extend(entries);
    }

    let n = all_entries.len() as u64;
    let mut builder = BigsiBuilder::new(m, num_hashes, 1_000_000);
    builder.add(all_entries, n)?;
    let bigsi = builder.index(&out_dir)?;
    bigsi.flush()?;

    tracing::info!(component = "bigsi", references = n, db_dir = %out_dir.display(), "index built");
    Ok(())
}

fn run_set(args: &[String]) -> AntResult<()> {
    let path = config_path();
    let mut config = Config::from_file(&path)?;
    if let Some(log_file) = take_flag(args, "-l") {
        config.log_file = Some(PathBuf::from(log_file));
    }
    if let Some(watch_dir) = take_flag(args, "-w") {
        config.watch_dir = PathBuf::from(watch_dir);
    }
    config.validate()?;
    daemon::run(&path, config)
}

fn run_info(args: &[String]) -> AntResult<()> {
    let path = config_path();
    let config = Config::from_file(&path)?;
    let pid_only = args.iter().any(|a| a == "-p");

    if pid_only {
        match config.pid {
            Some(pid) => println!("{pid}"),
            None => println!("not running"),
        }
        return Ok(());
    }

    match (config.running, config.pid) {
        (true, Some(pid)) => println!("bigsid is running (pid {pid})"),
        _ => println!("bigsid is not running"),
    }
    Ok(())
}

fn run_shrink(_args: &[String]) -> AntResult<()> {
    let path = config_path();
    let config = Config::from_file(&path)?;
    let bigsi = Bigsi::load(&config.db_dir)?;
    tracing::info!(
        component = "bigsi",
        m = bigsi.m(),
        k = bigsi.k(),
        num_colours = bigsi.num_colours(),
        "validated existing index"
    );
    for colour in 0..bigsi.num_colours() {
        bigsi.lookup(colour)?;
    }
    println!(
        "index at {} is valid: {} references, M={}, K={}",
        config.db_dir.display(),
        bigsi.num_colours(),
        bigsi.m(),
        bigsi.k()
    );
    Ok(())
}

fn run_stop(_args: &[String]) -> AntResult<()> {
    let path = config_path();
    let mut config = Config::from_file(&path)?;
    let Some(pid) = config.pid.filter(|_| config.running) else {
        return Err(bigsid::AntError::ConfigInvalid(
            "bigsid is not running".into(),
        ));
    };

    let status = std::process::Command::new("kill")
        .arg("-TERM")
        .arg(pid.to_string())
        .status()
        .map_err(|e| bigsid::AntError::AccessDenied(format!("failed to signal pid {pid}: {e}")))?;
    if !status.success() {
        return Err(bigsid::AntError::AccessDenied(format!(
            "kill -TERM {pid} exited with {status}"
        )));
    }

    config.clear_pid(&path)?;
    println!("sent SIGTERM to pid {pid}");
    Ok(())
}
