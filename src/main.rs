use chrono::Local;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pixelot::report::Summary;
use pixelot::{Analyzer, FileReport, PixelotConfig, SignalRegistry, Verdict};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

const SUPPORTED_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "webp", "gif", "bmp", "tiff", "tif"];

#[derive(Parser, Debug)]
#[command(name = "pixelot")]
#[command(author, version, about = "Estimate whether images came from a camera or an image generator")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Image file or directory to analyze
    path: Option<PathBuf>,

    /// Output report file (.csv, .json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for auto-generated reports
    #[arg(long, default_value = "pixelot-reports")]
    report_dir: PathBuf,

    /// Don't auto-generate CSV report
    #[arg(long)]
    no_report: bool,

    /// JSON configuration overriding signal weights and tables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of parallel workers (default: number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Wall-clock budget per image in milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Print the full JSON report to stdout
    #[arg(long)]
    json: bool,

    /// Show every signal
    #[arg(short, long)]
    verbose: bool,

    /// Only show summary
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the registered signals
    Signals {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as JSON
    Config,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    // Handle subcommands first
    if let Some(cmd) = args.command {
        match cmd {
            Command::Signals { json } => list_signals(&config, json),
            Command::Config => print_config(&config),
        }
        return;
    }

    let path = if let Some(p) = args.path.clone() {
        p
    } else {
        eprintln!("Usage: pixelot <PATH>");
        eprintln!("Run 'pixelot --help' for more options.");
        std::process::exit(1);
    };

    // Files are the unit of parallelism; one shared pool for everything
    if let Some(jobs) = args.jobs.or(config.jobs) {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .ok();
    }

    let analyzer = match build_analyzer(&config, args.deadline_ms) {
        Ok(analyzer) => analyzer,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let files = collect_files(&path);
    if files.is_empty() {
        eprintln!("No images found (supported: {})", SUPPORTED_EXTENSIONS.join(", "));
        std::process::exit(1);
    }

    let chatty = !args.quiet && !args.json;
    if chatty {
        eprintln!("\x1b[1mPixelot - Camera or Generator?\x1b[0m");
        eprintln!("{}", "─".repeat(70));
        eprintln!("Found {} image(s), {} signals each\n", files.len(), analyzer.registry().len());
    }

    // Set up progress bar
    let pb = if chatty && files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        Some(pb)
    } else {
        None
    };

    // Analyze files in parallel
    let reports: Vec<FileReport> = files
        .par_iter()
        .map(|path| {
            let report = analyzer.analyze_file(path);
            if let Some(ref error) = report.error {
                warn!(file = %report.file_path, %error, "skipping file");
            }
            if let Some(ref pb) = pb {
                pb.inc(1);
                pb.set_message(report.file_name.clone());
            }
            report
        })
        .collect();

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if args.json {
        let stdout = std::io::stdout();
        if let Err(e) = pixelot::report::json::write(&mut stdout.lock(), &reports) {
            eprintln!("Failed to write JSON: {}", e);
            std::process::exit(1);
        }
    } else if !args.quiet {
        for r in &reports {
            print_report(r, args.verbose);
        }
    }

    let summary = Summary::from_reports(&reports);
    if !args.json {
        print_summary(&summary);
    }

    // Determine report path
    let report_path = if let Some(ref output) = args.output {
        Some(output.clone())
    } else if !args.no_report && !args.json {
        std::fs::create_dir_all(&args.report_dir).ok();
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("pixelot_report_{}.csv", timestamp);
        Some(args.report_dir.join(filename))
    } else {
        None
    };

    if let Some(ref output_path) = report_path {
        if let Err(e) = pixelot::report::generate(output_path, &reports) {
            eprintln!("Failed to write report: {}", e);
            std::process::exit(1);
        }
        if chatty {
            eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", output_path.display());
        }
    }

    if chatty {
        eprintln!("\n\x1b[90mAnalysis complete.\x1b[0m");
    }

    std::process::exit(summary.exit_code());
}

/// stderr only, so stdout stays clean for `--json`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "pixelot=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> pixelot::PixelotResult<PixelotConfig> {
    match path {
        Some(path) => PixelotConfig::from_path(path),
        None => Ok(PixelotConfig::default()),
    }
}

fn build_analyzer(config: &PixelotConfig, deadline_ms: Option<u64>) -> pixelot::PixelotResult<Analyzer> {
    // Worker count already went to the global pool
    let config = PixelotConfig {
        jobs: None,
        ..config.clone()
    };
    let analyzer = Analyzer::new().with_config(&config)?;
    Ok(match deadline_ms {
        Some(ms) => analyzer.with_deadline(Duration::from_millis(ms)),
        None => analyzer,
    })
}

fn collect_files(path: &Path) -> Vec<PathBuf> {
    let supported: HashSet<&str> = SUPPORTED_EXTENSIONS.iter().copied().collect();

    if path.is_dir() {
        let mut files: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| supported.contains(ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    }
}

fn print_report(r: &FileReport, verbose: bool) {
    let reset = "\x1b[0m";
    let Some(ref result) = r.result else {
        println!(
            "\x1b[90m{:<12}{} {:>4}  {:>4}  {}  ({})",
            "[ERROR]",
            reset,
            "-",
            "-",
            r.file_name,
            r.error.as_deref().unwrap_or("unknown error")
        );
        return;
    };

    let color = match result.verdict {
        Verdict::Real => "\x1b[32m",      // Green
        Verdict::Uncertain => "\x1b[33m", // Yellow
        Verdict::Ai => "\x1b[31m",        // Red
    };
    println!(
        "{}{:<12}{} {:>3.0}%  {:>3.0}%  {}",
        color,
        format!("[{}]", result.verdict),
        reset,
        result.ai_score,
        result.confidence,
        r.file_name
    );

    if verbose {
        if let Some(ref source) = r.source {
            eprintln!(
                "    Source: {} {}x{}{}",
                source.format.as_deref().unwrap_or("?"),
                source.original_width,
                source.original_height,
                if source.downsampled { " (downsampled)" } else { "" }
            );
        }
        for s in &result.signals {
            eprintln!(
                "    {:<32} {:>5.1}  w={:<4.2} {}",
                s.id, s.score, s.weight, s.description
            );
        }
        for f in &result.faults {
            eprintln!("    \x1b[90m{:<32} fault: {}\x1b[0m", f.id, f.fault);
        }
    }
}

fn print_summary(summary: &Summary) {
    eprintln!("\n{}", "─".repeat(70));
    eprintln!("\x1b[1mSummary:\x1b[0m");
    eprintln!("  \x1b[32m✓ Real:\x1b[0m       {}", summary.real);
    eprintln!("  \x1b[33m? Uncertain:\x1b[0m  {}", summary.uncertain);
    eprintln!("  \x1b[31m✗ AI:\x1b[0m         {}", summary.ai);
    if summary.error > 0 {
        eprintln!("  \x1b[90mErrors:\x1b[0m       {}", summary.error);
    }
}

fn list_signals(config: &PixelotConfig, json: bool) {
    let registry = match SignalRegistry::from_config(config) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if json {
        match serde_json::to_string_pretty(&registry.list()) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Error serializing signals: {}", e),
        }
        return;
    }

    println!("{:<32} {:<12} {:>6} {:>5}", "ID", "CATEGORY", "WEIGHT", "MIN");
    println!("{}", "-".repeat(60));
    for info in registry.list() {
        println!(
            "{:<32} {:<12} {:>6.2} {:>5}",
            info.id, info.category, info.weight, info.min_size
        );
    }
}

fn print_config(config: &PixelotConfig) {
    let effective = match SignalRegistry::from_config(config) {
        Ok(registry) => {
            let mut signals = registry.effective_config().signals;
            // Keep disabled signals disabled when this output is fed back in
            for (id, signal) in &config.signals {
                if !signal.is_enabled() {
                    signals.insert(id.clone(), signal.clone());
                }
            }
            PixelotConfig {
                signals,
                ..config.clone()
            }
        }
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    match effective.to_json() {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
