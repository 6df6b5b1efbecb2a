use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Hoard workspace automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Benchmark the resource cache with and without logging compiled in
    Bench {
        /// Run quickly (lower sample size/time)
        #[arg(long, default_value_t = false)]
        quick: bool,

        /// Generate report only (skip running benchmarks)
        #[arg(long, default_value_t = false)]
        report_only: bool,
    },
}

/// A named build configuration: criterion baseline name plus the cargo feature flags.
struct Profile {
    baseline: &'static str,
    features: &'static [&'static str],
}

const PROFILES: &[Profile] = &[
    Profile {
        baseline: "quiet",
        features: &["--no-default-features"],
    },
    Profile {
        baseline: "tracing",
        features: &["--no-default-features", "--features", "tracing"],
    },
];

const REFERENCE: &str = "quiet";
const BENCH: &str = "resource_benchmark";

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bench { quick, report_only } => {
            if !report_only {
                run_benchmarks(quick)?;
            }
            generate_report()?;
        }
    }

    Ok(())
}

fn run_benchmarks(quick: bool) -> Result<()> {
    for profile in PROFILES {
        println!("\n>>> Benchmarking profile: {}", profile.baseline);
        let start = Instant::now();

        let mut cmd = Command::new("cargo");
        cmd.env("CARGO_INCREMENTAL", "0");
        cmd.args(["bench", "-p", "hoard", "--bench", BENCH]);
        cmd.args(profile.features);

        // Args for the test runner (Criterion) go after --
        cmd.arg("--");
        cmd.arg("--save-baseline").arg(profile.baseline);

        if quick {
            cmd.arg("--measurement-time").arg("0.1");
            cmd.arg("--noplot");
            cmd.arg("--sample-size").arg("10");
        }

        let status = cmd
            .status()
            .with_context(|| format!("failed to run bench for profile {}", profile.baseline))?;

        if status.success() {
            println!("Finished {} in {:.2?}", profile.baseline, start.elapsed());
        } else {
            eprintln!("Warning: benchmark failed for profile {}", profile.baseline);
        }
    }

    Ok(())
}

fn generate_report() -> Result<()> {
    println!("\n>>> Generating Report...");
    let criterion_dir = Path::new("target/criterion");
    if !criterion_dir.exists() {
        eprintln!("No criterion output found at {}", criterion_dir.display());
        return Ok(());
    }

    // workload -> baseline -> ops/s
    let mut results: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    collect_results(criterion_dir, &mut results)?;

    let report_path = Path::new("benchmark_results/report.md");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(report_path)
        .with_context(|| format!("failed to create {}", report_path.display()))?;

    writeln!(file, "# Resource Cache Benchmark Report")?;
    writeln!(file)?;

    write!(file, "| Workload |")?;
    for profile in PROFILES {
        write!(file, " {} (Ops/s) | vs {} |", profile.baseline, REFERENCE)?;
    }
    writeln!(file)?;

    write!(file, "|---|")?;
    for _ in PROFILES {
        write!(file, "---|---|")?;
    }
    writeln!(file)?;

    for (workload, by_baseline) in &results {
        write!(file, "| {workload} |")?;
        let reference = by_baseline.get(REFERENCE).copied().unwrap_or(0.0);

        for profile in PROFILES {
            match by_baseline.get(profile.baseline) {
                Some(&ops) => {
                    let rel = if reference > 0.0 { ops / reference } else { 0.0 };
                    write!(file, " {} | **{rel:.2}x** |", format_ops(ops))?;
                }
                None => write!(file, " N/A | - |")?,
            }
        }
        writeln!(file)?;
    }

    println!("Report written to {}", report_path.display());
    Ok(())
}

fn format_ops(ops: f64) -> String {
    if ops > 1_000_000.0 {
        format!("{:.2}M", ops / 1_000_000.0)
    } else if ops > 1_000.0 {
        format!("{:.2}K", ops / 1_000.0)
    } else {
        format!("{ops:.0}")
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().and_then(|s| s.to_str()).map(str::to_owned)
}

/// Walks criterion's output tree. Layout: `<group>/<workload>/<baseline>/estimates.json`.
fn collect_results(dir: &Path, results: &mut BTreeMap<String, BTreeMap<String, f64>>) -> Result<()> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Ok(());
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_results(&path, results)?;
            continue;
        }
        if file_name(&path).as_deref() != Some("estimates.json") {
            continue;
        }

        let Some(baseline_dir) = path.parent() else { continue };
        let Some(workload_dir) = baseline_dir.parent() else { continue };
        let (Some(baseline), Some(workload)) = (file_name(baseline_dir), file_name(workload_dir)) else {
            continue;
        };
        if baseline == "report" || workload == "report" || !PROFILES.iter().any(|p| p.baseline == baseline) {
            continue;
        }

        let mut elements = None;
        if let Ok(content) = fs::read_to_string(workload_dir.join("benchmark.json")) {
            let json: serde_json::Value = serde_json::from_str(&content)?;
            elements = json
                .get("throughput")
                .and_then(|t| t.get("Elements"))
                .and_then(serde_json::Value::as_f64);
        }

        let content = fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let json: serde_json::Value =
            serde_json::from_str(&content).with_context(|| format!("malformed {}", path.display()))?;
        let time_ns = json
            .get("mean")
            .and_then(|m| m.get("point_estimate"))
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(0.0);
        if time_ns <= 0.0 {
            continue;
        }

        let metric = elements.unwrap_or(1.0) * 1e9 / time_ns;
        results.entry(workload).or_default().insert(baseline, metric);
    }

    Ok(())
}
