//! dnslat - DNS resolver latency benchmark
//!
//! Binary entry point for the dnslat CLI application.

#![warn(clippy::all, warnings)]
#![warn(clippy::pedantic, clippy::nursery)]

use dnslat::cli::{Commands, OutputFormat, RunArgs};
use dnslat::config::{Catalog, ConfigLoader};
use dnslat::dns::report::{self, render_history, render_report};
use dnslat::dns::{ChannelSink, Orchestrator, RunEvent, RunReport, SystemLookup};
use dnslat::error::Result;
use dnslat::tui::App;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default log level for the given verbosity flags.
fn default_level(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Set up logging based on verbosity level.
///
/// Logs go to stderr so that report output on stdout stays clean.
///
/// # Arguments
///
/// * `verbose` - Enable debug-level logging
/// * `quiet` - Enable error-level only logging
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose, quiet)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().without_time().with_writer(std::io::stderr))
        .init();
}

/// Resolve the providers a run should test.
///
/// Named providers are looked up in the catalog; `--dns` entries are
/// appended. With neither, the whole catalog is used.
fn select_providers(catalog: &Catalog, args: &RunArgs) -> Result<Vec<dnslat::Provider>> {
    let extra = ConfigLoader::from_args(&args.dns_servers)?;

    let mut selected = if args.providers.is_empty() && !extra.is_empty() {
        Vec::new()
    } else {
        catalog.select(&args.providers)
    };

    if !args.providers.is_empty() && selected.len() < args.providers.len() {
        tracing::warn!(
            "Only {} of {} requested providers found in catalog",
            selected.len(),
            args.providers.len()
        );
    }

    selected.extend(extra);
    Ok(selected)
}

/// Cancel every in-flight probe when Ctrl-C is pressed.
fn spawn_interrupt_handler(orchestrator: Orchestrator, interrupted: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, cancelling outstanding lookups...");
            interrupted.cancel();
            orchestrator.cancel();
        }
    });
}

/// Run one measurement round, printing a progress line to stderr.
async fn run_round(
    orchestrator: &Orchestrator,
    providers: Vec<dnslat::Provider>,
    config: dnslat::RunConfig,
    show_progress: bool,
) -> Result<RunReport> {
    let (sink, mut rx) = ChannelSink::new();

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if !show_progress {
                continue;
            }
            match event {
                RunEvent::Progress { done, total } => {
                    eprint!("\rTesting [{:>4}/{}]", done, total);
                    let _ = std::io::stderr().flush();
                }
                RunEvent::Completed(_) => eprintln!(),
                RunEvent::Started { .. } | RunEvent::Status(_) => {}
            }
        }
    });

    let result = orchestrator.run_all(providers, config, Arc::new(sink)).await;

    // The sink is dropped with the run, which closes the channel.
    if let Err(e) = printer.await {
        tracing::warn!("Progress printer failed: {e}");
    }

    result
}

/// Run the latency benchmark and output results.
async fn run_latency_test(args: RunArgs, format: OutputFormat, quiet: bool) -> Result<()> {
    let config = args.to_config()?;
    let catalog = ConfigLoader::load(args.file.as_deref())?;
    let providers = select_providers(&catalog, &args)?;

    let orchestrator = Orchestrator::new(Arc::new(SystemLookup::new()), catalog.domains.clone());
    let interrupted = CancellationToken::new();
    spawn_interrupt_handler(orchestrator.clone(), interrupted.clone());

    let show_progress = !quiet && format == OutputFormat::Table;
    if show_progress {
        eprintln!(
            "Testing {} providers against {} domains ({} lookups, {} {}, timeout {:?})...",
            providers.len(),
            catalog.domains.len(),
            orchestrator.total_tests(providers.len(), &config),
            config.transport,
            config.family,
            config.timeout
        );
    }

    let mut last = None;
    for round in 1..=args.rounds {
        if interrupted.is_cancelled() {
            break;
        }
        if show_progress && args.rounds > 1 {
            eprintln!("Round {}/{}", round, args.rounds);
        }
        last = Some(run_round(&orchestrator, providers.clone(), config, show_progress).await?);
    }

    let Some(report) = last else {
        return Ok(());
    };

    match format {
        OutputFormat::Table => print_report_table(&report),
        OutputFormat::Json => print_report_json(&report)?,
        OutputFormat::Csv => report::write_csv(std::io::stdout().lock(), &report.results)?,
        OutputFormat::Tsv => print_report_tsv(&report),
    }

    if args.rounds > 1 && format == OutputFormat::Table {
        print!("{}", render_history(&orchestrator.history()));
    }

    if let Some(path) = args.csv {
        report::export_csv(&path, &report.results)?;
        if !quiet {
            eprintln!("Results exported to {}", path.display());
        }
    }

    Ok(())
}

/// Print the ranked report followed by summary statistics.
fn print_report_table(report: &RunReport) {
    print!("{}", render_report(report));

    let summary = report.summary();
    println!("\n=== Summary ===");
    println!("Providers tested: {}", summary.total);
    println!("Working: {} ({:.0}%)", summary.success, summary.success_rate());
    println!("Failed: {}", summary.failed);
    if let Some(avg) = summary.avg_latency {
        println!("Average latency: {:?}", avg);
    }
    if let Some(min) = summary.min_latency {
        println!("Best latency: {:?}", min);
    }
    if let Some(max) = summary.max_latency {
        println!("Worst latency: {:?}", max);
    }
}

/// Print the report in JSON format.
fn print_report_json(report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{json}");
    Ok(())
}

/// Print results in TSV format.
fn print_report_tsv(report: &RunReport) {
    println!("#\tProvider\tIP\tLatency(ms)\tSuccess\tTests Done\tTotal Tests");
    for (idx, r) in report.results.iter().enumerate() {
        let latency = r
            .latency
            .mean()
            .map(|d| format!("{:.3}", d.as_secs_f64() * 1000.0))
            .unwrap_or_default();
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            idx + 1,
            r.provider.name,
            r.address,
            latency,
            r.success(),
            r.success_count,
            r.total_probes
        );
    }
}

/// List providers with optional filtering.
///
/// # Arguments
///
/// * `file` - Optional catalog file
/// * `ipv6_only` - Show only providers with an IPv6 address
fn run_list(file: Option<PathBuf>, ipv6_only: bool, format: OutputFormat) -> Result<()> {
    let catalog = ConfigLoader::load(file.as_deref())?;

    let filtered: Vec<_> = catalog
        .providers
        .iter()
        .filter(|p| !ipv6_only || p.has_ipv6())
        .collect();

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&filtered)?);
        return Ok(());
    }

    println!("DNS providers ({} total):\n", filtered.len());
    println!("{:<4} {:<22} {:<16} {}", "#", "Name", "IPv4", "IPv6");
    println!("{}", "-".repeat(70));

    for (idx, p) in filtered.iter().enumerate() {
        let v6 = p.ipv6.map(|ip| ip.to_string()).unwrap_or_default();
        println!("{:<4} {:<22} {:<16} {}", idx + 1, p.name, p.ipv4, v6);
    }

    println!("\nDomains: {}", catalog.domains.join(", "));
    Ok(())
}

/// Run interactive TUI mode.
async fn run_interactive(file: Option<PathBuf>) -> Result<()> {
    let catalog = ConfigLoader::load(file.as_deref())?;
    let orchestrator = Orchestrator::new(Arc::new(SystemLookup::new()), catalog.domains.clone());

    let mut app = App::new(catalog, orchestrator);
    app.run().await
}

/// Main entry point for the dnslat CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    // Set up panic hook for better error reporting
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("dnslat crashed: {}", panic_info);
    }));

    let (cli, verbose) = dnslat::cli::parse_verbose();

    // Log lines would tear the TUI, so keep it to errors there
    let interactive = matches!(cli.command, None | Some(Commands::Interactive { .. }));
    setup_logging(verbose, cli.quiet || (interactive && !verbose));

    tracing::debug!("dnslat starting...");

    let result = match cli.command {
        Some(Commands::Interactive { file }) => run_interactive(file).await,

        Some(Commands::Run(args)) => run_latency_test(args, cli.format, cli.quiet).await,

        Some(Commands::List { file, ipv6_only }) => run_list(file, ipv6_only, cli.format),

        Some(Commands::Export { output }) => {
            let catalog = ConfigLoader::load_default()?;
            ConfigLoader::save(&catalog, &output)?;
            println!("Exported to: {}", output.display());
            Ok(())
        }

        // Default to interactive mode
        None => run_interactive(None).await,
    };

    if let Err(e) = &result {
        if e.is_user_error() {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(false, false), "info");
        assert_eq!(default_level(true, false), "debug");
        assert_eq!(default_level(false, true), "error");
    }
}
