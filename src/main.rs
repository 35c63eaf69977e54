mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use colored::Colorize;
use dirsync::config::Config;
use dirsync::error::format_bytes;
use dirsync::log::{FileLog, LogSink, MemoryLog};
use dirsync::sync::strategy::Comparison;
use dirsync::{server, SyncContext, SyncEngine, SyncMode, SyncReport, SyncSession};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // Parse CLI arguments
    let mut cli = Cli::parse();

    // Load config file
    let config = Config::load()?;

    // Handle profile-only flags (print and exit)
    if cli.list_profiles {
        let profiles = config.list_profiles();
        if profiles.is_empty() {
            println!("No profiles configured");
            println!("\nCreate profiles in: {}", Config::config_path()?.display());
        } else {
            println!("Available profiles:");
            for name in profiles {
                println!("  {}", name);
            }
        }
        return Ok(());
    }

    if let Some(ref profile_name) = cli.show_profile {
        match config.show_profile(profile_name) {
            Some(output) => {
                println!("{}", output);
                return Ok(());
            }
            None => {
                anyhow::bail!("Profile '{}' not found", profile_name);
            }
        }
    }

    // Merge profile with CLI args if --profile is set (CLI args take precedence)
    if let Some(ref profile_name) = cli.profile {
        let profile = config
            .get_profile(profile_name)
            .ok_or_else(|| anyhow::anyhow!("Profile '{}' not found", profile_name))?;

        if cli.source.is_none() {
            cli.source = profile.source.as_ref().map(PathBuf::from);
        }
        if cli.destination.is_none() {
            cli.destination = profile.destination.as_ref().map(PathBuf::from);
        }
        if !cli.bidirectional {
            cli.bidirectional = profile.bidirectional.unwrap_or(false);
        }
        if !cli.checksum {
            cli.checksum = profile.checksum.unwrap_or(false);
        }
        if !cli.quiet {
            cli.quiet = profile.quiet.unwrap_or(false);
        }
        if let Some(verbose) = profile.verbose {
            if cli.verbose == 0 {
                cli.verbose = verbose;
            }
        }
        if cli.log_file.is_none() {
            cli.log_file = profile.log_file.as_ref().map(PathBuf::from);
        }
    }

    // Setup logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().as_str()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    // Validate arguments
    cli.validate()?;

    if cli.serve {
        return serve(&cli, config);
    }

    // After validation, source and destination must be present
    let (Some(source), Some(destination)) = (cli.source.clone(), cli.destination.clone()) else {
        anyhow::bail!("Both SOURCE and DESTINATION are required");
    };
    let mode = cli.mode();

    if !cli.quiet && !cli.json {
        println!("dirsync v{}", env!("CARGO_PKG_VERSION"));
        println!("Syncing {} → {} ({})", source.display(), destination.display(), mode);
        if cli.checksum {
            println!("Comparison: checksum");
        }
        println!();
    }

    let log: Arc<dyn LogSink> = match &cli.log_file {
        Some(path) => Arc::new(FileLog::new(path)),
        None => Arc::new(MemoryLog::new()),
    };
    let engine = SyncEngine::new(Arc::new(SyncContext::new(log)))
        .with_comparison(cli.comparison())
        .with_progress(!cli.quiet && !cli.json)
        .with_json(cli.json);

    let report = engine.run(&SyncSession::new(source, destination, mode))?;

    if !cli.quiet && !cli.json {
        print_summary(&report);
    }

    Ok(())
}

fn serve(cli: &Cli, config: Config) -> Result<()> {
    let mut settings = config.server;
    if let Some(ref bind) = cli.bind {
        settings.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }
    if let Some(ref web_root) = cli.web_root {
        settings.web_root = Some(web_root.display().to_string());
    }
    if cli.checksum {
        settings.checksum = true;
    }

    let log_path = cli
        .log_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.log_file));
    let comparison = if settings.checksum {
        Comparison::Checksum
    } else {
        Comparison::Metadata
    };
    let engine = SyncEngine::new(Arc::new(SyncContext::new(Arc::new(FileLog::new(log_path)))))
        .with_comparison(comparison);

    if !cli.quiet {
        println!("dirsync v{}", env!("CARGO_PKG_VERSION"));
        println!("Control server on http://{}:{}", settings.bind, settings.port);
    }

    actix_web::rt::System::new().block_on(server::start_server(settings, engine))?;
    Ok(())
}

fn print_summary(report: &SyncReport) {
    println!("{}\n", "✓ Sync complete".green().bold());

    let stats = &report.stats;
    println!("  Source files:      {}", stats.source_files.to_string().blue());
    println!("  Destination files: {}", stats.destination_files.to_string().blue());

    match report.mode {
        SyncMode::OneWay => {
            println!("  Files copied:      {}", stats.files_copied.to_string().green());
            println!("  Files deleted:     {}", stats.files_deleted.to_string().red());
        }
        SyncMode::TwoWay => {
            println!("  Files created:     {}", stats.files_created.to_string().green());
            println!("  Files updated:     {}", stats.files_updated.to_string().yellow());
        }
    }
    println!("  Files unchanged:   {}", stats.files_skipped.to_string().bright_black());

    println!();
    println!("  Bytes transferred: {}", format_bytes(stats.bytes_transferred).cyan());
    println!("  Duration:          {}", format_duration(stats.duration).cyan());

    if !report.conflicts.is_empty() {
        println!();
        println!(
            "  {} {}",
            "Conflicts:".yellow().bold(),
            report.conflicts.len().to_string().yellow()
        );
        for conflict in &report.conflicts {
            println!("    {}", conflict.path);
        }
        println!(
            "\n  {}",
            "Both sides were left unchanged; resolve these by hand.".bright_black()
        );
    }
}

fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs >= 60 {
        let mins = secs / 60;
        let secs = secs % 60;
        if mins >= 60 {
            let hours = mins / 60;
            let mins = mins % 60;
            format!("{}h {}m {}s", hours, mins, secs)
        } else {
            format!("{}m {}s", mins, secs)
        }
    } else if secs > 0 {
        format!("{}.{:03}s", secs, millis)
    } else {
        format!("{}ms", millis)
    }
}
