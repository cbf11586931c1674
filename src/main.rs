mod cli;
mod logging;
mod settings;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, LimitArgs};
use logging::LogSink;
use settings::{Settings, SETTINGS_FILE};
use tokio_util::sync::CancellationToken;
use vs_av::{check_tools, ToolLocator, Tools};
use vs_core::config::Config;
use vs_core::{format_duration, format_size, progress_channel, SplitPhase};
use vs_pipeline::executor::PreparedSplit;
use vs_pipeline::{SplitContext, SplitExecutor, SplitRequest};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let runtime_dir = settings::runtime_dir();

    let log_file = cli
        .log_file
        .clone()
        .unwrap_or_else(|| logging::default_log_file(&runtime_dir));
    let sinks = [LogSink::Stderr, LogSink::File(log_file)];
    if let Err(e) = logging::init(&sinks, cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let result = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(dispatch(cli, &runtime_dir)),
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<vs_core::Error>() {
            Some(err) if err.is_cancelled() => {
                println!("Cancelled.");
                ExitCode::from(err.exit_code() as u8)
            }
            Some(err) => {
                eprintln!("Error: {e:#}");
                ExitCode::from(err.exit_code() as u8)
            }
            None => {
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}

async fn dispatch(cli: Cli, runtime_dir: &Path) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Split {
            input,
            output,
            limits,
            overwrite,
            dry_run,
        } => {
            let args = SplitArgs {
                input,
                output,
                limits,
                overwrite,
                dry_run,
            };
            split(args, config_path, runtime_dir).await
        }
        Commands::Plan { input, limits } => plan(&input, &limits, config_path, runtime_dir).await,
        Commands::Probe { file, json } => probe_file(&file, json, config_path).await,
        Commands::CheckTools => check_tools_cmd(config_path),
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("videosplitter {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

struct SplitArgs {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    limits: LimitArgs,
    overwrite: bool,
    dry_run: bool,
}

fn load_config(path: Option<&Path>) -> Config {
    let config = Config::load_or_default(path);
    for warning in config.validate() {
        tracing::warn!("Config: {warning}");
    }
    config
}

fn locate_tools(config: &Config) -> Result<Tools> {
    let tools = ToolLocator::new()
        .with_overrides(&config.tools)
        .locate()?
        .with_limits(&config.tools);
    tracing::debug!(
        "Using ffmpeg at {:?}, ffprobe at {:?}",
        tools.ffmpeg.path,
        tools.ffprobe.path
    );
    Ok(tools)
}

/// Merge command-line values over saved settings. Overwrite comes from the
/// command line only.
fn build_request(
    input: PathBuf,
    output: Option<PathBuf>,
    limits: &LimitArgs,
    overwrite: bool,
    settings: &Settings,
) -> SplitRequest {
    let mut request = SplitRequest::new(input, output.unwrap_or_else(|| settings.output_dir.clone()))
        .with_limits(
            limits.max_size_gb.unwrap_or(settings.max_size_gb),
            limits.max_minutes.unwrap_or(settings.max_duration_minutes),
        )
        .with_overwrite(overwrite);
    if let Some(name) = &limits.name {
        request = request.with_base_name(name.clone());
    }
    request
}

fn print_plan(request: &SplitRequest, prepared: &PreparedSplit) {
    let probe = &prepared.probe;
    let plan = &prepared.plan;

    println!("File: {}", request.input.display());
    println!(
        "Source: {} / {} / {:.0} kb/s",
        format_duration(probe.duration_secs),
        format_size(probe.file_size_bytes),
        probe.bit_rate_bps / 1000.0
    );
    println!(
        "Limits: {} / {} min",
        format_size(plan.maximum_size_bytes),
        request.max_minutes
    );
    println!(
        "Plan: {} part(s) of ~{}",
        plan.part_count,
        format_duration(plan.segment_length_secs)
    );
    println!("Output: {}", request.output_dir.display());
    for path in prepared.output_paths(&request.output_dir) {
        println!("  {}", path.display());
    }
}

async fn split(args: SplitArgs, config_path: Option<&Path>, runtime_dir: &Path) -> Result<()> {
    let config = load_config(config_path);
    let settings_path = runtime_dir.join(SETTINGS_FILE);
    let settings = Settings::load_or_create(&settings_path, runtime_dir);

    let input = args
        .input
        .or_else(|| settings.input_path.clone())
        .context("no input file given and none saved from a previous run")?;
    let request = build_request(input, args.output, &args.limits, args.overwrite, &settings);

    let tools = locate_tools(&config)?;
    let executor = SplitExecutor::new(tools, &config);

    let prepared = executor.plan(&request, &SplitContext::new()).await?;
    print_plan(&request, &prepared);
    if args.dry_run {
        println!("\n[DRY RUN] Would create {} part(s)", prepared.plan.part_count);
        return Ok(());
    }

    let saved = Settings {
        input_path: Some(request.input.clone()),
        output_dir: request.output_dir.clone(),
        max_size_gb: request.max_gigabytes,
        max_duration_minutes: request.max_minutes,
    };
    if let Err(e) = saved.save(&settings_path) {
        tracing::warn!("Failed to save settings {}: {e:#}", settings_path.display());
    }

    let token = CancellationToken::new();
    let (tx, mut rx) = progress_channel();
    let ctx = SplitContext::new()
        .with_cancellation(token.clone())
        .with_progress(tx);

    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received; cancelling");
            interrupt.cancel();
        }
    });

    println!();
    let task = tokio::spawn(async move { executor.execute(&request, &ctx).await });

    while let Some(progress) = rx.recv().await {
        let message = progress.message.as_deref().unwrap_or("");
        match progress.phase {
            SplitPhase::Preparing => println!("{message}"),
            phase => println!("[{:>5.1}%] {phase}: {message}", progress.percentage()),
        }
    }

    let parts = task.await.context("split task panicked")??;
    println!("\nCreated {} part(s):", parts.len());
    for part in &parts {
        let size = std::fs::metadata(part).map(|m| m.len() as f64).unwrap_or(0.0);
        println!("  {} ({})", part.display(), format_size(size));
    }
    Ok(())
}

async fn plan(
    input: &Path,
    limits: &LimitArgs,
    config_path: Option<&Path>,
    runtime_dir: &Path,
) -> Result<()> {
    let config = load_config(config_path);
    let settings = Settings::load_or_create(&runtime_dir.join(SETTINGS_FILE), runtime_dir);
    let request = build_request(input.to_path_buf(), None, limits, false, &settings);

    let tools = locate_tools(&config)?;
    let prepared = SplitExecutor::new(tools, &config)
        .plan(&request, &SplitContext::new())
        .await?;
    print_plan(&request, &prepared);
    Ok(())
}

async fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let tools = locate_tools(&config)?;
    let probe = tools.prober().probe(file, &CancellationToken::new()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&probe)?);
    } else {
        println!("File: {}", file.display());
        println!("Duration: {}", format_duration(probe.duration_secs));
        println!(
            "Size: {} ({} bytes)",
            format_size(probe.file_size_bytes),
            probe.file_size_bytes
        );
        println!("Bit rate: {:.0} kb/s", probe.bit_rate_bps / 1000.0);
    }
    Ok(())
}

fn check_tools_cmd(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = load_config(config_path);
    let locator = ToolLocator::new().with_overrides(&config.tools);
    let tools = check_tools(&locator);
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Searched:");
        for dir in locator.search_dirs() {
            println!("  {}", dir.display());
        }
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read config file: {:?}", p))?;
            let config = Config::from_json(&contents)?;
            let warnings = config.validate();
            println!("✓ Configuration is valid");
            println!(
                "  Encoder: {} ({}), audio {} @ {} b/s",
                config.encode.video_codec,
                config.encode.preset,
                config.encode.audio_codec,
                config.encode.audio_bitrate_bps
            );
            println!("  Process timeout: {}s", config.tools.process_timeout_secs);
            for warning in &warnings {
                println!("  ! {warning}");
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!(
                "  Encoder: {} ({})",
                config.encode.video_codec, config.encode.preset
            );
        }
    }

    Ok(())
}
