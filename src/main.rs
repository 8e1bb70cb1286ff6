mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, SelectArgs};
use ffinput::{Block, Config, SessionBuilder, Slot, Source, WholeStream};
use fi_av::ToolRegistry;
use fi_core::SubtitleDialect;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "ffinput=trace,fi_sync=trace,fi_av=debug,fi_core=debug".to_string()
        } else {
            "ffinput=info,fi_sync=info,fi_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load_or_default(cli.config.as_deref());

    match cli.command {
        Commands::Probe { inputs, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_sources(config, &inputs, json))
        }
        Commands::Read {
            inputs,
            select,
            step_ms,
            limit,
        } => {
            if let Some(step_ms) = step_ms {
                config.reader.step_ms = step_ms;
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(read_sources(config, &inputs, &select, limit))
        }
        Commands::Dump {
            input,
            output,
            select,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(dump_source(config, &input, &output, &select))
        }
        Commands::CheckTools => check_tools(&config),
        Commands::Validate { config: path } => validate_config(path.as_deref()),
    }
}

async fn probe_sources(config: Config, inputs: &[String], json: bool) -> Result<()> {
    let builder = SessionBuilder::new(config);
    let mut probed = Vec::with_capacity(inputs.len());

    for input in inputs {
        let streams = builder
            .probe(Source::parse(input))
            .await
            .with_context(|| format!("failed to probe {input}"))?;

        if json {
            probed.push(serde_json::json!({ "source": input, "streams": streams }));
            continue;
        }

        println!("Source: {}", Source::parse(input));
        println!("Streams: {}", streams.len());
        for stream in &streams {
            print!(
                "  [{}] {} {}",
                stream.index,
                stream.kind,
                stream.codec_name.as_deref().unwrap_or("?")
            );
            if let (Some(rate), Some(channels)) = (stream.sample_rate, stream.channels) {
                print!(" {rate} Hz {channels}ch");
            }
            if let Some(duration) = stream.duration() {
                print!(" {:.3}s", duration.as_secs_f64());
            }
            println!();
        }
        println!();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&probed)?);
    }

    Ok(())
}

async fn read_sources(
    config: Config,
    inputs: &[String],
    select: &SelectArgs,
    limit: Option<u64>,
) -> Result<()> {
    for input in inputs {
        let mut session = SessionBuilder::new(config.clone())
            .open(Source::parse(input), |s| select.matches(s))
            .await
            .with_context(|| format!("failed to open {input}"))?;

        let plan = session.plan();
        println!(
            "# {} streams={:?} rate={}",
            session.source(),
            plan.streams().iter().map(|s| s.descriptor.index).collect::<Vec<_>>(),
            plan.unified_rate().map_or_else(|| "-".to_string(), |r| r.to_string()),
        );

        let mut step = 0u64;
        while let Some(block) = session
            .next_block()
            .await
            .with_context(|| format!("failed to read {input}"))?
        {
            println!("{}", describe_block(step, &block));
            step += 1;
            if limit.is_some_and(|limit| step >= limit) {
                break;
            }
        }
        session.close().await;
    }

    Ok(())
}

fn describe_block(step: u64, block: &Block) -> String {
    let position = block
        .position()
        .map_or_else(|| "-".to_string(), |p| format!("{:.3}s", p.as_secs_f64()));
    let slots: Vec<String> = block
        .slots()
        .iter()
        .map(|slot| match slot {
            Some(Slot::Audio(audio)) => format!("audio {}x{}", audio.frames(), audio.channels()),
            Some(Slot::Cue(cue)) => format!("cue {:?}", cue.label()),
            None => "-".to_string(),
        })
        .collect();
    format!("{step:>6} {position:>10} | {}", slots.join(" | "))
}

async fn dump_source(config: Config, input: &str, output: &Path, select: &SelectArgs) -> Result<()> {
    let session = SessionBuilder::new(config)
        .open(Source::parse(input), |s| select.matches(s))
        .await
        .with_context(|| format!("failed to open {input}"))?;
    let plan = session.plan().clone();
    let whole = session
        .read_all()
        .await
        .with_context(|| format!("failed to read {input}"))?;

    tokio::fs::create_dir_all(output)
        .await
        .with_context(|| format!("failed to create {}", output.display()))?;

    for (planned, stream) in plan.streams().iter().zip(whole.streams()) {
        match stream {
            WholeStream::Audio { index, samples } => {
                let path = output.join(format!("stream{index}.f32le"));
                let bytes: Vec<u8> = samples.samples().iter().flat_map(|s| s.to_le_bytes()).collect();
                tokio::fs::write(&path, bytes).await?;
                println!(
                    "stream {index}: {} frames x {} channels -> {}",
                    samples.frames(),
                    samples.channels(),
                    path.display()
                );
            }
            WholeStream::Subtitle {
                index,
                cues,
                timeline,
            } => {
                let dialect = planned.descriptor.subtitle_dialect();
                let extension = match dialect {
                    SubtitleDialect::WebVtt => "vtt",
                    SubtitleDialect::SubRip => "srt",
                };
                let path = output.join(format!("stream{index}.{extension}"));
                let text = fi_sync::cue::render(dialect, cues.iter().map(Arc::as_ref));
                tokio::fs::write(&path, text).await?;
                print!("stream {index}: {} cues", cues.len());
                if let Some(timeline) = timeline {
                    print!(" over {} spans", timeline.spans().count());
                }
                println!(" -> {}", path.display());
            }
        }
    }

    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools).check_all();
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
        println!("Some tools are missing. Sessions need both ffmpeg and ffprobe.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = Config::load(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Step: {} ms", config.reader.step_ms);
    println!("  Subtitle wait: {} ms", config.reader.subtitle_wait_ms);
    println!("  Cue policy: {:?}", config.reader.cue_policy);
    println!("  Probe block: {} bytes", config.probe.block_size);
    for warning in config.validate() {
        println!("  ⚠ {warning}");
    }

    Ok(())
}
