use alarm_core::{CancellationToken, ExportRegistry, FaxParser};
use alarm_service::{exports, load_config, save_config, AppConfig, ServiceHandle};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "alarm-service", version)]
#[command(about = "Fax alarm ingestion service", long_about = None)]
struct Cli {
    /// Configuration file (defaults are used when it does not exist).
    #[arg(short, long, global = true, default_value = "alarmfax.json")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the fax directory until Ctrl-C.
    Run,
    /// Process whatever is in the fax directory once, then exit.
    Once,
    /// Normalize and parse a text file, print the operation as JSON.
    Parse {
        input: PathBuf,
    },
    /// List registered parsers and jobs.
    Exports,
    /// Write a default configuration file.
    InitConfig {
        #[arg(long)]
        force: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::InitConfig { force } => init_config(&cli.config, force),
        Commands::Exports => {
            let config = load_config(&cli.config)?;
            for export in exports::build_registry(&config).exports() {
                println!("{:<40} {}", export.interface, export.alias);
            }
            Ok(())
        }
        Commands::Parse { input } => {
            let config = load_config(&cli.config)?;
            let registry = exports::build_registry(&config);
            parse_file(&config, &registry, &input)
        }
        Commands::Once => {
            let config = load_config(&cli.config)?;
            let registry = exports::build_registry(&config);
            let mut source = alarm_service::build_source(&config, &registry)?;
            let handled = source.poll_once(&CancellationToken::new());
            log::info!("[Service] 本次处理 {} 个文件", handled);
            Ok(())
        }
        Commands::Run => {
            let config = load_config(&cli.config)?;
            let registry = exports::build_registry(&config);
            let source = alarm_service::build_source(&config, &registry)?;

            match alarm_ocr::probe_version(&config.ocr) {
                Ok(version) => log::info!("[Service] OCR 引擎: {}", version),
                Err(err) => log::warn!("[Service] 无法确认 OCR 引擎版本: {}", err),
            }

            let handle = ServiceHandle::start(source)?;
            let stop = CancellationToken::new();
            let signal = stop.clone();
            ctrlc::set_handler(move || signal.cancel()).context("无法注册 Ctrl-C 处理")?;

            while stop.sleep(Duration::from_secs(3600)) {}
            log::info!("[Service] 正在停止…");
            handle.stop();
            Ok(())
        }
    }
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    save_config(path, &AppConfig::default())?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn parse_file(config: &AppConfig, registry: &ExportRegistry, input: &Path) -> anyhow::Result<()> {
    let raw = fs::read_to_string(input).with_context(|| format!("read {}", input.display()))?;
    let lines: Vec<String> = raw.lines().map(str::to_string).collect();

    let normalizer = config.replace_dictionary.compile()?;
    let parser = registry.require::<dyn FaxParser>(&config.fax.parser_alias)?;
    let operation = parser.parse(&normalizer.normalize(&lines))?;

    println!("{}", serde_json::to_string_pretty(&operation)?);
    Ok(())
}
