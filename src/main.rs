//! `lynx`: identify the live client version and decode gamepack archives.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gamepack_protocol::config::{ClientSource, LynxConfig, DEFAULT_WORLD};
use gamepack_protocol::utils::logging::{init_logging, Redacted};
use gamepack_protocol::writer::{write_classes, write_jar};
use gamepack_protocol::{AppletParameters, ArchivePipeline, ClassMap, VersionIdentifier};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn, Level};

#[derive(Parser)]
#[command(name = "lynx")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file; environment variables are used otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Client the gamepack was downloaded for; overrides the configured source
    #[arg(short, long, value_enum)]
    source: Option<ClientSource>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the major version the server currently accepts
    Identify {
        /// 32-character connection key
        #[arg(short, long)]
        key: String,

        /// Major version to start from
        #[arg(long)]
        major: Option<u32>,
    },

    /// Decode the classes of a downloaded gamepack
    Decrypt {
        /// Gamepack jar
        #[arg(short, long)]
        gamepack: PathBuf,

        /// Saved applet page holding the secret and vector; not needed for plain clients
        #[arg(short, long)]
        params: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Identify the version, then decode into a directory named after it
    Run {
        /// Saved applet page
        #[arg(long)]
        page: PathBuf,

        /// Gamepack jar
        #[arg(short, long)]
        gamepack: PathBuf,

        /// Parent of the per-version output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => LynxConfig::from_file(path)?,
        None => LynxConfig::from_env()?,
    };
    if cli.verbose {
        config.logging.log_level = Level::DEBUG;
    }
    if let Some(source) = cli.source {
        config.archive.source = source;
    }
    config.validate_strict()?;
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Identify { key, major } => {
            if let Some(major) = major {
                config.identify.major_version = major;
            }
            let major = identify(&config, &key).await?;
            println!("{major}");
        }
        Commands::Decrypt {
            gamepack,
            params,
            out,
        } => {
            let parameters = match params {
                Some(path) => AppletParameters::parse(&read_page(&path).await?)?,
                None => AppletParameters::default(),
            };
            let classes = decode(&config, &gamepack, &parameters).await?;
            write_output(&out, &classes).await?;
        }
        Commands::Run {
            page,
            gamepack,
            out,
        } => run(&config, &page, &gamepack, &out).await?,
    }

    Ok(())
}

async fn identify(config: &LynxConfig, key: &str) -> Result<u32> {
    let identify = &config.identify;
    debug!(key = %Redacted(key), address = %identify.address(), "Identifying version");
    let mut identifier = VersionIdentifier::with_config(identify, key.as_bytes().to_vec())?;

    identifier
        .connect(identify.major_version, identify.minor_version)
        .await
        .with_context(|| format!("connecting to {}", identify.address()))?;
    let major = identifier.identify_version().await?;

    info!(major, connections = identifier.connections_opened(), "Version identified");
    Ok(major)
}

async fn decode(
    config: &LynxConfig,
    gamepack: &Path,
    parameters: &AppletParameters,
) -> Result<ClassMap> {
    let source = config.archive.source;
    let jar = tokio::fs::read(gamepack)
        .await
        .with_context(|| format!("reading {}", gamepack.display()))?;

    if source.is_encrypted() {
        let (secret, vector) = (parameters.secret()?, parameters.vector()?);
        debug!(secret = %Redacted(secret), vector = %Redacted(vector), "Decoding inner archive");
    }

    let pipeline = ArchivePipeline::from_config(&config.archive);
    let classes = pipeline.decode_gamepack(source, &jar, parameters)?;
    info!(%source, classes = classes.len(), bytes = classes.total_bytes(), "Gamepack decoded");
    Ok(classes)
}

async fn run(config: &LynxConfig, page_path: &Path, gamepack: &Path, out: &Path) -> Result<()> {
    let page = read_page(page_path).await?;
    let parameters = AppletParameters::parse(&page)?;
    let source = config.archive.source;
    info!(
        %source,
        page = %source.page_url(DEFAULT_WORLD),
        archive = parameters.archive().unwrap_or(source.jar_name()),
        "Applet parameters loaded"
    );

    let name = if source.supports_identification() && config.identify.enabled {
        let key = parameters.connection_key()?;
        identify(config, key).await?.to_string()
    } else {
        let name = fallback_name(source)?;
        warn!(name = %name, "Version not identified");
        name
    };

    let dir = out.join(name);
    tokio::fs::create_dir_all(&dir).await?;
    tokio::fs::write(dir.join("params.txt"), &page).await?;

    let classes = decode(config, gamepack, &parameters).await?;
    write_output(&dir, &classes).await
}

async fn read_page(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

async fn write_output(dir: &Path, classes: &ClassMap) -> Result<()> {
    write_jar(dir.join("client.jar"), classes).await?;
    let written = write_classes(dir.join("bin"), classes).await?;
    info!(dir = %dir.display(), written, "Output written");
    Ok(())
}

fn fallback_name(source: ClientSource) -> Result<String> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before unix epoch")?
        .as_secs();
    Ok(format!("{}-{secs}", source.name()))
}
