//! Main CLI application structure

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::output::{Output, OutputFormat};
use super::task;
use crate::api;
use crate::service::TaskService;
use crate::storage::{self, Config, StorageBackend, CONFIG_FILE_NAME};

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(author, version, about = "Task manager with a JSON HTTP API")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Config file (defaults to ./taskboard.toml, then the user config dir)
    #[arg(long, short = 'c', global = true, env = "TASKBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Task data file, overriding config and DATA_PATH
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Storage backend, overriding config and TASKBOARD_STORAGE
    #[arg(long, global = true, value_enum)]
    pub storage: Option<StorageBackend>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default config file
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP API
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Allowed CORS origin (`*` for any)
        #[arg(long)]
        cors_origin: Option<String>,
    },

    /// Manage tasks
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Show task counts
    Stats,
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, matches!(cli.command, Commands::Serve { .. }));

    let output = Output::new(cli.format);
    tracing::debug!("taskboard starting");

    let overrides = Overrides {
        config: cli.config,
        data: cli.data,
        storage: cli.storage,
    };

    match cli.command {
        Commands::Init { path, force } => init(&output, &path, force)?,

        Commands::Serve {
            host,
            port,
            cors_origin,
        } => {
            let mut config = overrides.load()?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(origin) = cors_origin {
                config.server.cors_origin = origin;
            }

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime.block_on(api::serve(config))?;
        }

        Commands::Task(cmd) => {
            let service = open_service(&overrides.load()?)?;
            task::run(cmd, &service, &output)?;
        }

        Commands::Stats => {
            let service = open_service(&overrides.load()?)?;
            output.stats(&service.stats()?);
        }
    }

    Ok(())
}

/// Installs the stderr log subscriber; `RUST_LOG` wins over the defaults
fn init_logging(verbose: bool, serving: bool) {
    let default = if verbose {
        "taskboard=debug,tower_http=debug"
    } else if serving {
        "taskboard=info,tower_http=info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into());

    // A subscriber may already be set when embedded; keep the existing one.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Global flags that override file and environment settings
struct Overrides {
    config: Option<PathBuf>,
    data: Option<PathBuf>,
    storage: Option<StorageBackend>,
}

impl Overrides {
    fn load(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(path) = &self.data {
            config.storage.data_path = Some(path.clone());
        }
        if let Some(backend) = self.storage {
            config.storage.backend = backend;
        }
        Ok(config)
    }
}

fn open_service(config: &Config) -> Result<TaskService> {
    tracing::debug!(
        backend = %config.storage.backend,
        path = %config.storage.resolved_path().display(),
        "opening task store"
    );
    let store = storage::open_store(&config.storage)?;
    Ok(TaskService::new(store))
}

fn init(output: &Output, path: &Path, force: bool) -> Result<()> {
    let target = path.join(CONFIG_FILE_NAME);

    if target.exists() && !force {
        output.success(&format!("Config already exists at {}", target.display()));
        return Ok(());
    }

    Config::default().save(&target)?;
    tracing::debug!(path = %target.display(), "wrote default config");
    output.success(&format!("Initialized taskboard config at {}", target.display()));
    Ok(())
}
