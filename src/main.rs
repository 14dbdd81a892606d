use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use comet::cli;
use comet::config::PanelConfig;
use comet::ui::TerminalPresenter;
use comet::AppContext;

#[derive(Parser)]
#[command(
    name = "comet",
    about = "comet — terminal member dashboard for the constelia.ai Web API",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Data directory for the session token, drafts, and config
    #[arg(long, env = "COMET_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Override the Web API endpoint
    #[arg(long, env = "COMET_API_URL", global = true)]
    api_url: Option<String>,

    /// Origin the dashboard is considered served from (decides cookie vs
    /// local-store token persistence)
    #[arg(long, env = "COMET_ORIGIN", global = true)]
    origin: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "COMET_LOG", global = true)]
    log: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with a license key.
    Connect {
        /// The license key. Never logged; redacted from all diagnostics.
        #[arg(env = "COMET_KEY", hide_env_values = true)]
        key: String,
        /// Persist a handshake so future runs reconnect silently.
        #[arg(long)]
        remember: bool,
    },
    /// Restore the stored session and show the member summary.
    Status,
    /// Script catalog and toggles.
    Scripts {
        #[command(subcommand)]
        command: ScriptsCommand,
    },
    /// FC2T project catalog and toggles.
    Projects {
        #[command(subcommand)]
        command: ProjectsCommand,
    },
    /// Remote configuration blob.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Prebuilt script/project bundles.
    Builds {
        #[command(subcommand)]
        command: BuildsCommand,
    },
    /// Pull or push a script's source.
    Script {
        #[command(subcommand)]
        command: ScriptCommand,
    },
    /// Roll the loot table.
    Loot,
    /// Show or change the local caching flag.
    Cache {
        /// "on" or "off"; omit to show the current state.
        state: Option<String>,
    },
    /// Set the member language.
    Language { language: String },
    /// Set the protection mode.
    Protection { mode: i64 },
    /// Toggle Venus buddy status.
    Venus,
    /// Disconnect and clear the stored session.
    Logout,
}

#[derive(Subcommand)]
enum ScriptsCommand {
    /// List enabled scripts (or the whole catalog with --all).
    List {
        #[arg(long)]
        all: bool,
    },
    /// Toggle one or more scripts by id.
    Toggle {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

#[derive(Subcommand)]
enum ProjectsCommand {
    /// List enabled projects (or the whole catalog with --all).
    List {
        #[arg(long)]
        all: bool,
    },
    /// Toggle one or more projects by id.
    Toggle {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the configuration blob.
    Show,
    /// Replace the configuration from a JSON file.
    Set { file: PathBuf },
    /// Reset the configuration server-side.
    Reset,
}

#[derive(Subcommand)]
enum BuildsCommand {
    /// List available builds.
    List,
    /// Apply a build's selections (and configuration, if it carries one).
    Apply { name: String },
    /// Create a shareable build from script/project selections.
    Create {
        name: String,
        #[arg(long, value_delimiter = ',')]
        scripts: Vec<i64>,
        #[arg(long, value_delimiter = ',')]
        projects: Vec<i64>,
        /// JSON file with a configuration override to bundle.
        #[arg(long)]
        config_file: Option<PathBuf>,
    },
    /// Delete one of your builds.
    Delete { name: String },
}

#[derive(Subcommand)]
enum ScriptCommand {
    /// Fetch a script's source (to stdout or --out file).
    Pull {
        id: i64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Upload a script's source from a file.
    Push {
        id: i64,
        file: PathBuf,
        #[arg(long, default_value = "")]
        notes: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = PanelConfig::load(args.data_dir, args.api_url, args.origin, args.log);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let ctx = AppContext::new(config, Arc::new(TerminalPresenter))?;

    match args.command {
        Command::Connect { key, remember } => cli::cmd_connect(&ctx, &key, remember).await,
        Command::Status => cli::cmd_status(&ctx).await,
        Command::Scripts { command } => match command {
            ScriptsCommand::List { all } => cli::cmd_scripts_list(&ctx, all).await,
            ScriptsCommand::Toggle { ids } => cli::cmd_scripts_toggle(&ctx, &ids).await,
        },
        Command::Projects { command } => match command {
            ProjectsCommand::List { all } => cli::cmd_projects_list(&ctx, all).await,
            ProjectsCommand::Toggle { ids } => cli::cmd_projects_toggle(&ctx, &ids).await,
        },
        Command::Config { command } => match command {
            ConfigCommand::Show => cli::cmd_config_show(&ctx).await,
            ConfigCommand::Set { file } => cli::cmd_config_set(&ctx, &file).await,
            ConfigCommand::Reset => cli::cmd_config_reset(&ctx).await,
        },
        Command::Builds { command } => match command {
            BuildsCommand::List => cli::cmd_builds_list(&ctx).await,
            BuildsCommand::Apply { name } => cli::cmd_builds_apply(&ctx, &name).await,
            BuildsCommand::Create {
                name,
                scripts,
                projects,
                config_file,
            } => {
                cli::cmd_builds_create(&ctx, &name, &scripts, &projects, config_file.as_ref())
                    .await
            }
            BuildsCommand::Delete { name } => cli::cmd_builds_delete(&ctx, &name).await,
        },
        Command::Script { command } => match command {
            ScriptCommand::Pull { id, out } => cli::cmd_script_pull(&ctx, id, out).await,
            ScriptCommand::Push { id, file, notes } => {
                cli::cmd_script_push(&ctx, id, &file, &notes).await
            }
        },
        Command::Loot => cli::cmd_loot(&ctx).await,
        Command::Cache { state } => {
            let enabled = match state.as_deref() {
                None => None,
                Some("on") => Some(true),
                Some("off") => Some(false),
                Some(other) => anyhow::bail!("expected \"on\" or \"off\", got {other:?}"),
            };
            cli::cmd_cache(&ctx, enabled).await
        }
        Command::Language { language } => cli::cmd_language(&ctx, &language).await,
        Command::Protection { mode } => cli::cmd_protection(&ctx, mode).await,
        Command::Venus => cli::cmd_venus(&ctx).await,
        Command::Logout => cli::cmd_logout(&ctx).await,
    }
}
