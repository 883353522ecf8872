use clap::{Parser, Subcommand};
use lib::store::FileStore;

#[derive(Parser)]
#[command(name = "mail2git")]
#[command(about = "Commit forwarded mail to a GitHub repository", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json.
    Init {
        /// Config file path (default: MAIL2GIT_CONFIG_PATH or ~/.mail2git/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the webhook gateway. GITHUB_TOKEN, GITHUB_OWNER, GITHUB_REPO and GMAIL_WEBHOOK_TOKEN
    /// must be set here or in the config file.
    Serve {
        /// Config file path (default: MAIL2GIT_CONFIG_PATH or ~/.mail2git/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 8080)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Print the repository path a subject line resolves to.
    Resolve {
        /// Subject line, e.g. "[append] journal/today"
        subject: String,
    },

    /// Print a file from the repository (raw content; empty when missing).
    Show {
        /// Path inside the repository
        path: String,

        /// Branch to read (default: configured default branch)
        #[arg(long, short)]
        branch: Option<String>,

        /// Config file path (default: MAIL2GIT_CONFIG_PATH or ~/.mail2git/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("mail2git {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Resolve { subject }) => {
            let target = lib::path::resolve_path(&subject);
            println!("{}", target.path);
            if target.append_mode {
                println!("(append requested)");
            }
        }
        Some(Commands::Show {
            path,
            branch,
            config,
        }) => {
            if let Err(e) = run_show(config, path, branch).await {
                log::error!("show failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (config, path) = lib::config::load_config(config_path)?;
    log::debug!("loaded config from {}", path.display());
    let mut settings = config.resolve()?;
    if let Some(p) = port {
        settings.port = p;
    }
    log::info!("starting gateway on {}:{}", settings.bind, settings.port);
    lib::gateway::run_gateway(settings).await
}

async fn run_show(
    config_path: Option<std::path::PathBuf>,
    path: String,
    branch: Option<String>,
) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let github = config.resolve_github()?;
    let branch = branch.unwrap_or_else(|| github.default_branch.clone());
    let store = lib::store::GitHubStore::new(&github);
    let text = store.read_raw(&path, &branch).await?;
    if text.is_empty() {
        log::warn!("{}@{} is empty or does not exist", path, branch);
    }
    print!("{}", text);
    Ok(())
}
