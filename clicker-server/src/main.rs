use {
    std::{path::PathBuf, process::exit},
    tracing::{Level, info, error},
    tracing_subscriber::FmtSubscriber,
    clap::{Parser, Subcommand},
    clicker_server::{ClickerServer, ServerConfig},
};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the game server
    Serve {
        config_file: PathBuf,
    },
    /// Apply database migrations and exit
    Migrate {
        config_file: PathBuf,
    },
}

impl Command {
    fn config_file(&self) -> &PathBuf {
        match self {
            Self::Serve { config_file } | Self::Migrate { config_file } => config_file,
        }
    }
}

#[tokio::main]
async fn main() {
    FmtSubscriber::builder().with_max_level(Level::INFO).init();
    let args = Args::parse();

    let config_path = match std::env::current_dir() {
        Ok(dir) => dir.join(args.command.config_file()),
        Err(err) => {
            error!("failed to resolve current directory: {err:?}");
            exit(-1);
        }
    };
    info!("loading config from {config_path:?}");
    let config = match ServerConfig::load(config_path).await {
        Ok(v) => v,
        Err(err) => {
            error!("{err}");
            exit(-1);
        }
    };

    let server = match ClickerServer::new(config) {
        Ok(v) => v,
        Err(err) => {
            error!("failed to start: {err}");
            exit(-1);
        }
    };

    match args.command {
        Command::Migrate { .. } => info!("database is up to date"),
        Command::Serve { .. } => {
            if let Err(err) = server.serve().await {
                error!("{err}");
                exit(-1);
            }
        },
    }
}
