//! gallery-admin - Maintenance CLI for the shader gallery data directory.

mod commands;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commands::{Context, RoleArg};
use gallery_config_and_utils::{init_logging, Config, Paths};

/// Import legacy dumps, moderate effects and manage users.
#[derive(Parser)]
#[command(name = "gallery-admin")]
#[command(about = "Shader gallery administration")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error). Overrides config and GLSL_LOG_LEVEL
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Data directory holding glslsandbox.db. Defaults to GLSL_DATA_PATH or ./data
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a newline-delimited legacy dump
    Import {
        /// Dump file
        file: PathBuf,
    },
    /// Show one effect
    Show {
        /// Effect ID
        id: i64,
        /// Print this version's code instead of the latest
        #[arg(long)]
        version: Option<i64>,
    },
    /// List effects, most recently modified first
    List {
        /// Page number, starting at 0
        #[arg(short, long, default_value = "0")]
        page: usize,
        /// Effects per page
        #[arg(short, long, default_value = "20")]
        size: usize,
        /// Include hidden effects
        #[arg(short, long)]
        all: bool,
    },
    /// List an effect together with its direct forks
    Siblings {
        /// Parent effect ID
        id: i64,
        #[arg(short, long, default_value = "0")]
        page: usize,
        #[arg(short, long, default_value = "50")]
        size: usize,
    },
    /// Hide an effect from the public gallery
    Hide {
        /// Effect ID
        id: i64,
    },
    /// Make a hidden effect public again
    Unhide {
        /// Effect ID
        id: i64,
    },
    /// Manage users
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// List users
    List,
    /// Add a user
    Add {
        /// Login name
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        /// Identity provider (password, github, test)
        #[arg(long, default_value = "password")]
        provider: String,
        /// Account ID at the provider. Defaults to the name
        #[arg(long)]
        provider_id: Option<String>,
        /// Precomputed password hash, required for the password provider
        #[arg(long, env = "GLSL_PASSWORD_HASH", hide_env_values = true)]
        password_hash: Option<String>,
        #[arg(long, value_enum, default_value = "moderator")]
        role: RoleArg,
    },
    /// Change a user's role
    Role {
        /// User ID
        id: i64,
        #[arg(value_enum)]
        role: RoleArg,
    },
    /// Replace a user's password hash
    Passwd {
        /// Login name
        name: String,
        #[arg(long, env = "GLSL_PASSWORD_HASH", hide_env_values = true)]
        password_hash: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.data_dir {
        Some(dir) => Paths::with_base_dir(dir),
        None => Paths::new(),
    };
    let mut config = Config::load(&paths)?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
        config.validate()?;
    }

    paths.ensure_dirs()?;
    init_logging("gallery-admin", &config.log_level, &paths);

    let ctx = Context::new(paths, config, cli.format);
    if let Err(e) = run(&ctx, cli.command).await {
        tracing::error!(error = %e, "command failed");
        output::print_error(&format!("{e:#}"), &ctx.format);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(ctx: &Context, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Import { file } => commands::import::run(ctx, file).await,
        Commands::Show { id, version } => commands::effects::show(ctx, id, version).await,
        Commands::List { page, size, all } => commands::effects::list(ctx, page, size, all).await,
        Commands::Siblings { id, page, size } => {
            commands::effects::siblings(ctx, id, page, size).await
        }
        Commands::Hide { id } => commands::effects::set_hidden(ctx, id, true).await,
        Commands::Unhide { id } => commands::effects::set_hidden(ctx, id, false).await,
        Commands::Users { command } => match command {
            UserCommands::List => commands::users::list(ctx),
            UserCommands::Add {
                name,
                email,
                provider,
                provider_id,
                password_hash,
                role,
            } => commands::users::add(
                ctx,
                commands::users::AddUser {
                    provider_id: provider_id.unwrap_or_else(|| name.clone()),
                    name,
                    email,
                    provider,
                    password_hash,
                    role: role.into(),
                },
            ),
            UserCommands::Role { id, role } => commands::users::set_role(ctx, id, role.into()),
            UserCommands::Passwd {
                name,
                password_hash,
            } => commands::users::passwd(ctx, &name, &password_hash),
        },
    }
}
