mod commands;
mod error;
mod logging;
mod settings;

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use nugetw_exe::Verbosity;
use nugetw_feed::CancellationToken;
use nugetw_platform::AppPaths;

use crate::commands::{Context, InstallArgs, ShowArgs, UpdateArgs, VersionsArgs};
use crate::error::CliError;
use crate::settings::CliSettings;

#[derive(Parser, Debug)]
#[command(name = "nugetw")]
#[command(author, version, about = "Drive nuget.exe and query NuGet feeds", long_about = None)]
struct Cli {
    /// Log debug detail to stderr and the log file
    #[arg(long, global = true)]
    debug: bool,

    /// NuGet.config to pass to nuget.exe
    #[arg(long, global = true, value_name = "PATH", env = "NUGETW_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    /// quiet, normal or detailed
    #[arg(long, global = true, value_name = "LEVEL")]
    verbosity: Option<Verbosity>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install a package or the packages of a packages.config
    Install(InstallArgs),

    /// Update packages to their latest or a given version
    Update(UpdateArgs),

    /// Run nuget.exe with raw arguments
    Exec {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
        args: Vec<String>,
    },

    /// Download nuget.exe again
    UpdateClient,

    /// Show metadata for one package version
    Show(ShowArgs),

    /// List the versions a feed has for a package
    Versions(VersionsArgs),
}

async fn dispatch(cli: Cli, ctx: &Context) -> Result<String, CliError> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::debug!("Interrupted, cancelling feed queries");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Commands::Install(args) => commands::install(ctx, &args).await,
        Commands::Update(args) => commands::update(ctx, &args).await,
        Commands::Exec { args } => commands::exec(ctx, &args).await,
        Commands::UpdateClient => commands::update_client(ctx).await,
        Commands::Show(args) => commands::show(ctx, &args, &cancel).await,
        Commands::Versions(args) => commands::versions(ctx, &args, &cancel).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let paths = match AppPaths::new() {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("nugetw: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = paths.ensure_dirs() {
        eprintln!("nugetw: could not create {}: {e}", paths.data_dir.display());
    }

    let settings = CliSettings::load();
    logging::init_logging(
        Some(&paths.log_file()),
        cli.debug || settings.debug_logging,
        settings.max_log_size_bytes,
    );
    log::debug!("Loaded settings: {settings:?}");

    let ctx = Context {
        verbosity: cli.verbosity.unwrap_or(settings.verbosity),
        config_file: cli.config_file.clone(),
        settings,
        paths,
    };

    match dispatch(cli, &ctx).await {
        Ok(output) => {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(output.as_bytes());
            let _ = stdout.flush();
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            eprintln!("nugetw: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
