use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use log::{debug, info};
use nugetw_core::{LogForwarder, PackageMetadata, PackageVersion};
use nugetw_exe::{
    ExeConfig, FileConflictAction, InstallCommand, NugetClient, NugetExe, PackageSaveMode,
    UpdateCommand, Verbosity,
};
use nugetw_feed::{CancellationToken, Repository};
use nugetw_platform::{AppPaths, quote_arg};

use crate::error::CliError;
use crate::settings::CliSettings;

/// Options accepted by both `install` and `update`.
#[derive(Args, Debug, Default)]
pub struct CommonArgs {
    /// Package source to use; repeat for several
    #[arg(short, long = "source", value_name = "URL")]
    pub sources: Vec<String>,

    /// Version to install or update to
    #[arg(long)]
    pub version: Option<String>,

    /// Allow prerelease packages
    #[arg(long)]
    pub prerelease: bool,

    /// Force nuget to print English messages
    #[arg(long)]
    pub force_english_output: bool,

    /// nuspec, nupkg or "nuspec;nupkg"
    #[arg(long, value_name = "MODE")]
    pub package_save_mode: Option<PackageSaveMode>,

    /// none, overwrite or ignore
    #[arg(long, value_name = "ACTION", default_value = "none")]
    pub file_conflict_action: FileConflictAction,
}

#[derive(Args, Debug, Default)]
pub struct InstallArgs {
    /// Package id or path to a packages.config
    pub target: String,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Source used when the primary sources fail; repeat for several
    #[arg(long = "fallback-source", value_name = "URL")]
    pub fallback_sources: Vec<String>,

    #[arg(long)]
    pub disable_parallel_processing: bool,

    /// Install into a folder without the version suffix
    #[arg(long)]
    pub exclude_version: bool,

    #[arg(long)]
    pub no_cache: bool,

    #[arg(short, long, value_name = "DIR")]
    pub output_directory: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    /// packages.config or solution to update
    pub target: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Package id to update; repeat for several
    #[arg(long = "id", value_name = "ID")]
    pub ids: Vec<String>,

    /// Only update within the same major and minor version
    #[arg(long)]
    pub safe: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub id: String,
    pub version: String,

    /// Service index of the feed to query
    #[arg(long, value_name = "URL")]
    pub feed: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionsArgs {
    pub id: String,

    /// Interval such as "[1.11,3.1)"; a bare version means "at least"
    #[arg(short, long)]
    pub range: Option<String>,

    #[arg(long)]
    pub prerelease: bool,

    /// Include unlisted versions
    #[arg(long)]
    pub unlisted: bool,

    /// Service index of the feed to query
    #[arg(long, value_name = "URL")]
    pub feed: Option<String>,
}

/// Settings plus the global flags that override them.
#[derive(Debug, Clone)]
pub struct Context {
    pub settings: CliSettings,
    pub paths: AppPaths,
    pub config_file: Option<PathBuf>,
    pub verbosity: Verbosity,
}

impl Context {
    /// # Errors
    /// Returns an error if `min_version` in the settings is not a version or
    /// the download client cannot be created.
    pub fn nuget_exe(&self) -> Result<Arc<NugetExe>, CliError> {
        let min_version =
            PackageVersion::parse(&self.settings.min_version).map_err(|source| {
                CliError::MinVersion {
                    input: self.settings.min_version.clone(),
                    source,
                }
            })?;

        let bin_dir = self
            .settings
            .bin_dir
            .clone()
            .unwrap_or_else(|| self.paths.bin_dir.clone());
        let mut config = ExeConfig::new(bin_dir)
            .with_min_version(min_version)
            .with_download_url(self.settings.download_url.clone());
        if let Some(sha256) = &self.settings.download_sha256 {
            config = config.with_download_sha256(sha256.clone());
        }

        Ok(Arc::new(NugetExe::new(config)?))
    }

    /// # Errors
    /// See [`Self::nuget_exe`]; also fails if the config directory cannot be
    /// created.
    pub fn client(&self) -> Result<NugetClient, CliError> {
        let exe = self.nuget_exe()?;
        let config_file = self
            .config_file
            .clone()
            .or_else(|| self.settings.nuget_config_file.clone())
            .unwrap_or_else(|| self.paths.nuget_config_file.clone());
        debug!("Using NuGet config {}", config_file.display());
        Ok(NugetClient::with_config_file(exe, config_file)?)
    }

    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn repository(&self, feed: Option<&str>) -> Result<Repository, CliError> {
        let feed = feed.unwrap_or(&self.settings.feed_url);
        let timeout = Duration::from_secs(self.settings.http_timeout_secs);
        Ok(Repository::with_timeout(feed, timeout)?.with_logger(Arc::new(LogForwarder::default())))
    }
}

/// Shared options go through builder methods both command types define.
macro_rules! apply_common {
    ($command:expr, $common:expr) => {{
        let common: &CommonArgs = $common;
        let mut command = $command
            .with_prerelease(common.prerelease)
            .with_force_english_output(common.force_english_output)
            .with_file_conflict_action(common.file_conflict_action);
        for source in &common.sources {
            command = command.with_source(source.clone());
        }
        if let Some(version) = &common.version {
            command = command.with_version(version.clone());
        }
        if let Some(mode) = common.package_save_mode {
            command = command.with_package_save_mode(mode);
        }
        command
    }};
}

#[must_use]
pub fn build_install(args: &InstallArgs, verbosity: Verbosity) -> InstallCommand {
    let mut command = InstallCommand::package(args.target.clone())
        .with_disable_parallel_processing(args.disable_parallel_processing)
        .with_exclude_version(args.exclude_version)
        .with_no_cache(args.no_cache)
        .with_verbosity(verbosity);
    for source in &args.fallback_sources {
        command = command.with_fallback_source(source.clone());
    }
    if let Some(dir) = &args.output_directory {
        command = command.with_output_directory(dir.clone());
    }
    apply_common!(command, &args.common)
}

#[must_use]
pub fn build_update(args: &UpdateArgs, verbosity: Verbosity) -> UpdateCommand {
    let mut command = match &args.target {
        Some(target) => UpdateCommand::for_target(target.clone()),
        None => UpdateCommand::new(),
    }
    .with_safe(args.safe)
    .with_verbosity(verbosity);
    for id in &args.ids {
        command = command.with_id(id.clone());
    }
    apply_common!(command, &args.common)
}

/// Rebuild a command line from argv tokens, quoting tokens that contain
/// whitespace.
#[must_use]
pub fn join_exec_args(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|token| {
            if token.is_empty() || token.contains(char::is_whitespace) {
                quote_arg(token)
            } else {
                token.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// # Errors
/// Returns bootstrap and tool errors.
pub async fn install(ctx: &Context, args: &InstallArgs) -> Result<String, CliError> {
    let command = build_install(args, ctx.verbosity);
    Ok(ctx.client()?.run(&command).await?)
}

/// # Errors
/// Returns bootstrap and tool errors.
pub async fn update(ctx: &Context, args: &UpdateArgs) -> Result<String, CliError> {
    let command = build_update(args, ctx.verbosity);
    Ok(ctx.client()?.run(&command).await?)
}

/// # Errors
/// Returns a usage error when no arguments are given, and bootstrap and tool
/// errors otherwise.
pub async fn exec(ctx: &Context, tokens: &[String]) -> Result<String, CliError> {
    if tokens.is_empty() {
        return Err(CliError::Usage(
            "exec needs the nuget arguments to run".to_string(),
        ));
    }
    let client = ctx.client()?;
    Ok(client
        .execute_with_verbosity(&join_exec_args(tokens), ctx.verbosity)
        .await?)
}

/// # Errors
/// Returns bootstrap errors.
pub async fn update_client(ctx: &Context) -> Result<String, CliError> {
    let exe = ctx.nuget_exe()?;
    let path = exe.update_client().await?;
    info!("nuget.exe refreshed at {}", path.display());
    Ok(format!("nuget.exe ready at {}\n", path.display()))
}

/// # Errors
/// Returns feed errors, or [`CliError::PackageNotFound`] when the feed has
/// no such version.
pub async fn show(
    ctx: &Context,
    args: &ShowArgs,
    cancel: &CancellationToken,
) -> Result<String, CliError> {
    let repository = ctx.repository(args.feed.as_deref())?;
    match repository.get_package(&args.id, &args.version, cancel).await? {
        Some(metadata) => Ok(format_metadata(&metadata)),
        None => Err(CliError::PackageNotFound {
            id: args.id.clone(),
            version: args.version.clone(),
            feed: repository.source_uri().to_string(),
        }),
    }
}

/// # Errors
/// Returns feed errors, including a malformed `--range`.
pub async fn versions(
    ctx: &Context,
    args: &VersionsArgs,
    cancel: &CancellationToken,
) -> Result<String, CliError> {
    let repository = ctx.repository(args.feed.as_deref())?;
    let packages = match &args.range {
        Some(range) => {
            repository
                .get_packages_in_range_str(&args.id, range, args.prerelease, args.unlisted, cancel)
                .await?
        }
        None => {
            repository
                .get_packages(&args.id, args.prerelease, args.unlisted, cancel)
                .await?
        }
    };
    Ok(format_versions(&packages))
}

#[must_use]
pub fn format_versions(packages: &[PackageMetadata]) -> String {
    let mut out = String::new();
    for package in packages {
        let version = package.identity.version.to_full_string();
        if package.listed {
            let _ = writeln!(out, "{version}");
        } else {
            let _ = writeln!(out, "{version} (unlisted)");
        }
    }
    out
}

#[must_use]
pub fn format_metadata(metadata: &PackageMetadata) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}",
        metadata.id(),
        metadata.identity.version.to_full_string()
    );

    let fields = [
        ("Title", metadata.title.as_deref()),
        ("Authors", metadata.authors.as_deref()),
        ("Summary", metadata.summary.as_deref()),
        ("Description", metadata.description.as_deref()),
        ("Project", metadata.project_url.as_deref()),
        ("License", metadata.license_url.as_deref()),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            let _ = writeln!(out, "{label}: {value}");
        }
    }
    if !metadata.tags.is_empty() {
        let _ = writeln!(out, "Tags: {}", metadata.tags.join(", "));
    }
    if let Some(published) = metadata.published {
        let _ = writeln!(out, "Published: {}", published.format("%Y-%m-%d"));
    }
    if let Some(downloads) = metadata.download_count {
        let _ = writeln!(out, "Downloads: {downloads}");
    }
    if !metadata.listed {
        let _ = writeln!(out, "Unlisted");
    }

    for group in &metadata.dependency_groups {
        let framework = group.target_framework.as_deref().unwrap_or("any");
        let _ = writeln!(out, "Dependencies ({framework}):");
        if group.dependencies.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for dependency in &group.dependencies {
            match dependency.range.as_deref() {
                Some(range) => {
                    let _ = writeln!(out, "  {} {range}", dependency.id);
                }
                None => {
                    let _ = writeln!(out, "  {}", dependency.id);
                }
            }
        }
    }
    out
}
