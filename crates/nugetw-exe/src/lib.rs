//! Driving the `nuget.exe` command-line tool.
//!
//! [`NugetExe`] bootstraps the binary and runs it; [`InstallCommand`] and
//! [`UpdateCommand`] render typed options into its command line;
//! [`NugetClient`] binds execution to one `NuGet.config`.

mod bootstrap;
mod client;
pub mod command;
mod download;
mod error;
mod executor;

pub use bootstrap::{BootstrapState, ExeConfig, NugetExe, min_nuget_version};
pub use client::NugetClient;
pub use command::{
    CommonOptions, FileConflictAction, InstallCommand, NugetCommand, PackageSaveMode,
    UnknownOptionValue, UpdateCommand, Verbosity,
};
pub use download::{BinaryFetcher, DownloadError, HttpFetcher, NUGET_EXE_URL};
pub use error::ExeError;
pub use executor::{Launcher, finalize_command_line};
