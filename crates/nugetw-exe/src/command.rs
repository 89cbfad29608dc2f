//! Typed builders for the nuget `install` and `update` verbs.
//!
//! Rendering is a pure function of the option values. Verbosity and the
//! config file are carried by the command but appended by the executor, not
//! by [`NugetCommand::render`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use nugetw_platform::quote_arg;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} '{value}'")]
pub struct UnknownOptionValue {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Detailed,
}

impl Verbosity {
    /// Value for `-Verbosity`. `Normal` is nuget's default and renders nothing.
    #[must_use]
    pub fn as_arg(self) -> Option<&'static str> {
        match self {
            Self::Quiet => Some("quiet"),
            Self::Normal => None,
            Self::Detailed => Some("detailed"),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Quiet => "quiet",
            Self::Normal => "normal",
            Self::Detailed => "detailed",
        })
    }
}

impl FromStr for Verbosity {
    type Err = UnknownOptionValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" => Ok(Self::Quiet),
            "normal" => Ok(Self::Normal),
            "detailed" => Ok(Self::Detailed),
            _ => Err(UnknownOptionValue {
                kind: "verbosity",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageSaveMode {
    Nuspec,
    Nupkg,
    NuspecAndNupkg,
}

impl PackageSaveMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nuspec => "nuspec",
            Self::Nupkg => "nupkg",
            Self::NuspecAndNupkg => "nuspec;nupkg",
        }
    }
}

impl FromStr for PackageSaveMode {
    type Err = UnknownOptionValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nuspec" => Ok(Self::Nuspec),
            "nupkg" => Ok(Self::Nupkg),
            "nuspec;nupkg" | "nupkg;nuspec" => Ok(Self::NuspecAndNupkg),
            _ => Err(UnknownOptionValue {
                kind: "package save mode",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileConflictAction {
    #[default]
    None,
    Overwrite,
    Ignore,
}

impl FileConflictAction {
    #[must_use]
    pub fn as_arg(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Overwrite => Some("overwrite"),
            Self::Ignore => Some("ignore"),
        }
    }
}

impl FromStr for FileConflictAction {
    type Err = UnknownOptionValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "overwrite" => Ok(Self::Overwrite),
            "ignore" => Ok(Self::Ignore),
            _ => Err(UnknownOptionValue {
                kind: "file conflict action",
                value: s.to_string(),
            }),
        }
    }
}

/// A nuget verb with its options.
pub trait NugetCommand {
    fn verb(&self) -> &'static str;

    /// Positional argument placed right after the verb.
    fn target(&self) -> Option<&str>;

    /// Option arguments in their stable order, without verb or target.
    fn render(&self) -> Vec<String>;

    fn config_file(&self) -> Option<&Path>;

    fn verbosity(&self) -> Verbosity;

    /// `verb [target] args...` joined by single spaces.
    fn command_line(&self) -> String {
        let mut parts = vec![self.verb().to_string()];
        if let Some(target) = self.target().filter(|target| !target.trim().is_empty()) {
            parts.push(render_target(target));
        }
        parts.extend(self.render());
        parts.join(" ")
    }
}

fn render_target(target: &str) -> String {
    if target.contains(char::is_whitespace) {
        quote_arg(target)
    } else {
        target.to_string()
    }
}

/// Quote each non-blank entry and join them into one argument.
fn push_source_list(args: &mut Vec<String>, flag: &str, sources: &[String]) {
    let quoted: Vec<String> = sources
        .iter()
        .filter(|source| !source.trim().is_empty())
        .map(|source| quote_arg(source))
        .collect();
    if quoted.is_empty() {
        return;
    }
    args.push(flag.to_string());
    args.push(quoted.join(" "));
}

fn push_value(args: &mut Vec<String>, flag: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|value| !value.trim().is_empty()) {
        args.push(flag.to_string());
        args.push(value.to_string());
    }
}

/// Options shared by `install` and `update`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonOptions {
    pub sources: Vec<String>,
    pub force_english_output: bool,
    pub package_save_mode: Option<PackageSaveMode>,
    pub file_conflict_action: FileConflictAction,
    pub config_file: Option<PathBuf>,
    pub verbosity: Option<Verbosity>,
}

impl CommonOptions {
    fn render_into(&self, args: &mut Vec<String>) {
        if self.force_english_output {
            args.push("-ForceEnglishOutput".to_string());
        }
        args.push("-NonInteractive".to_string());
        push_source_list(args, "-Source", &self.sources);
        if let Some(mode) = self.package_save_mode {
            args.push("-PackageSaveMode".to_string());
            args.push(mode.as_str().to_string());
        }
        if let Some(action) = self.file_conflict_action.as_arg() {
            args.push("-FileConflictAction".to_string());
            args.push(action.to_string());
        }
    }
}

macro_rules! common_builders {
    ($command:ty) => {
        impl $command {
            #[must_use]
            pub fn with_source(mut self, source: impl Into<String>) -> Self {
                self.common.sources.push(source.into());
                self
            }

            #[must_use]
            pub fn with_force_english_output(mut self, enabled: bool) -> Self {
                self.common.force_english_output = enabled;
                self
            }

            #[must_use]
            pub fn with_package_save_mode(mut self, mode: PackageSaveMode) -> Self {
                self.common.package_save_mode = Some(mode);
                self
            }

            #[must_use]
            pub fn with_file_conflict_action(mut self, action: FileConflictAction) -> Self {
                self.common.file_conflict_action = action;
                self
            }

            #[must_use]
            pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
                self.common.config_file = Some(path.into());
                self
            }

            #[must_use]
            pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
                self.common.verbosity = Some(verbosity);
                self
            }

            #[must_use]
            pub fn with_version(mut self, version: impl Into<String>) -> Self {
                self.version = Some(version.into());
                self
            }

            #[must_use]
            pub fn with_prerelease(mut self, enabled: bool) -> Self {
                self.prerelease = enabled;
                self
            }
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct InstallCommand {
    pub common: CommonOptions,
    /// Package id or path to a `packages.config`.
    pub target: Option<String>,
    pub fallback_sources: Vec<String>,
    pub disable_parallel_processing: bool,
    pub exclude_version: bool,
    pub no_cache: bool,
    pub output_directory: Option<String>,
    pub version: Option<String>,
    pub prerelease: bool,
}

impl InstallCommand {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn package(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_fallback_source(mut self, source: impl Into<String>) -> Self {
        self.fallback_sources.push(source.into());
        self
    }

    #[must_use]
    pub fn with_disable_parallel_processing(mut self, enabled: bool) -> Self {
        self.disable_parallel_processing = enabled;
        self
    }

    #[must_use]
    pub fn with_exclude_version(mut self, enabled: bool) -> Self {
        self.exclude_version = enabled;
        self
    }

    #[must_use]
    pub fn with_no_cache(mut self, enabled: bool) -> Self {
        self.no_cache = enabled;
        self
    }

    #[must_use]
    pub fn with_output_directory(mut self, path: impl Into<String>) -> Self {
        self.output_directory = Some(path.into());
        self
    }
}

common_builders!(InstallCommand);

impl NugetCommand for InstallCommand {
    fn verb(&self) -> &'static str {
        "install"
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn render(&self) -> Vec<String> {
        let mut args = Vec::new();
        self.common.render_into(&mut args);

        if self.disable_parallel_processing {
            args.push("-DisableParallelProcessing".to_string());
        }
        if self.exclude_version {
            args.push("-ExcludeVersion".to_string());
        }
        if self.no_cache {
            args.push("-NoCache".to_string());
        }
        push_source_list(&mut args, "-FallbackSource", &self.fallback_sources);
        if let Some(dir) = self
            .output_directory
            .as_deref()
            .filter(|dir| !dir.trim().is_empty())
        {
            args.push("-OutputDirectory".to_string());
            args.push(quote_arg(dir));
        }

        push_value(&mut args, "-Version", self.version.as_deref());
        if self.prerelease {
            args.push("-Prerelease".to_string());
        }
        args
    }

    fn config_file(&self) -> Option<&Path> {
        self.common.config_file.as_deref()
    }

    fn verbosity(&self) -> Verbosity {
        self.common.verbosity.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateCommand {
    pub common: CommonOptions,
    /// `packages.config` or solution path.
    pub target: Option<String>,
    pub ids: Vec<String>,
    pub version: Option<String>,
    pub prerelease: bool,
    pub safe: bool,
}

impl UpdateCommand {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_target(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.ids.push(id.into());
        self
    }

    #[must_use]
    pub fn with_safe(mut self, enabled: bool) -> Self {
        self.safe = enabled;
        self
    }
}

common_builders!(UpdateCommand);

impl NugetCommand for UpdateCommand {
    fn verb(&self) -> &'static str {
        "update"
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn render(&self) -> Vec<String> {
        let mut args = Vec::new();
        self.common.render_into(&mut args);

        for id in self.ids.iter().filter(|id| !id.trim().is_empty()) {
            args.push("-Id".to_string());
            args.push(id.clone());
        }
        push_value(&mut args, "-Version", self.version.as_deref());
        if self.prerelease {
            args.push("-Prerelease".to_string());
        }
        if self.safe {
            args.push("-Safe".to_string());
        }
        args
    }

    fn config_file(&self) -> Option<&Path> {
        self.common.config_file.as_deref()
    }

    fn verbosity(&self) -> Verbosity {
        self.common.verbosity.unwrap_or_default()
    }
}
