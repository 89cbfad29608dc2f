mod paths;
mod process;

pub use paths::{AppPaths, AppPathsError, NUGET_EXE_NAME, ensure_parent_dir};
pub use process::{HideWindow, quote_arg, split_command_line};
