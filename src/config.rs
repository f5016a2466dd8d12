use std::env;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

/// How chatty the tool is. Passed explicitly to whatever reports diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    const LEVELS: [Verbosity; 5] = [
        Verbosity::Error,
        Verbosity::Warn,
        Verbosity::Info,
        Verbosity::Debug,
        Verbosity::Trace,
    ];

    /// Start at [`Verbosity::Info`], one step up per `-v`, one down per `-q`.
    pub fn from_flags(verbose: u8, quiet: u8) -> Self {
        let base = Verbosity::Info as i32;
        let index = (base + i32::from(verbose) - i32::from(quiet)).clamp(0, 4);
        Self::LEVELS[index as usize]
    }

    /// Whether external tool output is shown even when the tool succeeded.
    pub fn shows_tool_output(self) -> bool {
        self > Verbosity::Info
    }

    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Error => LevelFilter::ERROR,
            Verbosity::Warn => LevelFilter::WARN,
            Verbosity::Info => LevelFilter::INFO,
            Verbosity::Debug => LevelFilter::DEBUG,
            Verbosity::Trace => LevelFilter::TRACE,
        }
    }
}

/// Settings shared by every operation of one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub verbosity: Verbosity,
    /// Directory that holds this process's scratch files
    pub scratch_dir: PathBuf,
}

impl Settings {
    pub fn new(verbosity: Verbosity, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            verbosity,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Settings using the scratch directory named by the environment.
    pub fn from_env(verbosity: Verbosity) -> Self {
        Self::new(verbosity, default_scratch_dir())
    }
}

/// `$STASH_TMP`, else `$TMPDIR`, else `/tmp/$USER/stash`.
pub fn default_scratch_dir() -> PathBuf {
    scratch_dir_from(|key| env::var(key).ok())
}

fn scratch_dir_from<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());
    if let Some(dir) = non_empty("STASH_TMP").or_else(|| non_empty("TMPDIR")) {
        return PathBuf::from(dir);
    }
    let user = non_empty("USER").unwrap_or_else(|| "unknown".to_string());
    Path::new("/tmp").join(user).join("stash")
}
