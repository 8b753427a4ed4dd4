use clap::{Parser, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

/// regprune — audit and prune images in a Docker Registry V2 / GCR instance
#[derive(Parser, Debug)]
#[command(name = "regprune", version, about)]
pub struct Cli {
    /// The Docker Registry URL
    #[arg(
        long,
        alias = "registryURL",
        env = "REGPRUNE_REGISTRY_URL",
        default_value = "https://us.gcr.io"
    )]
    pub registry_url: String,

    /// The Docker project, if using a gcloud registry
    #[arg(long, env = "REGPRUNE_PROJECT", default_value = "")]
    pub project: String,

    /// Registry user name, use '_token' with a gcloud generated token
    #[arg(long, env = "REGPRUNE_USERNAME", default_value = "")]
    pub username: String,

    /// Registry password, e.g. the output of 'gcloud auth print-access-token'
    #[arg(
        long,
        env = "REGPRUNE_PASSWORD",
        default_value = "",
        hide_env_values = true,
        hide_default_value = true
    )]
    pub password: String,

    /// Log level
    #[arg(
        long,
        alias = "logLevel",
        env = "REGPRUNE_LOG_LEVEL",
        value_enum,
        default_value_t = LogLevel::Warn
    )]
    pub log_level: LogLevel,

    /// Delete the selected images
    #[arg(long, env = "REGPRUNE_DELETE")]
    pub delete: bool,

    /// Only check that the exact image:tag given in --filter exists
    #[arg(long, env = "REGPRUNE_CHECK")]
    pub check: bool,

    /// Also delete manifests with no tag. Only effective when the tag part of --filter is `.*`
    #[arg(long, alias = "deleteUntagged", env = "REGPRUNE_DELETE_UNTAGGED")]
    pub delete_untagged: bool,

    /// Filter formed with <repository>:<tag>; both parts are regular expressions except with --check
    #[arg(long, env = "REGPRUNE_FILTER")]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[value(alias = "warning")]
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}
