use std::fmt;

use crate::cli::Cli;
use crate::error::PruneError;
use crate::filter::FilterSpec;

/// Top-level action chosen for the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Exact existence probe for one `repository:tag`.
    Check,
    /// Report matching images without touching them.
    Scan,
    Delete,
}

/// Immutable settings shared by the selector and the executor.
#[derive(Debug, Clone)]
pub struct PruneConfig {
    pub mode: Mode,
    pub filter: FilterSpec,
    pub delete_untagged: bool,
}

impl PruneConfig {
    /// Build the run configuration from CLI arguments
    ///
    /// `--check` wins over `--delete`. A scan without a filter covers every
    /// repository and tag.
    pub fn from_cli(cli: &Cli) -> Result<Self, PruneError> {
        let mode = if cli.check {
            Mode::Check
        } else if cli.delete {
            Mode::Delete
        } else {
            Mode::Scan
        };

        let filter = match cli.filter.as_deref().filter(|f| !f.is_empty()) {
            Some(raw) => raw.parse()?,
            None if mode == Mode::Scan => FilterSpec::match_all(),
            None => return Err(PruneError::MissingFilter),
        };

        Ok(PruneConfig {
            mode,
            filter,
            delete_untagged: cli.delete_untagged,
        })
    }

    pub fn deletes(&self) -> bool {
        self.mode == Mode::Delete
    }

    pub fn sweeps_untagged(&self) -> bool {
        self.delete_untagged && self.filter.sweeps_untagged()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where and how to reach the registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub url: String,
    pub project: String,
    pub credentials: Option<Credentials>,
}

impl RegistryConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        let credentials = (!cli.username.is_empty()).then(|| Credentials {
            username: cli.username.clone(),
            password: cli.password.clone(),
        });
        RegistryConfig {
            url: cli.registry_url.clone(),
            project: cli.project.clone(),
            credentials,
        }
    }
}
