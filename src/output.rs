use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::models::{ActionOutcome, Candidate, Digest, RunSummary};

/// Install the JSON logger on stdout. `RUST_LOG` overrides `level`.
pub fn init_logging(level: LevelFilter) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stdout),
        )
        .with(filter)
        .try_init()?;

    Ok(())
}

/// One record per selected tag
pub fn report_candidate(candidate: &Candidate, delete: bool, outcome: &ActionOutcome) {
    warn!(
        repository = %candidate.repository,
        tag = %candidate.tag,
        delete,
        fullname = %candidate.fullname(),
        digest = %candidate.digest,
        outcome = %outcome,
        "image found"
    );
}

pub fn report_untagged(repository: &str, digest: &Digest, delete: bool, outcome: &ActionOutcome) {
    warn!(
        %repository,
        %digest,
        delete,
        outcome = %outcome,
        "untagged image"
    );
}

pub fn report_summary(summary: &RunSummary, delete: bool) {
    info!(
        repositories = summary.repositories,
        candidates = summary.candidates,
        deleted = summary.deleted,
        failed = summary.failed,
        malformed = summary.malformed,
        untagged_found = summary.untagged_found,
        untagged_deleted = summary.untagged_deleted,
        untagged_failed = summary.untagged_failed,
        delete,
        "run complete"
    );
}
