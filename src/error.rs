use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarvestError {
    #[error("cannot provision dated directory: {0}")]
    DirectoryProvision(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("archive fetch failed: {0}")]
    Fetch(String),

    #[error("archive extraction failed: {0}")]
    Extract(String),

    #[error("portal request failed: {0}")]
    PortalHttp(String),

    #[error("portal returned status {status}: {message}")]
    PortalStatus { status: u16, message: String },

    #[error("missing config file gis-harvest.json in current directory or user config dir")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid portal URL: {0}")]
    InvalidUrl(String),

    #[error("invalid resource name: {0}")]
    InvalidResourceName(String),

    #[error("invalid month stamp (expected YYYY_MM): {0}")]
    InvalidMonthStamp(String),

    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

/// Pipeline stage of a fetch job, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Provision,
    Authenticate,
    Fetch,
    Extract,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Provision => write!(f, "provision"),
            Stage::Authenticate => write!(f, "authenticate"),
            Stage::Fetch => write!(f, "fetch"),
            Stage::Extract => write!(f, "extract"),
        }
    }
}

/// Terminal failure of a job: the stage that stopped it and why.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {cause}")]
pub struct JobFailure {
    pub stage: Stage,
    #[source]
    pub cause: HarvestError,
}

impl JobFailure {
    pub fn new(stage: Stage, cause: HarvestError) -> Self {
        Self { stage, cause }
    }
}
