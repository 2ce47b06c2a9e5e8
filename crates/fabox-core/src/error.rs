//! Error taxonomy for bundle, deploy and rollback operations.
//!
//! Discovery (listing products, bundles, deployed versions) treats missing
//! directories as empty results. Everything that mutates the filesystem
//! reports a phase-tagged error so a failure always names the step that
//! broke.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FaboxError>;

#[derive(Debug, Error)]
pub enum FaboxError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: NotFoundKind, name: String },

    #[error("build failed during {phase}: {message}")]
    BuildFailure { phase: BuildPhase, message: String },

    #[error("deploy failed during {phase}: {message}")]
    DeployFailure { phase: DeployPhase, message: String },

    #[error("rollback of '{product}' failed: {reason}")]
    RollbackFailure { product: String, reason: String },

    /// The operator typed the abort sentinel at a prompt.
    #[error("aborted by user")]
    UserAbort,

    #[error("invalid bundle name '{0}'")]
    InvalidBundleName(String),

    #[error("invalid {what} '{value}': {reason}")]
    InvalidName {
        what: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl FaboxError {
    pub fn not_found(kind: NotFoundKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn build(phase: BuildPhase, err: anyhow::Error) -> Self {
        Self::BuildFailure {
            phase,
            message: format!("{err:#}"),
        }
    }

    pub(crate) fn deploy(phase: DeployPhase, err: anyhow::Error) -> Self {
        Self::DeployFailure {
            phase,
            message: format!("{err:#}"),
        }
    }

    pub(crate) fn rollback(product: &str, reason: impl Into<String>) -> Self {
        Self::RollbackFailure {
            product: product.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn is_user_abort(&self) -> bool {
        matches!(self, Self::UserAbort)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    Product,
    Tag,
    Bundle,
    Slot,
}

impl fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotFoundKind::Product => "product",
            NotFoundKind::Tag => "tag",
            NotFoundKind::Bundle => "bundle",
            NotFoundKind::Slot => "slot",
        })
    }
}

/// Steps of [`crate::build::BundleBuilder::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Validate,
    Stage,
    Strip,
    Number,
    Stamp,
    Archive,
    Store,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildPhase::Validate => "validation",
            BuildPhase::Stage => "staging",
            BuildPhase::Strip => "metadata stripping",
            BuildPhase::Number => "build numbering",
            BuildPhase::Stamp => "version stamping",
            BuildPhase::Archive => "archiving",
            BuildPhase::Store => "archive store write",
        })
    }
}

/// Steps of [`crate::deploy::DeployEngine::deploy`], in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployPhase {
    Lock,
    Copy,
    Extract,
    DiscardPrevious,
    DemoteLive,
    Promote,
    Cleanup,
    Permissions,
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeployPhase::Lock => "slot lock",
            DeployPhase::Copy => "archive copy",
            DeployPhase::Extract => "extraction",
            DeployPhase::DiscardPrevious => "previous slot removal",
            DeployPhase::DemoteLive => "live slot demotion",
            DeployPhase::Promote => "new slot promotion",
            DeployPhase::Cleanup => "archive cleanup",
            DeployPhase::Permissions => "ownership and permissions",
        })
    }
}
