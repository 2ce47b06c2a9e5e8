//! Fabox Core Library
//!
//! Builds numbered bundle archives from product source trees, deploys
//! them into a live/previous/rollback slot triple and rolls back on demand.

pub mod archive;
pub mod build;
pub mod bundle;
pub mod catalog;
pub mod config;
pub mod context;
pub mod deploy;
pub mod error;
pub mod fs;
pub mod select;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigStore, FaboxConfig};
    pub use crate::context::AppContext;

    // Bundles
    pub use crate::build::{BuildReport, BundleBuilder, VersionStamp};
    pub use crate::bundle::{BuildNumber, Bundle, BundleStore, BundleTag, TagSummary};
    pub use crate::catalog::ProductCatalog;

    // Deploy
    pub use crate::deploy::{
        DeployEngine, DeployReport, DeployedVersion, DeployedVersions, RollbackEngine,
        RollbackReport, SlotFilter, SlotLayout, SlotState,
    };

    // Errors and shared types
    pub use crate::error::{BuildPhase, DeployPhase, FaboxError, NotFoundKind, Result};
    pub use crate::fs::{FileOps, LocalFileOps, PermissionSpec};
    pub use crate::select::{Selection, select_one};
    pub use crate::types::{ArchiveFormat, Slot, StepFailurePolicy};
}
