//! Deploy coordination: the slot layout, deploys, rollbacks and listings.

pub mod executor;
pub mod layout;
pub mod rollback;
pub mod versions;

pub use executor::{DeployEngine, DeployReport};
pub use layout::SlotLayout;
pub use rollback::{RollbackEngine, RollbackReport};
pub use versions::{DeployedVersion, DeployedVersions, SlotFilter, SlotState};
