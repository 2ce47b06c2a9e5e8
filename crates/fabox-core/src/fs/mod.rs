//! Filesystem primitives shared across features.

pub mod lock;
pub mod ops;
pub mod permissions;
pub mod tree;
pub mod tree_hash;

pub use lock::SlotLock;
pub use ops::{FileOps, LocalFileOps};
pub use permissions::PermissionSpec;
pub use tree::{copy_tree, move_file, remove_path_if_exists, strip_named_dirs};
pub use tree_hash::hash_tree;
