//! Products available for bundling, discovered from the source root.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{FaboxError, NotFoundKind, Result};

/// Directories starting with this character are never products.
pub const RESERVED_PREFIX: char = '_';
/// Conventional tools directory living next to the products.
pub const RESERVED_NAME: &str = "bin";

#[derive(Debug, Clone)]
pub struct ProductCatalog {
    source_root: PathBuf,
}

impl ProductCatalog {
    pub fn new(source_root: PathBuf) -> Self {
        Self { source_root }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Product names, sorted. A missing source root has no products.
    pub fn list_products(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.source_root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(root = %self.source_root.display(), "source root does not exist");
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(FaboxError::io(
                    format!("Failed to read source root {}", self.source_root.display()),
                    err,
                ));
            }
        };

        let mut products = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| {
                FaboxError::io(
                    format!("Failed to read entry in {}", self.source_root.display()),
                    err,
                )
            })?;
            // Follows symlinks: a linked product tree is still a product.
            if !entry.path().is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if is_reserved(&name) {
                continue;
            }
            products.push(name);
        }

        products.sort();
        Ok(products)
    }

    pub fn contains(&self, product: &str) -> Result<bool> {
        Ok(self.list_products()?.iter().any(|p| p == product))
    }

    /// Source tree of a listed product.
    pub fn source_dir(&self, product: &str) -> Result<PathBuf> {
        if !self.contains(product)? {
            return Err(FaboxError::not_found(NotFoundKind::Product, product));
        }
        Ok(self.source_root.join(product))
    }
}

fn is_reserved(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX) || name.starts_with('.') || name == RESERVED_NAME
}
