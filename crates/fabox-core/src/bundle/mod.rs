//! Bundle identity: product-scoped tags, build numbers and archive names.
//!
//! An archive is named `<product>_<label>--<build><ext>`. The name is the
//! only identity a bundle has on disk, so parsing and formatting must
//! round-trip exactly.

pub mod store;

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{FaboxError, Result};
use crate::types::ArchiveFormat;

pub use store::{BundleStore, TagSummary};

/// Separator between the tag and the build number in archive names.
pub const BUILD_DELIMITER: &str = "--";
/// Separator between the product and the tag label.
pub const PRODUCT_DELIMITER: char = '_';
/// Minimum number of digits of a rendered build number.
pub const BUILD_WIDTH: usize = 3;

/// Product-scoped tag, e.g. `site_220101`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BundleTag {
    product: String,
    label: String,
}

impl BundleTag {
    /// Compose a tag, rejecting parts that would break name parsing.
    pub fn new(product: &str, label: &str) -> Result<Self> {
        validate_product_name(product)?;
        validate_label(label)?;
        Ok(Self {
            product: product.to_string(),
            label: label.to_string(),
        })
    }

    /// Parse `product_label`, splitting on the first underscore.
    pub fn parse(tag: &str) -> Result<Self> {
        let (product, label) = tag
            .split_once(PRODUCT_DELIMITER)
            .ok_or_else(|| FaboxError::InvalidName {
                what: "tag",
                value: tag.to_string(),
                reason: "expected <product>_<label>",
            })?;
        Self::new(product, label)
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for BundleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.product, PRODUCT_DELIMITER, self.label)
    }
}

impl Serialize for BundleTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Build counter, rendered zero-padded to at least [`BUILD_WIDTH`] digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuildNumber(u32);

impl BuildNumber {
    pub const FIRST: BuildNumber = BuildNumber(1);

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// The following build, or `None` once the counter is exhausted.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Parse the canonical rendering only, so that `parse(render(n)) == n`
    /// and `render(parse(s)) == s` both hold.
    pub fn parse(text: &str) -> Option<Self> {
        if text.len() < BUILD_WIDTH || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u32 = text.parse().ok()?;
        let number = Self(value);
        (number.to_string() == text).then_some(number)
    }
}

impl fmt::Display for BuildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = BUILD_WIDTH)
    }
}

impl Serialize for BuildNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single immutable archived build of a product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Bundle {
    pub tag: BundleTag,
    pub build: BuildNumber,
    #[serde(skip)]
    pub format: ArchiveFormat,
}

impl Bundle {
    pub fn new(tag: BundleTag, build: BuildNumber, format: ArchiveFormat) -> Self {
        Self { tag, build, format }
    }

    pub fn product(&self) -> &str {
        self.tag.product()
    }

    /// `tag + "--" + build + extension`.
    pub fn filename(&self) -> String {
        format!(
            "{}{}{}{}",
            self.tag,
            BUILD_DELIMITER,
            self.build,
            self.format.extension()
        )
    }

    /// Parse an archive file name, splitting on the last `--`.
    pub fn parse_filename(name: &str) -> Result<Self> {
        let invalid = || FaboxError::InvalidBundleName(name.to_string());

        let format = ArchiveFormat::from_file_name(name).ok_or_else(invalid)?;
        let stem = name
            .strip_suffix(format.extension())
            .ok_or_else(invalid)?;
        let (tag, build) = stem.rsplit_once(BUILD_DELIMITER).ok_or_else(invalid)?;
        let build = BuildNumber::parse(build).ok_or_else(invalid)?;
        let tag = BundleTag::parse(tag).map_err(|_| invalid())?;

        Ok(Self { tag, build, format })
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename())
    }
}

pub(crate) fn validate_product_name(product: &str) -> Result<()> {
    let invalid = |reason| FaboxError::InvalidName {
        what: "product",
        value: product.to_string(),
        reason,
    };
    if product.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if product.contains(PRODUCT_DELIMITER) {
        return Err(invalid("must not contain '_'"));
    }
    check_path_safe(product).map_err(invalid)
}

fn validate_label(label: &str) -> Result<()> {
    let invalid = |reason| FaboxError::InvalidName {
        what: "tag name",
        value: label.to_string(),
        reason,
    };
    if label.is_empty() {
        return Err(invalid("must not be empty"));
    }
    check_path_safe(label).map_err(invalid)
}

fn check_path_safe(part: &str) -> std::result::Result<(), &'static str> {
    if part.contains(BUILD_DELIMITER) {
        return Err("must not contain '--'");
    }
    if part.starts_with('.') || part.contains(['/', '\\']) {
        return Err("must not contain path separators or start with '.'");
    }
    if part.chars().any(char::is_whitespace) {
        return Err("must not contain whitespace");
    }
    Ok(())
}
