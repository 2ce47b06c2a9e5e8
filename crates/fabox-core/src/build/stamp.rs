//! The one-line `version.txt` marker written into every bundle.
//!
//! Format: `Tag: <tag> - Build <build> - Built: <timestamp>`. Deployed slots
//! keep the file, so listing deployed versions is a matter of reading it.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::bundle::{BuildNumber, BundleTag};

pub const VERSION_FILE: &str = "version.txt";

/// ctime-style rendering, e.g. `Sat Jan  1 12:00:00 2022`.
const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionStamp {
    pub tag: String,
    pub build: String,
    pub built: String,
}

impl VersionStamp {
    pub fn new<Tz>(tag: &BundleTag, build: BuildNumber, built_at: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self {
            tag: tag.to_string(),
            build: build.to_string(),
            built: built_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "Tag: {} - Build {} - Built: {}",
            self.tag, self.build, self.built
        )
    }

    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.trim().strip_prefix("Tag: ")?;
        let (tag, rest) = rest.split_once(" - Build ")?;
        let (build, built) = rest.split_once(" - Built: ")?;
        Some(Self {
            tag: tag.to_string(),
            build: build.to_string(),
            built: built.to_string(),
        })
    }

    pub fn write_to_dir(&self, dir: &Path) -> anyhow::Result<()> {
        let path = dir.join(VERSION_FILE);
        std::fs::write(&path, format!("{}\n", self.render()))
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Read the stamp of a bundle or slot directory, if it has one.
    pub fn read_from_dir(dir: &Path) -> anyhow::Result<Option<Self>> {
        let path = dir.join(VERSION_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!("Failed to read {}", path.display())));
            }
        };
        Ok(content
            .lines()
            .filter(|line| line.contains("Tag"))
            .find_map(Self::parse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn renders_marker_line() {
        let tag = BundleTag::new("site", "220101").expect("tag");
        let built = Utc.with_ymd_and_hms(2022, 1, 1, 9, 5, 3).unwrap();
        let stamp = VersionStamp::new(&tag, BuildNumber::FIRST, &built);
        assert_eq!(
            stamp.render(),
            "Tag: site_220101 - Build 001 - Built: Sat Jan  1 09:05:03 2022"
        );
        assert_eq!(VersionStamp::parse(&stamp.render()), Some(stamp));
    }

    #[test]
    fn parse_rejects_other_lines() {
        assert_eq!(VersionStamp::parse("hello"), None);
        assert_eq!(VersionStamp::parse("Tag: site_1 without build"), None);
    }

    #[test]
    fn read_from_dir_without_marker() {
        let tmp = tempfile::TempDir::new().expect("tempdir should succeed");
        assert_eq!(VersionStamp::read_from_dir(tmp.path()).expect("read"), None);
    }
}
