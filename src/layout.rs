use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{MonthStamp, ResourceName};

pub const DEFAULT_CURRENT_DIR: &str = "Current";

/// On-disk layout under one dataset root:
/// `base/YYYY_MM/<archive>` for raw downloads, `base/<current>/` for unpacked contents.
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    base: Utf8PathBuf,
    current_dir_name: String,
}

impl DatasetLayout {
    pub fn new(base: impl Into<Utf8PathBuf>, current_dir_name: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            current_dir_name: current_dir_name.into(),
        }
    }

    pub fn base(&self) -> &Utf8Path {
        &self.base
    }

    pub fn month_dir(&self, stamp: MonthStamp) -> Utf8PathBuf {
        self.base.join(stamp.to_string())
    }

    pub fn archive_path(&self, stamp: MonthStamp, resource: &ResourceName) -> Utf8PathBuf {
        self.month_dir(stamp).join(resource.as_str())
    }

    pub fn current_dir(&self) -> Utf8PathBuf {
        self.base.join(&self.current_dir_name)
    }
}
