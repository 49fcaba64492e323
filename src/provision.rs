use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::domain::MonthStamp;
use crate::error::HarvestError;

/// Creates the dated directory under a dataset root.
///
/// The root itself is never created; a missing root fails the job before any
/// network traffic. Re-provisioning within the same month returns the same
/// path and leaves the existing directory untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathProvisioner;

impl PathProvisioner {
    pub fn provision(&self, base: &Utf8Path) -> Result<Utf8PathBuf, HarvestError> {
        self.provision_for(base, MonthStamp::current())
    }

    pub fn provision_for(
        &self,
        base: &Utf8Path,
        stamp: MonthStamp,
    ) -> Result<Utf8PathBuf, HarvestError> {
        if !base.as_std_path().is_dir() {
            return Err(HarvestError::DirectoryProvision(format!(
                "dataset root {base} does not exist or is not a directory"
            )));
        }

        let target = base.join(stamp.to_string());
        match fs::create_dir(target.as_std_path()) {
            Ok(()) => debug!(path = %target, "created dated directory"),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                if !target.as_std_path().is_dir() {
                    return Err(HarvestError::DirectoryProvision(format!(
                        "{target} exists but is not a directory"
                    )));
                }
                debug!(path = %target, "dated directory already exists");
            }
            Err(err) => {
                return Err(HarvestError::DirectoryProvision(format!(
                    "create {target}: {err}"
                )));
            }
        }
        Ok(target)
    }
}
