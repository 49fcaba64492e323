use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use crate::auth::shows_login_form;
use crate::config::PortalSettings;
use crate::domain::ResourceName;
use crate::error::HarvestError;
use crate::portal::{DownloadInfo, PortalSession};

#[derive(Debug, Clone)]
pub struct FetchedArchive {
    pub path: Utf8PathBuf,
    pub info: DownloadInfo,
}

/// Downloads `resource` from `category` into `resolved_dir`, overwriting any
/// earlier download of the same name.
///
/// A rejected body stays on disk next to the other archives.
pub fn fetch<S: PortalSession + ?Sized>(
    session: &S,
    portal: &PortalSettings,
    category: &str,
    resolved_dir: &Utf8Path,
    resource: &ResourceName,
) -> Result<FetchedArchive, HarvestError> {
    let listing_url = portal.listing_url(category).map_err(fetch_error)?;
    let listing = session.get_page(&listing_url).map_err(fetch_error)?;
    if !listing.is_success() {
        return Err(HarvestError::Fetch(format!(
            "listing {} returned status {}",
            listing.url, listing.status
        )));
    }
    if shows_login_form(&listing.body, portal) {
        return Err(HarvestError::Fetch(format!(
            "listing {} asks for a login; session is not authenticated",
            listing.url
        )));
    }

    let fetch_url = portal.fetch_url(category, resource).map_err(fetch_error)?;
    let path = resolved_dir.join(resource.as_str());
    debug!(url = %fetch_url, path = %path, "downloading archive");
    let info = session
        .download(&fetch_url, path.as_std_path())
        .map_err(fetch_error)?;

    if info.bytes == 0 {
        return Err(HarvestError::Fetch(format!(
            "portal returned an empty body for {resource}"
        )));
    }
    if info.is_html() {
        warn!(path = %path, "portal answered with an HTML page instead of an archive");
        return Err(HarvestError::Fetch(format!(
            "portal returned an HTML page for {resource} (saved to {path})"
        )));
    }

    Ok(FetchedArchive { path, info })
}

fn fetch_error(err: HarvestError) -> HarvestError {
    match err {
        HarvestError::Fetch(_) => err,
        other => HarvestError::Fetch(other.to_string()),
    }
}
