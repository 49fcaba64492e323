use tracing::{debug, info};

use crate::config::PortalSettings;
use crate::credentials::Credentials;
use crate::error::HarvestError;
use crate::form::{FormMethod, parse_forms};
use crate::portal::{PortalPage, PortalSession};

/// Logs the session in through the portal's login form.
///
/// Submission alone is not trusted: the response must carry the configured
/// success marker, or, without one, must no longer show the password field.
pub fn authenticate<S: PortalSession + ?Sized>(
    session: &S,
    portal: &PortalSettings,
    credentials: &Credentials,
) -> Result<(), HarvestError> {
    let page = session
        .get_page(&portal.login_url)
        .map_err(|err| HarvestError::Authentication(err.to_string()))?;
    if !page.is_success() {
        return Err(HarvestError::Authentication(format!(
            "login page {} returned status {}",
            page.url, page.status
        )));
    }

    let mut form = parse_forms(&page.body)
        .into_iter()
        .nth(portal.form_index)
        .ok_or_else(|| {
            HarvestError::Authentication(format!(
                "no login form #{} on {}",
                portal.form_index, page.url
            ))
        })?;

    for (field, value) in [
        (&portal.email_field, &credentials.email),
        (&portal.password_field, &credentials.password),
    ] {
        if !form.fill(field, value) {
            return Err(HarvestError::Authentication(format!(
                "login form has no field {field}"
            )));
        }
    }

    let action = match form.action.as_deref() {
        Some(action) => page.url.join(action).map_err(|err| {
            HarvestError::Authentication(format!("bad form action {action}: {err}"))
        })?,
        None => page.url.clone(),
    };
    if form.method == FormMethod::Get {
        debug!(action = %action, "login form declares GET; posting instead");
    }
    debug!(action = %action, "submitting login form");

    // Credentials never travel in a query string.
    let response = session
        .submit_form(FormMethod::Post, &action, &form.submission())
        .map_err(|err| HarvestError::Authentication(err.to_string()))?;
    verify_login(&response, portal)?;
    info!(url = %response.url, "portal login accepted");
    Ok(())
}

fn verify_login(page: &PortalPage, portal: &PortalSettings) -> Result<(), HarvestError> {
    if !page.is_success() {
        return Err(HarvestError::Authentication(format!(
            "login submission returned status {}",
            page.status
        )));
    }
    let accepted = match &portal.success_marker {
        Some(marker) => page.body.contains(marker.as_str()),
        None => !shows_login_form(&page.body, portal),
    };
    if !accepted {
        return Err(HarvestError::Authentication(
            "login rejected: portal did not show an authenticated page".to_string(),
        ));
    }
    Ok(())
}

/// True when `body` still offers the portal's password field.
pub fn shows_login_form(body: &str, portal: &PortalSettings) -> bool {
    parse_forms(body)
        .iter()
        .any(|form| form.has_field(&portal.password_field))
}
