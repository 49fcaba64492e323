use std::fs::File;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};

use crate::error::HarvestError;
use crate::form::FormMethod;

/// A page as seen after redirects.
#[derive(Debug, Clone)]
pub struct PortalPage {
    pub url: Url,
    pub status: u16,
    pub body: String,
}

impl PortalPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadInfo {
    pub bytes: u64,
    pub content_type: Option<String>,
}

impl DownloadInfo {
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|value| value.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false)
    }
}

/// Browsing context that keeps cookies between the login and the downloads.
pub trait PortalSession {
    fn get_page(&self, url: &Url) -> Result<PortalPage, HarvestError>;
    fn submit_form(
        &self,
        method: FormMethod,
        url: &Url,
        fields: &[(String, String)],
    ) -> Result<PortalPage, HarvestError>;
    /// Writes the response body to `destination`, replacing any existing file.
    fn download(&self, url: &Url, destination: &Path) -> Result<DownloadInfo, HarvestError>;
}

/// Opens a fresh session for each job.
pub trait PortalConnector {
    type Session: PortalSession;

    fn connect(&self) -> Result<Self::Session, HarvestError>;
}

#[derive(Debug, Clone)]
pub struct HttpPortalConnector {
    timeout: Duration,
}

impl HttpPortalConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl PortalConnector for HttpPortalConnector {
    type Session = HttpPortalSession;

    fn connect(&self) -> Result<Self::Session, HarvestError> {
        HttpPortalSession::new(self.timeout)
    }
}

pub struct HttpPortalSession {
    client: Client,
}

impl HttpPortalSession {
    pub fn new(timeout: Duration) -> Result<Self, HarvestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("gis-harvest/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| HarvestError::PortalHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|err| HarvestError::PortalHttp(err.to_string()))?;
        Ok(Self { client })
    }

    fn send(request: RequestBuilder) -> Result<Response, HarvestError> {
        request.send().map_err(transport_error)
    }

    fn into_page(response: Response) -> Result<PortalPage, HarvestError> {
        let url = response.url().clone();
        let status = response.status().as_u16();
        let body = response.text().map_err(transport_error)?;
        Ok(PortalPage { url, status, body })
    }

    fn handle_status(response: Response) -> Result<Response, HarvestError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .map(|body| body.chars().take(200).collect())
            .unwrap_or_else(|_| "portal request failed".to_string());
        Err(HarvestError::PortalStatus { status, message })
    }
}

impl PortalSession for HttpPortalSession {
    fn get_page(&self, url: &Url) -> Result<PortalPage, HarvestError> {
        let response = Self::send(self.client.get(url.clone()))?;
        Self::into_page(response)
    }

    fn submit_form(
        &self,
        method: FormMethod,
        url: &Url,
        fields: &[(String, String)],
    ) -> Result<PortalPage, HarvestError> {
        let request = match method {
            FormMethod::Post => self.client.post(url.clone()).form(fields),
            FormMethod::Get => self.client.get(url.clone()).query(fields),
        };
        let response = Self::send(request)?;
        Self::into_page(response)
    }

    fn download(&self, url: &Url, destination: &Path) -> Result<DownloadInfo, HarvestError> {
        let response = Self::send(self.client.get(url.clone()))?;
        let mut response = Self::handle_status(response)?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut file =
            File::create(destination).map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        let bytes = std::io::copy(&mut response, &mut file)
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        Ok(DownloadInfo {
            bytes,
            content_type,
        })
    }
}

/// Drops the query string from the failing URL; form fields may be in it.
fn transport_error(err: reqwest::Error) -> HarvestError {
    let target = err.url().map(|url| {
        let mut url = url.clone();
        url.set_query(None);
        url
    });
    let err = err.without_url();
    match target {
        Some(url) => HarvestError::PortalHttp(format!("{url}: {err}")),
        None => HarvestError::PortalHttp(err.to_string()),
    }
}
