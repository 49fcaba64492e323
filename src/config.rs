use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::credentials::{DEFAULT_EMAIL_VAR, DEFAULT_PASSWORD_VAR, EnvCredentials};
use crate::domain::{DatasetDescriptor, ResourceName};
use crate::error::HarvestError;
use crate::layout::DEFAULT_CURRENT_DIR;

pub const CONFIG_FILE_NAME: &str = "gis-harvest.json";
pub const DEFAULT_LOGIN_URL: &str = "https://rdw.sandag.org/Account/Login";
pub const DEFAULT_BASE_URL: &str = "https://rdw.sandag.org/";
pub const DEFAULT_LISTING_PATH: &str = "gisdtview.aspx";
pub const DEFAULT_FETCH_PATH: &str = "GetFSFile.aspx";
pub const DEFAULT_EMAIL_FIELD: &str = "ctl00$MainContent$Email";
pub const DEFAULT_PASSWORD_FIELD: &str = "ctl00$MainContent$Password";
pub const DEFAULT_CATEGORY: &str = "Parcel";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub portal: Option<PortalEntry>,
    #[serde(default)]
    pub credentials: Option<CredentialEntry>,
    #[serde(default)]
    pub current_dir_name: Option<String>,
    #[serde(default)]
    pub default_category: Option<String>,
    #[serde(default)]
    pub datasets: Vec<DatasetEntry>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PortalEntry {
    #[serde(default)]
    pub login_url: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub listing_path: Option<String>,
    #[serde(default)]
    pub fetch_path: Option<String>,
    #[serde(default)]
    pub email_field: Option<String>,
    #[serde(default)]
    pub password_field: Option<String>,
    #[serde(default)]
    pub form_index: Option<usize>,
    #[serde(default)]
    pub success_marker: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CredentialEntry {
    #[serde(default)]
    pub email_env: Option<String>,
    #[serde(default)]
    pub password_env: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DatasetEntry {
    /// `"<base directory>/<archive name>"`, fetched from the default category.
    Shorthand(String),
    Detailed(DatasetEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DatasetEntryObject {
    pub base_directory: String,
    pub resource: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Fixed endpoints and form details of the remote portal.
#[derive(Debug, Clone)]
pub struct PortalSettings {
    pub login_url: Url,
    pub base_url: Url,
    pub listing_path: String,
    pub fetch_path: String,
    pub email_field: String,
    pub password_field: String,
    pub form_index: usize,
    pub success_marker: Option<String>,
    pub timeout: Duration,
}

impl PortalSettings {
    pub fn new(login_url: Url, base_url: Url) -> Self {
        Self {
            login_url,
            base_url,
            listing_path: DEFAULT_LISTING_PATH.to_string(),
            fetch_path: DEFAULT_FETCH_PATH.to_string(),
            email_field: DEFAULT_EMAIL_FIELD.to_string(),
            password_field: DEFAULT_PASSWORD_FIELD.to_string(),
            form_index: 0,
            success_marker: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn listing_url(&self, category: &str) -> Result<Url, HarvestError> {
        let mut url = join_url(&self.base_url, &self.listing_path)?;
        url.query_pairs_mut().append_pair("dir", category);
        Ok(url)
    }

    pub fn fetch_url(&self, category: &str, resource: &ResourceName) -> Result<Url, HarvestError> {
        let mut url = join_url(&self.base_url, &self.fetch_path)?;
        url.query_pairs_mut()
            .append_pair("dir", category)
            .append_pair("Name", resource.as_str());
        Ok(url)
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub portal: PortalSettings,
    pub credentials: EnvCredentials,
    pub current_dir_name: String,
    pub datasets: Vec<DatasetDescriptor>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, HarvestError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => Self::default_path().ok_or(HarvestError::MissingConfig)?,
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| HarvestError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| HarvestError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    /// `./gis-harvest.json`, falling back to the per-user config directory.
    pub fn default_path() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        ProjectDirs::from("", "", "gis-harvest")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, HarvestError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let portal = resolve_portal(config.portal.unwrap_or_default())?;

        let credentials = config.credentials.unwrap_or_default();
        let credentials = EnvCredentials::new(
            credentials
                .email_env
                .unwrap_or_else(|| DEFAULT_EMAIL_VAR.to_string()),
            credentials
                .password_env
                .unwrap_or_else(|| DEFAULT_PASSWORD_VAR.to_string()),
        );

        let current_dir_name = config
            .current_dir_name
            .unwrap_or_else(|| DEFAULT_CURRENT_DIR.to_string());
        if current_dir_name.trim().is_empty() || current_dir_name.contains(['/', '\\']) {
            return Err(HarvestError::ConfigParse(format!(
                "current_dir_name must be a single directory name: {current_dir_name:?}"
            )));
        }

        let default_category = config
            .default_category
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        let datasets = config
            .datasets
            .into_iter()
            .map(|entry| match entry {
                DatasetEntry::Shorthand(value) => resolve_shorthand(&value, &default_category),
                DatasetEntry::Detailed(obj) => Ok(DatasetDescriptor {
                    base_directory: Utf8PathBuf::from(obj.base_directory),
                    category: obj.category.unwrap_or_else(|| default_category.clone()),
                    resource: obj.resource.parse()?,
                }),
            })
            .collect::<Result<Vec<_>, HarvestError>>()?;

        Ok(ResolvedConfig {
            schema_version,
            portal,
            credentials,
            current_dir_name,
            datasets,
        })
    }
}

fn resolve_portal(entry: PortalEntry) -> Result<PortalSettings, HarvestError> {
    let login_url = parse_url(entry.login_url.as_deref().unwrap_or(DEFAULT_LOGIN_URL))?;
    let base_url = parse_url(entry.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;
    let mut portal = PortalSettings::new(login_url, base_url);
    if let Some(value) = entry.listing_path {
        portal.listing_path = value;
    }
    if let Some(value) = entry.fetch_path {
        portal.fetch_path = value;
    }
    if let Some(value) = entry.email_field {
        portal.email_field = value;
    }
    if let Some(value) = entry.password_field {
        portal.password_field = value;
    }
    if let Some(value) = entry.form_index {
        portal.form_index = value;
    }
    portal.success_marker = entry.success_marker.filter(|marker| !marker.is_empty());
    if let Some(secs) = entry.timeout_secs {
        portal.timeout = Duration::from_secs(secs.max(1));
    }
    // Endpoint paths must join onto the base URL.
    join_url(&portal.base_url, &portal.listing_path)?;
    join_url(&portal.base_url, &portal.fetch_path)?;
    Ok(portal)
}

fn resolve_shorthand(value: &str, category: &str) -> Result<DatasetDescriptor, HarvestError> {
    let path = Utf8PathBuf::from(value.trim());
    let resource = path
        .file_name()
        .ok_or_else(|| HarvestError::InvalidResourceName(value.to_string()))?
        .parse::<ResourceName>()?;
    let base_directory = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .map(|parent| parent.to_path_buf())
        .ok_or_else(|| {
            HarvestError::ConfigParse(format!("dataset {value:?} has no base directory"))
        })?;
    Ok(DatasetDescriptor {
        base_directory,
        category: category.to_string(),
        resource,
    })
}

fn parse_url(value: &str) -> Result<Url, HarvestError> {
    Url::parse(value).map_err(|err| HarvestError::InvalidUrl(format!("{value}: {err}")))
}

fn join_url(base: &Url, path: &str) -> Result<Url, HarvestError> {
    base.join(path)
        .map_err(|err| HarvestError::InvalidUrl(format!("{base} + {path}: {err}")))
}
