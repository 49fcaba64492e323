#![allow(dead_code)]

pub mod portal_server;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use gis_harvest::app::{ProgressEvent, ProgressSink};
use gis_harvest::config::PortalSettings;
use gis_harvest::error::HarvestError;
use gis_harvest::form::FormMethod;
use gis_harvest::portal::{DownloadInfo, PortalConnector, PortalPage, PortalSession};
use reqwest::Url;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const LOGIN_HTML: &str = r#"
<html><body>
<form method="post" action="./Login" id="ctl01">
  <input type="hidden" name="__VIEWSTATE" value="vs-token" />
  <input type="hidden" name="__EVENTVALIDATION" value="ev-token" />
  <input name="ctl00$MainContent$Email" type="text" />
  <input name="ctl00$MainContent$Password" type="password" />
  <input type="submit" name="ctl00$MainContent$LoginButton" value="Log in" />
</form>
</body></html>
"#;

pub const HOME_HTML: &str = r#"
<html><body><h1>Welcome back</h1><a href="/Account/Logoff">Log off</a></body></html>
"#;
pub const LISTING_HTML: &str = r#"
<html><body><table><tr><td>Assessor_Book.zip</td></tr></table></body></html>
"#;

pub fn portal_settings() -> PortalSettings {
    PortalSettings::new(
        Url::parse("https://portal.test/Account/Login").unwrap(),
        Url::parse("https://portal.test/").unwrap(),
    )
}

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub login_body: String,
    pub submit_fails: bool,
    pub after_login_body: String,
    pub listing_body: String,
    /// Archive bytes keyed by the `Name` query parameter.
    pub archives: HashMap<String, Vec<u8>>,
    pub content_type: Option<String>,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            login_body: LOGIN_HTML.to_string(),
            submit_fails: false,
            after_login_body: HOME_HTML.to_string(),
            listing_body: LISTING_HTML.to_string(),
            archives: HashMap::new(),
            content_type: Some("application/x-zip-compressed".to_string()),
        }
    }
}

impl MockBehavior {
    pub fn with_archive(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.archives.insert(name.to_string(), bytes);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(Url),
    Submit {
        method: FormMethod,
        url: Url,
        fields: Vec<(String, String)>,
    },
    Download(Url),
}

#[derive(Clone, Default)]
pub struct MockPortal {
    pub behavior: Arc<MockBehavior>,
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub connects: Arc<Mutex<usize>>,
}

impl MockPortal {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior: Arc::new(behavior),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn connect_count(&self) -> usize {
        *self.connects.lock().unwrap()
    }

    pub fn download_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Download(_)))
            .count()
    }

    pub fn submit_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Submit { .. }))
            .count()
    }
}

impl PortalConnector for MockPortal {
    type Session = MockPortal;

    fn connect(&self) -> Result<Self::Session, HarvestError> {
        *self.connects.lock().unwrap() += 1;
        Ok(self.clone())
    }
}

impl PortalSession for MockPortal {
    fn get_page(&self, url: &Url) -> Result<PortalPage, HarvestError> {
        self.calls.lock().unwrap().push(Call::Get(url.clone()));
        let body = if url.path().ends_with("/Account/Login") {
            self.behavior.login_body.clone()
        } else {
            self.behavior.listing_body.clone()
        };
        Ok(PortalPage {
            url: url.clone(),
            status: 200,
            body,
        })
    }

    fn submit_form(
        &self,
        method: FormMethod,
        url: &Url,
        fields: &[(String, String)],
    ) -> Result<PortalPage, HarvestError> {
        self.calls.lock().unwrap().push(Call::Submit {
            method,
            url: url.clone(),
            fields: fields.to_vec(),
        });
        if self.behavior.submit_fails {
            return Err(HarvestError::PortalHttp("connection reset by peer".to_string()));
        }
        Ok(PortalPage {
            url: Url::parse("https://portal.test/").unwrap(),
            status: 200,
            body: self.behavior.after_login_body.clone(),
        })
    }

    fn download(&self, url: &Url, destination: &Path) -> Result<DownloadInfo, HarvestError> {
        self.calls.lock().unwrap().push(Call::Download(url.clone()));
        let name = url
            .query_pairs()
            .find(|(key, _)| key == "Name")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();
        let bytes = self
            .behavior
            .archives
            .get(&name)
            .cloned()
            .unwrap_or_default();
        fs::write(destination, &bytes).map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        Ok(DownloadInfo {
            bytes: bytes.len() as u64,
            content_type: self.behavior.content_type.clone(),
        })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub messages: RefCell<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.borrow_mut().push(event.message);
    }
}
