use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{info, warn};

use crate::app::{ProgressEvent, ProgressSink};
use crate::auth::authenticate;
use crate::config::PortalSettings;
use crate::credentials::CredentialSource;
use crate::domain::{DatasetDescriptor, MonthSource, MonthStamp, ResourceName};
use crate::error::{HarvestError, JobFailure, Stage};
use crate::extract::extract_archive;
use crate::fetch::{FetchedArchive, fetch};
use crate::layout::DatasetLayout;
use crate::portal::PortalConnector;
use crate::provision::PathProvisioner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Provisioned,
    Authenticated,
    Fetched,
    Extracted,
    Failed(Stage),
}

/// Everything a job borrows from the driver for one run.
pub struct JobEnv<'a, P: PortalConnector> {
    pub connector: &'a P,
    pub credentials: &'a dyn CredentialSource,
    pub portal: &'a PortalSettings,
    pub current_dir_name: &'a str,
    pub months: &'a dyn MonthSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub category: String,
    pub resource: String,
    pub base_directory: String,
    /// Month the job was provisioned under.
    pub month: MonthStamp,
    pub state: JobState,
    pub month_directory: Option<String>,
    pub archive_path: Option<String>,
    pub archive_bytes: Option<u64>,
    pub extracted_to: Option<String>,
    pub extracted_files: Option<usize>,
    pub error: Option<String>,
}

impl JobReport {
    pub fn is_success(&self) -> bool {
        self.state == JobState::Extracted
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        match self.state {
            JobState::Failed(stage) => Some(stage),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct JobSuccess {
    archive: FetchedArchive,
    extracted_to: Utf8PathBuf,
    extracted_files: usize,
}

/// One provision → authenticate → fetch → extract attempt for a single archive.
#[derive(Debug)]
pub struct FetchJob {
    base_directory: Utf8PathBuf,
    category: String,
    resource: ResourceName,
    resolved_month_directory: Option<Utf8PathBuf>,
    state: JobState,
}

impl FetchJob {
    pub fn new(descriptor: &DatasetDescriptor) -> Self {
        Self {
            base_directory: descriptor.base_directory.clone(),
            category: descriptor.category.clone(),
            resource: descriptor.resource.clone(),
            resolved_month_directory: None,
            state: JobState::Pending,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn resolved_month_directory(&self) -> Option<&Utf8Path> {
        self.resolved_month_directory.as_deref()
    }

    /// Runs the pipeline to completion or to the first failing stage.
    ///
    /// Failures are reported, never returned; directories and files written
    /// by completed stages are left in place.
    pub fn run<P: PortalConnector>(
        &mut self,
        env: &JobEnv<'_, P>,
        sink: &dyn ProgressSink,
    ) -> JobReport {
        info!(resource = %self.resource, base = %self.base_directory, "starting fetch job");
        // Read per job, at provisioning time.
        let stamp = env.months.stamp();
        let outcome = self.execute(env, stamp, sink);

        let mut report = JobReport {
            category: self.category.clone(),
            resource: self.resource.to_string(),
            base_directory: self.base_directory.to_string(),
            month: stamp,
            state: self.state,
            month_directory: self
                .resolved_month_directory
                .as_ref()
                .map(|dir| dir.to_string()),
            archive_path: None,
            archive_bytes: None,
            extracted_to: None,
            extracted_files: None,
            error: None,
        };

        match outcome {
            Ok(success) => {
                info!(
                    resource = %self.resource,
                    files = success.extracted_files,
                    "fetch job complete"
                );
                report.archive_path = Some(success.archive.path.to_string());
                report.archive_bytes = Some(success.archive.info.bytes);
                report.extracted_to = Some(success.extracted_to.to_string());
                report.extracted_files = Some(success.extracted_files);
            }
            Err(failure) => {
                warn!(
                    resource = %self.resource,
                    stage = %failure.stage,
                    error = %failure.cause,
                    "fetch job failed"
                );
                sink.event(ProgressEvent {
                    message: format!("phase=Failed; {failure}"),
                    elapsed: None,
                });
                self.state = JobState::Failed(failure.stage);
                report.state = self.state;
                report.error = Some(failure.to_string());
            }
        }
        report
    }

    fn execute<P: PortalConnector>(
        &mut self,
        env: &JobEnv<'_, P>,
        stamp: MonthStamp,
        sink: &dyn ProgressSink,
    ) -> Result<JobSuccess, JobFailure> {
        let layout = DatasetLayout::new(self.base_directory.clone(), env.current_dir_name);

        sink.event(ProgressEvent {
            message: format!("phase=Provision; {}", layout.month_dir(stamp)),
            elapsed: None,
        });
        let month_dir = PathProvisioner
            .provision_for(layout.base(), stamp)
            .map_err(|cause| JobFailure::new(Stage::Provision, cause))?;
        self.resolved_month_directory = Some(month_dir.clone());
        self.state = JobState::Provisioned;

        sink.event(ProgressEvent {
            message: format!("phase=Authenticate; {}", env.portal.login_url),
            elapsed: None,
        });
        let start = std::time::Instant::now();
        let session = env
            .connector
            .connect()
            .and_then(|session| {
                let credentials = env.credentials.credentials()?;
                authenticate(&session, env.portal, &credentials)?;
                Ok(session)
            })
            .map_err(|cause| JobFailure::new(Stage::Authenticate, into_auth_error(cause)))?;
        self.state = JobState::Authenticated;

        sink.event(ProgressEvent {
            message: format!("phase=Fetch; {} from {}", self.resource, self.category),
            elapsed: None,
        });
        let archive = fetch(
            &session,
            env.portal,
            &self.category,
            &month_dir,
            &self.resource,
        )
        .map_err(|cause| JobFailure::new(Stage::Fetch, cause))?;
        self.state = JobState::Fetched;
        sink.event(ProgressEvent {
            message: format!("portal.response bytes={}", archive.info.bytes),
            elapsed: Some(start.elapsed()),
        });

        let current_dir = layout.current_dir();
        sink.event(ProgressEvent {
            message: format!("phase=Extract; into {current_dir}"),
            elapsed: None,
        });
        let extracted_files =
            extract_archive(archive.path.as_std_path(), current_dir.as_std_path())
                .map_err(|cause| JobFailure::new(Stage::Extract, cause))?;
        self.state = JobState::Extracted;

        Ok(JobSuccess {
            archive,
            extracted_to: current_dir,
            extracted_files,
        })
    }
}

fn into_auth_error(cause: HarvestError) -> HarvestError {
    match cause {
        HarvestError::Authentication(_) => cause,
        other => HarvestError::Authentication(other.to_string()),
    }
}
