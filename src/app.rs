use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::config::PortalSettings;
use crate::credentials::CredentialSource;
use crate::domain::{DatasetDescriptor, MonthSource, MonthStamp, SystemMonth};
use crate::job::{FetchJob, JobEnv, JobReport};
use crate::layout::DatasetLayout;
use crate::portal::PortalConnector;

#[derive(Debug, Clone, Serialize)]
pub struct HarvestResult {
    /// Month when the run started; each item carries the month it was provisioned under.
    pub month: MonthStamp,
    pub items: Vec<JobReport>,
}

impl HarvestResult {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanResult {
    pub month: MonthStamp,
    pub items: Vec<PlanEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry {
    pub category: String,
    pub resource: String,
    pub base_directory: String,
    pub base_exists: bool,
    pub archive_path: String,
    pub extract_to: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Runs one independent fetch job per dataset, strictly in order.
pub struct Harvester<P: PortalConnector, C: CredentialSource> {
    connector: P,
    credentials: C,
    portal: PortalSettings,
    current_dir_name: String,
    months: Box<dyn MonthSource>,
}

impl<P: PortalConnector, C: CredentialSource> Harvester<P, C> {
    pub fn new(
        connector: P,
        credentials: C,
        portal: PortalSettings,
        current_dir_name: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            credentials,
            portal,
            current_dir_name: current_dir_name.into(),
            months: Box::new(SystemMonth),
        }
    }

    /// Pins the month used for dated directories instead of reading the clock.
    pub fn with_month(self, stamp: MonthStamp) -> Self {
        self.with_month_source(stamp)
    }

    pub fn with_month_source(mut self, months: impl MonthSource + 'static) -> Self {
        self.months = Box::new(months);
        self
    }

    pub fn run(&self, datasets: &[DatasetDescriptor], sink: &dyn ProgressSink) -> HarvestResult {
        let month = self.months.stamp();
        let mut items = Vec::with_capacity(datasets.len());

        for (index, descriptor) in datasets.iter().enumerate() {
            sink.event(ProgressEvent {
                message: format!(
                    "job {}/{}: {} -> {}",
                    index + 1,
                    datasets.len(),
                    descriptor.resource,
                    descriptor.base_directory
                ),
                elapsed: None,
            });
            let env = JobEnv {
                connector: &self.connector,
                credentials: &self.credentials,
                portal: &self.portal,
                current_dir_name: &self.current_dir_name,
                months: self.months.as_ref(),
            };
            let mut job = FetchJob::new(descriptor);
            items.push(job.run(&env, sink));
        }

        let result = HarvestResult { month, items };
        info!(
            month = %month,
            succeeded = result.succeeded(),
            failed = result.failed(),
            "harvest finished"
        );
        result
    }

    /// Paths a run would touch this month; reads the filesystem only to report `base_exists`.
    pub fn plan(&self, datasets: &[DatasetDescriptor]) -> PlanResult {
        let month = self.months.stamp();
        let items = datasets
            .iter()
            .map(|descriptor| {
                let layout =
                    DatasetLayout::new(descriptor.base_directory.clone(), &*self.current_dir_name);
                PlanEntry {
                    category: descriptor.category.clone(),
                    resource: descriptor.resource.to_string(),
                    base_directory: descriptor.base_directory.to_string(),
                    base_exists: descriptor.base_directory.as_std_path().is_dir(),
                    archive_path: layout.archive_path(month, &descriptor.resource).to_string(),
                    extract_to: layout.current_dir().to_string(),
                }
            })
            .collect();
        PlanResult { month, items }
    }
}
