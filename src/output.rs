use std::io::{self, Write};

use serde::Serialize;

use crate::app::{HarvestResult, PlanResult, ProgressEvent, ProgressSink};
use crate::job::JobState;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_harvest(result: &HarvestResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_plan(result: &PlanResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Progress lines on stderr, summaries on stdout.
pub struct ConsoleOutput;

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("  {} ({} ms)", event.message, elapsed.as_millis()),
            None => eprintln!("  {}", event.message),
        }
    }
}

impl ConsoleOutput {
    pub fn print_harvest(result: &HarvestResult) {
        let green = "\x1b[32m";
        let red = "\x1b[31m";
        let cyan = "\x1b[36m";
        let reset = "\x1b[0m";

        println!("{cyan}gis-harvest summary for {}{reset}", result.month);
        println!(
            "{green}extracted: {}{reset}  {red}failed: {}{reset}",
            result.succeeded(),
            result.failed()
        );

        for item in &result.items {
            match item.state {
                JobState::Extracted => {
                    println!("{green}ok   {} ({}){reset}", item.resource, item.category);
                    if let Some(path) = &item.archive_path {
                        println!("{green}     archive: {path}{reset}");
                    }
                    if let (Some(dir), Some(count)) = (&item.extracted_to, item.extracted_files) {
                        println!("{green}     current: {dir} ({count} files){reset}");
                    }
                }
                _ => {
                    println!("{red}fail {} ({}){reset}", item.resource, item.category);
                    if let Some(error) = &item.error {
                        println!("{red}     {error}{reset}");
                    }
                }
            }
        }
    }

    pub fn print_plan(result: &PlanResult) {
        println!("plan for {}", result.month);
        for item in &result.items {
            let marker = if item.base_exists { "" } else { "  [base directory missing]" };
            println!("{} ({}){marker}", item.resource, item.category);
            println!("  archive: {}", item.archive_path);
            println!("  current: {}", item.extract_to);
        }
    }
}
