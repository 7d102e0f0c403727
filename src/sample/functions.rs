//! The impls and functions
//!
use std::{fmt, io::stdout, sync::Mutex};
use chrono::{DateTime, Local};
use colored::Colorize;
use regex::Regex;
use log::*;
use crate::sample::{MetricFamily, MetricSample, OutputFormat, StdoutSink};

impl MetricFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricFamily::NodeStats => "node-stats",
            MetricFamily::ReplicationStats => "replication-stats",
            MetricFamily::ClusterProbe => "cluster-probe",
        }
    }
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MetricSample {
    pub fn new(
        family: MetricFamily,
        instance: &str,
        value: i64,
    ) -> Self
    {
        MetricSample {
            family,
            instance: instance.to_string(),
            value,
            timestamp: None,
        }
    }
    pub fn with_timestamp(
        mut self,
        timestamp: DateTime<Local>,
    ) -> Self
    {
        self.timestamp = Some(timestamp);
        self
    }
}

/// The boundary into the metric pipeline: a sample is pushed, nothing is returned.
pub trait MetricSink: Send + Sync {
    fn submit(&self, sample: &MetricSample);
}

impl StdoutSink {
    pub fn new(
        format: OutputFormat,
        stat_name_filter: Regex,
    ) -> Self
    {
        StdoutSink {
            format,
            stat_name_filter,
            csv_writer: Mutex::new(csv::Writer::from_writer(stdout())),
        }
    }
    fn print_table(
        &self,
        sample: &MetricSample,
    )
    {
        let timestamp = sample.timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let value = match (sample.family, sample.value) {
            (MetricFamily::ClusterProbe, 1) => sample.value.to_string().green(),
            (MetricFamily::ClusterProbe, _) => sample.value.to_string().red(),
            (_, _) => sample.value.to_string().normal(),
        };
        println!("{:20} {:18} {:40} {:>15}", timestamp, sample.family, sample.instance, value);
    }
    fn print_json(
        &self,
        sample: &MetricSample,
    )
    {
        match serde_json::to_string(sample) {
            Ok(line) => println!("{}", line),
            Err(e) => error!("Unable to serialize sample {}/{}: {}", sample.family, sample.instance, e),
        }
    }
    fn print_csv(
        &self,
        sample: &MetricSample,
    )
    {
        // a poisoned lock only means another submit panicked halfway a row.
        let mut writer = self.csv_writer.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writer.serialize(sample).and_then(|_| writer.flush().map_err(csv::Error::from)) {
            error!("Unable to write sample {}/{}: {}", sample.family, sample.instance, e);
        }
    }
}

impl MetricSink for StdoutSink {
    fn submit(&self, sample: &MetricSample) {
        if !self.stat_name_filter.is_match(&sample.instance) {
            debug!("filtered: {}/{}", sample.family, sample.instance);
            return;
        }
        match self.format {
            OutputFormat::Table => self.print_table(sample),
            OutputFormat::Json => self.print_json(sample),
            OutputFormat::Csv => self.print_csv(sample),
        }
    }
}
