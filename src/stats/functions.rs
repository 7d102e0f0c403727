//! The impls and functions
//!
use std::{io::{self, Read}, sync::mpsc::channel, time::{Duration, Instant}};
use chrono::Local;
use log::*;
use anyhow::Result;
use crate::utility;
use crate::error::TransportError;
use crate::sample::{MetricFamily, MetricSample};
use crate::stats::{AllStatsSamples, FetchBuffer, MetricWhitelist, StatsEndpoint, MAX_LINES, NODE_STATS_METRICS, REPLICATION_STATS_METRICS};

impl MetricWhitelist {
    pub fn node_stats() -> Self {
        MetricWhitelist::from_names(MetricFamily::NodeStats, &NODE_STATS_METRICS)
    }
    pub fn replication_stats() -> Self {
        MetricWhitelist::from_names(MetricFamily::ReplicationStats, &REPLICATION_STATS_METRICS)
    }
    fn from_names(
        family: MetricFamily,
        names: &[&'static str],
    ) -> Self
    {
        MetricWhitelist {
            family,
            names: names.iter().copied().collect(),
        }
    }
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

impl FetchBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        FetchBuffer {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }
    /// Append as much of `chunk` as fits, and return the number of bytes taken.
    pub fn append(&mut self, chunk: &[u8]) -> usize {
        let room = self.capacity.saturating_sub(self.data.len());
        let taken = chunk.len().min(room);
        self.data.extend_from_slice(&chunk[..taken]);
        taken
    }
    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl StatsEndpoint {
    pub fn new(
        url: Option<String>,
        whitelist: MetricWhitelist,
    ) -> Self
    {
        StatsEndpoint { url, whitelist }
    }
    /// Perform a single GET and collect the body into a new buffer of `capacity` bytes.
    ///
    /// A body larger than the buffer is truncated, and the rest of the response is not read.
    /// A non-success http status is a transport error, the same as a failing connection.
    pub fn fetch(
        &self,
        capacity: usize,
        timeout: Duration,
    ) -> Result<FetchBuffer, TransportError>
    {
        let url = match self.url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => return Err(TransportError::UrlNotSet),
        };
        let client = utility::http_client(timeout)
            .map_err(TransportError::ClientInit)?;
        let mut response = client.get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|source| TransportError::Request { url: url.to_string(), source })?;
        debug!("Success response: {} = {}", url, response.status());

        let mut buffer = FetchBuffer::with_capacity(capacity);
        let mut chunk = [0_u8; 4096];
        loop {
            let read = match response.read(&mut chunk) {
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => return Err(TransportError::Body { url: url.to_string(), source }),
            };
            if read == 0 {
                break;
            }
            if buffer.append(&chunk[..read]) < read {
                debug!("{}: response truncated at {} bytes", url, buffer.capacity);
                break;
            }
        }
        Ok(buffer)
    }
    /// Fetch and parse the endpoint. A failed fetch is logged and results in no samples.
    pub fn read_http(
        &self,
        capacity: usize,
        timeout: Duration,
    ) -> Vec<MetricSample>
    {
        match self.fetch(capacity, timeout) {
            Ok(buffer) => parse_stats(buffer.as_bytes(), &self.whitelist),
            Err(e) => {
                warn!("{}: fetch failed: {}", self.whitelist.family, e);
                Vec::new()
            }
        }
    }
}

impl AllStatsSamples {
    pub fn new() -> Self {
        Default::default()
    }
    /// Read all endpoints in parallel. Every fetch uses its own client and buffer.
    pub fn read_stats(
        endpoints: &[StatsEndpoint],
        capacity: usize,
        timeout: Duration,
        parallel: usize,
    ) -> Result<AllStatsSamples>
    {
        info!("begin parallel http read");
        let timer = Instant::now();

        let pool = rayon::ThreadPoolBuilder::new().num_threads(parallel).build()?;
        let (tx, rx) = channel();
        pool.scope(move |s| {
            for endpoint in endpoints {
                let tx = tx.clone();
                s.spawn(move |_| {
                    let detail_snapshot_time = Local::now();
                    let samples: Vec<MetricSample> = endpoint.read_http(capacity, timeout)
                        .into_iter()
                        .map(|sample| sample.with_timestamp(detail_snapshot_time))
                        .collect();
                    debug!("{}: {} samples", endpoint.whitelist.family, samples.len());
                    tx.send(samples).unwrap_or_else(|e| error!("error sending samples via tx: {}", e));
                });
            }
        });

        info!("end parallel http read {:?}", timer.elapsed());

        let mut allstatssamples = AllStatsSamples::new();
        for samples in rx
        {
            allstatssamples.samples.extend(samples);
        }
        Ok(allstatssamples)
    }
}

/// Turn a stats response body into samples for every whitelisted statistic.
///
/// Every line is expected to look like `"node_gets": 42,`.
/// The first character and the last two characters of the first field are removed to get the name,
/// the last character of the second field is removed to get the value.
/// This is done regardless of the punctuation actually being there,
/// so a line that got cut off by truncation can produce a mangled name or value,
/// which the whitelist normally filters out.
pub fn parse_stats(
    body: &[u8],
    whitelist: &MetricWhitelist,
) -> Vec<MetricSample>
{
    let body = String::from_utf8_lossy(body);
    body.split(|c: char| c == '\n' || c == '\r')
        .filter(|line| !line.is_empty())
        .take(MAX_LINES)
        .filter_map(split_fields)
        .map(|(key, value)| (strip_key(key), strip_value(value)))
        .filter(|(key, _)| whitelist.contains(key))
        .map(|(key, value)| MetricSample::new(whitelist.family, key, parse_gauge(value)))
        .collect()
}

/// The first two whitespace separated fields of a line, if there are two.
fn split_fields(line: &str) -> Option<(&str, &str)> {
    let mut fields = line.split(|c: char| c == ' ' || c == '\t').filter(|field| !field.is_empty());
    Some((fields.next()?, fields.next()?))
}

fn strip_key(field: &str) -> &str {
    let mut chars = field.chars();
    chars.next();
    chars.next_back();
    chars.next_back();
    chars.as_str()
}

fn strip_value(field: &str) -> &str {
    let mut chars = field.chars();
    chars.next_back();
    chars.as_str()
}

/// Text to integer the way `atoll` does it: leading whitespace, an optional sign, then digits
/// up to the first non-digit. No digits means zero. Overflow saturates.
pub fn parse_gauge(field: &str) -> i64 {
    let trimmed = field.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '\x0b');
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    digits.bytes()
        .take_while(u8::is_ascii_digit)
        .map(|digit| i64::from(digit - b'0'))
        .fold(0_i64, |value, digit| {
            if negative {
                value.saturating_mul(10).saturating_sub(digit)
            } else {
                value.saturating_mul(10).saturating_add(digit)
            }
        })
}
