//! The impls and functions
//!
use std::time::Instant;
use chrono::Local;
use tokio::{task::JoinSet, time::MissedTickBehavior};
use log::*;
use anyhow::Result;
use crate::config::Settings;
use crate::rpc::RpcClient;
use crate::sample::{MetricSample, MetricSink};
use crate::stats::AllStatsSamples;

/// Run ticks at the configured interval, and submit every sample to the sink.
/// With `once` set, a single tick is performed.
pub async fn run(
    settings: &Settings,
    sink: &dyn MetricSink,
) -> Result<()>
{
    let mut interval = tokio::time::interval(settings.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        for sample in perform_tick(settings).await {
            sink.submit(&sample);
        }
        if settings.once {
            break;
        }
    }
    Ok(())
}

/// Read both stats endpoints and run all probes, and return the samples.
pub async fn perform_tick(
    settings: &Settings,
) -> Vec<MetricSample>
{
    info!("begin tick");
    let timer = Instant::now();

    let mut samples = read_stats(settings).await;
    samples.extend(run_probes(settings).await);

    info!("end tick: {} samples, {:?}", samples.len(), timer.elapsed());
    samples
}

/// The stats fetches are blocking http requests: they run on a rayon pool on a blocking thread.
async fn read_stats(
    settings: &Settings,
) -> Vec<MetricSample>
{
    let endpoints = settings.stats_endpoints();
    let capacity = settings.buffer_capacity;
    let timeout = settings.http_timeout;
    let parallel = settings.parallel;
    let result = tokio::task::spawn_blocking(move || {
        AllStatsSamples::read_stats(&endpoints, capacity, timeout, parallel)
    }).await;
    match result {
        Ok(Ok(allstatssamples)) => allstatssamples.samples,
        Ok(Err(e)) => {
            error!("stats read failed: {}", e);
            Vec::new()
        },
        Err(e) => {
            error!("stats task failed: {}", e);
            Vec::new()
        },
    }
}

/// Every probe runs as its own task, on its own connection.
async fn run_probes(
    settings: &Settings,
) -> Vec<MetricSample>
{
    info!("begin probes");
    let timer = Instant::now();

    let client = RpcClient::new(&settings.local_node, settings.epmd_port, settings.rpc_timeout);
    let mut probes = JoinSet::new();
    for probe in settings.probes.iter().cloned() {
        let client = client.clone();
        probes.spawn(async move {
            let detail_snapshot_time = Local::now();
            probe.run(&client).await.with_timestamp(detail_snapshot_time)
        });
    }

    let mut samples = Vec::with_capacity(settings.probes.len());
    while let Some(joined) = probes.join_next().await {
        match joined {
            Ok(sample) => samples.push(sample),
            Err(e) => error!("probe task failed: {}", e),
        }
    }

    info!("end probes: {:?}", timer.elapsed());
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Mutex, time::Duration};
    use crate::sample::MetricFamily;

    #[derive(Default)]
    struct VecSink {
        samples: Mutex<Vec<MetricSample>>,
    }

    impl MetricSink for VecSink {
        fn submit(&self, sample: &MetricSample) {
            self.samples.lock().unwrap().push(sample.clone());
        }
    }

    fn unreachable_settings() -> Settings {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let closed_port = listener.local_addr().unwrap().port();
        drop(listener);
        Settings {
            stats_url: Some(format!("http://127.0.0.1:{}/stats", closed_port)),
            repl_url: None,
            epmd_port: closed_port,
            http_timeout: Duration::from_secs(2),
            rpc_timeout: Duration::from_secs(2),
            once: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn unit_tick_with_everything_failing_still_probes() {
        let settings = unreachable_settings();
        let samples = perform_tick(&settings).await;
        // no stats samples, and -1 for each of the four probes.
        assert_eq!(samples.len(), 4);
        assert!(samples.iter().all(|s| s.family == MetricFamily::ClusterProbe && s.value == -1));
        assert!(samples.iter().all(|s| s.timestamp.is_some()));
        let mut functions: Vec<&str> = samples.iter().map(|s| s.instance.as_str()).collect();
        functions.sort();
        assert_eq!(functions, vec!["ping", "ring_status", "ringready", "services"]);
    }

    #[tokio::test]
    async fn unit_run_once_submits_to_sink() {
        let settings = unreachable_settings();
        let sink = VecSink::default();
        run(&settings, &sink).await.unwrap();
        assert_eq!(sink.samples.lock().unwrap().len(), 4);
    }
}
