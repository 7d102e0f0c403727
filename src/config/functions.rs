//! The impls and functions
//!
use std::{collections::HashMap, time::Duration};
use anyhow::{bail, Context, Result};
use log::*;
use crate::utility;
use crate::probe::ProbeSpec;
use crate::rpc::EPMD_PORT;
use crate::stats::{MetricWhitelist, StatsEndpoint};
use crate::config::{Opts, Settings};
use crate::{DEFAULT_BUFFER_CAPACITY, DEFAULT_COOKIE, DEFAULT_HTTP_TIMEOUT, DEFAULT_INTERVAL, DEFAULT_LOCAL_NODE, DEFAULT_NODE, DEFAULT_PARALLEL, DEFAULT_RPC_TIMEOUT};

impl Default for Settings {
    fn default() -> Self {
        Settings {
            stats_url: None,
            repl_url: None,
            check_repl: None,
            node: DEFAULT_NODE.to_string(),
            cookie: DEFAULT_COOKIE.to_string(),
            local_node: DEFAULT_LOCAL_NODE.to_string(),
            epmd_port: EPMD_PORT,
            interval: Duration::from_secs(DEFAULT_INTERVAL),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT),
            rpc_timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            parallel: DEFAULT_PARALLEL,
            once: false,
            probes: ProbeSpec::default_probes(DEFAULT_NODE, DEFAULT_COOKIE),
        }
    }
}

impl Settings {
    pub fn from_opts(
        options: &Opts,
        changed_options: &mut HashMap<&'static str, String>,
    ) -> Result<Settings>
    {
        let node = utility::set_string(&options.node, "RIAKSTATS_NODE", DEFAULT_NODE, changed_options);
        let cookie = utility::set_string(&options.cookie, "RIAKSTATS_COOKIE", DEFAULT_COOKIE, changed_options);
        let mut settings = Settings {
            stats_url: utility::set_option(&options.stats_url, "RIAKSTATS_STATS_URL", None, changed_options),
            repl_url: utility::set_option(&options.repl_url, "RIAKSTATS_REPL_URL", None, changed_options),
            check_repl: utility::set_option(&options.check_repl, "RIAKSTATS_CHECK_REPL", None, changed_options),
            local_node: utility::set_string(&options.local_node, "RIAKSTATS_LOCAL_NODE", DEFAULT_LOCAL_NODE, changed_options),
            epmd_port: utility::set_number(&options.epmd_port, "RIAKSTATS_EPMD_PORT", EPMD_PORT, changed_options)?,
            interval: Duration::from_secs(utility::set_number(&options.interval, "RIAKSTATS_INTERVAL", DEFAULT_INTERVAL, changed_options)?),
            http_timeout: Duration::from_secs(utility::set_number(&options.http_timeout, "RIAKSTATS_HTTP_TIMEOUT", DEFAULT_HTTP_TIMEOUT, changed_options)?),
            rpc_timeout: Duration::from_secs(utility::set_number(&options.rpc_timeout, "RIAKSTATS_RPC_TIMEOUT", DEFAULT_RPC_TIMEOUT, changed_options)?),
            buffer_capacity: utility::set_number(&options.buffer_capacity, "RIAKSTATS_BUFFER_CAPACITY", DEFAULT_BUFFER_CAPACITY, changed_options)?,
            parallel: utility::set_number(&options.parallel, "RIAKSTATS_PARALLEL", DEFAULT_PARALLEL, changed_options)?,
            once: options.once,
            probes: ProbeSpec::default_probes(&node, &cookie),
            node,
            cookie,
        };
        for option in &options.options {
            let (key, value) = option.split_once('=')
                .with_context(|| format!("Option {} is not in the form key=value", option))?;
            settings.apply_option(key.trim(), value.trim())?;
        }
        if settings.interval.is_zero() {
            bail!("interval must be at least 1 second");
        }
        if settings.parallel == 0 {
            bail!("parallel must be at least 1");
        }
        Ok(settings)
    }
    /// Set one of the collectd style keys. The keys are case insensitive.
    pub fn apply_option(
        &mut self,
        key: &str,
        value: &str,
    ) -> Result<()>
    {
        match key.to_ascii_lowercase().as_str() {
            "statsurl" => self.stats_url = Some(value.to_string()),
            "replurl" => self.repl_url = Some(value.to_string()),
            "checkrepl" => {
                debug!("CheckRepl is reserved, value {} is not used", value);
                self.check_repl = Some(value.to_string());
            },
            _ => bail!("Unknown option: {}", key),
        }
        Ok(())
    }
    /// The node stats and the replication stats endpoint, in that order.
    pub fn stats_endpoints(&self) -> Vec<StatsEndpoint> {
        vec![
            StatsEndpoint::new(self.stats_url.clone(), MetricWhitelist::node_stats()),
            StatsEndpoint::new(self.repl_url.clone(), MetricWhitelist::replication_stats()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::MetricFamily;

    #[test]
    fn unit_apply_option_is_case_insensitive() {
        let mut settings = Settings::default();
        settings.apply_option("StatsURL", "http://127.0.0.1:8098/stats").unwrap();
        settings.apply_option("replurl", "http://127.0.0.1:8098/riak-repl/stats").unwrap();
        settings.apply_option("CHECKREPL", "true").unwrap();
        assert_eq!(settings.stats_url.as_deref(), Some("http://127.0.0.1:8098/stats"));
        assert_eq!(settings.repl_url.as_deref(), Some("http://127.0.0.1:8098/riak-repl/stats"));
        assert_eq!(settings.check_repl.as_deref(), Some("true"));
    }

    #[test]
    fn unit_apply_option_unknown_key() {
        let mut settings = Settings::default();
        assert!(settings.apply_option("Interval", "10").is_err());
    }

    #[test]
    fn unit_from_opts_options_override() {
        let options = Opts {
            stats_url: Some("http://first/stats".to_string()),
            options: vec!["StatsURL = http://second/stats".to_string(), "ReplURL=http://repl/stats".to_string()],
            node: Some("riak@10.0.0.1".to_string()),
            interval: Some("30".to_string()),
            ..Default::default()
        };
        let mut changed_options = HashMap::new();
        let settings = Settings::from_opts(&options, &mut changed_options).unwrap();
        assert_eq!(settings.stats_url.as_deref(), Some("http://second/stats"));
        assert_eq!(settings.repl_url.as_deref(), Some("http://repl/stats"));
        assert_eq!(settings.interval, Duration::from_secs(30));
        assert_eq!(settings.node, "riak@10.0.0.1");
        assert!(settings.probes.iter().all(|probe| probe.node == "riak@10.0.0.1"));
        assert_eq!(changed_options.get("RIAKSTATS_NODE").map(|s| s.as_str()), Some("riak@10.0.0.1"));
    }

    #[test]
    fn unit_from_opts_invalid_values() {
        let mut changed_options = HashMap::new();
        let options = Opts { options: vec!["StatsURL".to_string()], ..Default::default() };
        assert!(Settings::from_opts(&options, &mut changed_options).is_err());
        let options = Opts { interval: Some("0".to_string()), ..Default::default() };
        assert!(Settings::from_opts(&options, &mut changed_options).is_err());
        let options = Opts { epmd_port: Some("70000".to_string()), ..Default::default() };
        assert!(Settings::from_opts(&options, &mut changed_options).is_err());
    }

    #[test]
    fn unit_stats_endpoints() {
        let mut settings = Settings::default();
        settings.stats_url = Some("http://127.0.0.1:8098/stats".to_string());
        let endpoints = settings.stats_endpoints();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].whitelist.family, MetricFamily::NodeStats);
        assert_eq!(endpoints[0].url.as_deref(), Some("http://127.0.0.1:8098/stats"));
        assert_eq!(endpoints[1].whitelist.family, MetricFamily::ReplicationStats);
        assert!(endpoints[1].url.is_none());
    }
}
