//! Utilities
use log::*;
use std::{collections::HashMap, env, fmt::Display, fs, io::Write, str::FromStr, time::Duration};
use anyhow::{anyhow, Context, Result};
use reqwest::{blocking::Client, header, redirect};
use regex::Regex;

// This reads the constant set in lib.rs.
use crate::ACCEPT_INVALID_CERTS;

/// The number of redirects that are followed for a stats endpoint.
pub const MAX_REDIRECTS: usize = 50;

/// Build a new http client for a single fetch.
///
/// The client asks for text/plain, which makes the stats endpoints return one statistic per line.
pub fn http_client(
    timeout: Duration,
) -> reqwest::Result<Client>
{
    let mut headers = header::HeaderMap::new();
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("text/plain"));
    Client::builder()
        .danger_accept_invalid_certs(ACCEPT_INVALID_CERTS)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(timeout)
        .build()
}

/// Resolve a setting: the command line option wins, then the environment variable
/// (which can be set via .env), then the default.
///
/// A value that came from the command line or the environment is added to `changed_options`,
/// so it can be written to .env.
pub fn set_option(
    option: &Option<String>,
    variable: &'static str,
    default: Option<&str>,
    changed_options: &mut HashMap<&'static str, String>,
) -> Option<String>
{
    if let Some(value) = option {
        info!("{} argument set: using: {}", variable, value);
        changed_options.insert(variable, value.to_string());
        return Some(value.to_string());
    }
    match env::var(variable) {
        Ok(set_var) => {
            info!("{} not set: set via .env: {}", variable, set_var);
            changed_options.insert(variable, set_var.to_owned());
            Some(set_var)
        }
        Err(_e) => {
            match default {
                Some(default) => info!("{} not set: and not set via .env: using default: {}", variable, default),
                None => info!("{} not set: and not set via .env: no default", variable),
            }
            default.map(|d| d.to_string())
        }
    }
}

/// Resolve a setting that always has a value, see [set_option].
pub fn set_string(
    option: &Option<String>,
    variable: &'static str,
    default: &str,
    changed_options: &mut HashMap<&'static str, String>,
) -> String
{
    set_option(option, variable, Some(default), changed_options).unwrap_or_else(|| default.to_string())
}

/// Resolve a numeric setting, see [set_option].
pub fn set_number<T>(
    option: &Option<String>,
    variable: &'static str,
    default: T,
    changed_options: &mut HashMap<&'static str, String>,
) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    let value = set_string(option, variable, &default.to_string(), changed_options);
    value.trim()
        .parse::<T>()
        .map_err(|e| anyhow!("{}: invalid value {}: {}", variable, value, e))
}

pub fn set_regex(
    regex: &Option<String>,
) -> Result<Regex>
{
    match regex {
        Some(regex) => Regex::new(regex.as_str()).with_context(|| format!("Invalid regex: {}", regex)),
        None => Ok(Regex::new(".*")?),
    }
}

pub fn dotenv_writer(
    write_dotenv: bool,
    changed_options: HashMap<&str, String>,
) -> Result<()>
{
    if !changed_options.is_empty() && write_dotenv {
        info!("Writing .env file");
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(".env")
            .with_context(|| "Error writing .env file: .env")?;

        for (key, value) in changed_options {
            file.write_all(format!("{}={}\n", key, value).as_bytes())?;
            info!("{}={}", key, value);
        }
    }
    Ok(())
}
