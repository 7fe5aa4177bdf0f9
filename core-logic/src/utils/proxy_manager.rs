use crate::config::ProxyConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub struct ProxyManager;

impl ProxyManager {
    pub const PROXY_FILE: &'static str = "proxies.txt";

    /// Loads proxies, one per line. Accepted forms, each with an optional
    /// `scheme://` prefix (http when absent):
    ///
    /// - `ip:port`
    /// - `ip:port:user:pass`
    /// - `user:pass@ip:port`
    ///
    /// A missing file is not an error: the run goes without proxies.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Vec<ProxyConfig>> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("{} not found. Running without proxies.", path.display());
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut proxies = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match Self::parse_line(line) {
                Some(proxy) => proxies.push(proxy),
                None => warn!("Skipping invalid proxy line: {}", line),
            }
        }

        info!("Loaded {} proxies from {}", proxies.len(), path.display());
        Ok(proxies)
    }

    pub fn parse_line(line: &str) -> Option<ProxyConfig> {
        let (scheme, rest) = match line.split_once("://") {
            Some((scheme, rest)) => (scheme, rest),
            None => ("http", line),
        };

        let (host, port, username, password) = match rest.rsplit_once('@') {
            Some((creds, addr)) => {
                let (user, pass) = creds.split_once(':')?;
                let (host, port) = addr.split_once(':')?;
                (host, port, Some(user), Some(pass))
            }
            None => {
                let parts: Vec<&str> = rest.split(':').collect();
                match parts.as_slice() {
                    [host, port] => (*host, *port, None, None),
                    [host, port, user, pass] => (*host, *port, Some(*user), Some(*pass)),
                    _ => return None,
                }
            }
        };

        if host.is_empty() || port.parse::<u16>().is_err() {
            return None;
        }

        Some(ProxyConfig {
            url: format!("{}://{}:{}", scheme, host, port),
            username: username.map(str::to_string),
            password: password.map(str::to_string),
        })
    }
}
