//! # Identity Resolution
//!
//! Maps a token id to a username through an LDAP-backed HTTP lookup service.
//! The service answers `GET <endpoint>?ibutton=<id>` with a JSON object whose
//! `username` field is a list; the first entry is the user.
//!
//! Resolution never fails from the caller's point of view: transport errors,
//! error statuses and malformed bodies all degrade to [`Identity::Anonymous`]
//! and leave a diagnostic in the log.

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::time::Duration;

/// Outcome of resolving a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// The lookup service knows this token.
    Known(String),
    /// Unknown token or failed lookup.
    Anonymous,
}

impl Identity {
    pub fn username(&self) -> Option<&str> {
        match self {
            Identity::Known(name) => Some(name),
            Identity::Anonymous => None,
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.username().unwrap_or(""))
    }
}

pub trait IdentityResolver {
    fn resolve(&self, token: &str) -> Identity;
}

/// Body returned by the lookup service.
#[derive(Debug, Deserialize)]
struct LookupResponse {
    username: Vec<String>,
}

/// Resolver that queries the lookup service over HTTP with `ureq`.
pub struct HttpIdentityResolver {
    endpoint: String,
    param: String,
    http_client: ureq::Agent,
}

impl HttpIdentityResolver {
    pub fn new(endpoint: &str, param: &str, timeout: Duration) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .build();
        Self {
            endpoint: endpoint.trim().to_string(),
            param: param.to_string(),
            http_client,
        }
    }

    /// Full request URL for a token.
    fn lookup_url(&self, token: &str) -> String {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}={}",
            self.endpoint,
            separator,
            self.param,
            urlencoding::encode(token)
        )
    }

    fn lookup(&self, token: &str) -> Result<String> {
        let url = self.lookup_url(token);
        debug!("Looking up token at {url}");

        let response = self.http_client.get(&url).call().map_err(|err| match err {
            ureq::Error::Status(code, response) => {
                let body = response.into_string().unwrap_or_default();
                anyhow!("lookup service returned HTTP {code}: {}", body.trim())
            }
            ureq::Error::Transport(transport) => anyhow!("lookup request failed: {transport}"),
        })?;

        let body: LookupResponse = response
            .into_json()
            .context("lookup service returned malformed JSON")?;

        parse_username(body)
    }
}

fn parse_username(body: LookupResponse) -> Result<String> {
    body.username
        .into_iter()
        .next()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| anyhow!("lookup response has no username"))
}

impl IdentityResolver for HttpIdentityResolver {
    fn resolve(&self, token: &str) -> Identity {
        match self.lookup(token) {
            Ok(username) => Identity::Known(username),
            Err(e) => {
                warn!("Could not resolve token {token:?}: {e:#}");
                Identity::Anonymous
            }
        }
    }
}
