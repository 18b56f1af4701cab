//! The evaluation context and its request-derived construction.
//!
//! A [`Context`] is built once per request from whatever key-value fields the caller supplied
//! (query string or request body), combined with facts only the transport knows (peer address,
//! forwarding headers). Construction is pure; enrichment happens separately in
//! [`enrich`](crate::enrich).

use std::{collections::HashMap, net::IpAddr};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// The set of request attributes a toggle's rollout strategy is evaluated against.
///
/// Keys are case-sensitive; the well-known fields get typed slots and everything else lands in
/// [`properties`](Context::properties). A context is constructed per request and treated as
/// immutable once handed to the evaluator; enrichers produce new values instead of mutating a
/// shared instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_time: Option<String>,
    /// Arbitrary custom fields, passed through to strategy evaluation unchanged.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, String>,
}

/// Transport-level facts about the incoming request, supplied by the routing layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestInfo<'a> {
    /// Raw value of the `X-Forwarded-For`-style header, if present.
    pub forwarded_for: Option<&'a str>,
    /// Address of the transport-level peer.
    pub peer_addr: Option<IpAddr>,
}

impl Context {
    /// Build a canonical context from raw caller-supplied fields and request metadata.
    ///
    /// Caller-supplied `currentTime` and `remoteAddress` are ignored: the timestamp is always the
    /// build-time instant and the address is derived from the request itself (they cannot be
    /// trusted from the payload). All other fields pass through, unknown keys as custom
    /// properties.
    pub fn from_request(fields: HashMap<String, String>, request: &RequestInfo) -> Context {
        let mut context = Context {
            current_time: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            remote_address: derive_remote_address(request),
            ..Context::default()
        };

        for (key, value) in fields {
            match key.as_str() {
                "appName" => context.app_name = Some(value),
                "environment" => context.environment = Some(value),
                "userId" => context.user_id = Some(value),
                "sessionId" => context.session_id = Some(value),
                "currentTime" | "remoteAddress" => {}
                _ => {
                    context.properties.insert(key, value);
                }
            }
        }

        context
    }
}

/// First forwarded-for entry wins; else the peer address, with IPv4-mapped IPv6 addresses
/// unwrapped to their bare IPv4 form. `None` if no source yields a non-empty value.
fn derive_remote_address(request: &RequestInfo) -> Option<String> {
    if let Some(header) = request.forwarded_for {
        let first = header.split(',').next().unwrap_or("").trim();
        if !first.is_empty() {
            return Some(first.to_owned());
        }
    }

    let peer = request.peer_addr?;
    let address = match peer {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.to_string(),
            None => v6.to_string(),
        },
        IpAddr::V4(v4) => v4.to_string(),
    };
    Some(address)
}
