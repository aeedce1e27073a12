//! Inbound command routing.
//!
//! Modules register under a topic prefix (`wifi`, `ota`, ...) and receive
//! every command addressed to `<base>/<prefix>/<device_id>/<command>`.
//! Matching is exact, case-sensitive and segment-bounded; anything that
//! does not match is dropped without an error surfacing upstream.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, trace};

use airlink_core::{LinkError, Result, Transport};

use crate::manager::LinkConfig;

/// Maximum number of registered command modules.
pub const MAX_MODULES: usize = 8;

/// Handler for one module's command suffixes.
///
/// The router resolves the module and device segments; the handler itself
/// resolves the command suffix. Handlers must never panic on malformed
/// payloads: log and drop.
#[async_trait]
pub trait CommandModule: Send + Sync {
    async fn handle(&self, command: &str, payload: &[u8]);
}

/// A downlink topic split into its `<module>/<device_id>/<command>` tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTopic<'a> {
    pub module: &'a str,
    pub device_id: &'a str,
    pub command: &'a str,
}

impl<'a> ParsedTopic<'a> {
    /// Split `<base>/<module>/<device_id>/<command>`. Returns `None` when
    /// the base prefix does not match on a segment boundary or any of the
    /// three tail segments is missing or empty.
    pub fn parse(topic: &'a str, base: &str) -> Option<Self> {
        let rest = topic.strip_prefix(base)?;
        let rest = rest.strip_prefix('/')?;
        let mut parts = rest.splitn(3, '/');
        let module = parts.next().filter(|s| !s.is_empty())?;
        let device_id = parts.next().filter(|s| !s.is_empty())?;
        let command = parts.next().filter(|s| !s.is_empty())?;
        Some(Self {
            module,
            device_id,
            command,
        })
    }
}

/// Registry of command modules plus the dispatch logic.
pub struct CommandRouter {
    link: Arc<LinkConfig>,
    modules: RwLock<Vec<(String, Arc<dyn CommandModule>)>>,
}

impl CommandRouter {
    pub fn new(link: Arc<LinkConfig>) -> Self {
        Self {
            link,
            modules: RwLock::new(Vec::new()),
        }
    }

    /// Register a handler under a module prefix. Fails when the prefix is
    /// empty, already registered, or the registry is full.
    pub fn register(&self, prefix: &str, handler: Arc<dyn CommandModule>) -> Result<()> {
        if prefix.is_empty() {
            return Err(LinkError::Registration(
                "module prefix must not be empty".into(),
            ));
        }
        let mut modules = self.modules.write();
        if modules.iter().any(|(registered, _)| registered == prefix) {
            return Err(LinkError::Registration(format!(
                "module prefix already registered: {prefix}"
            )));
        }
        if modules.len() >= MAX_MODULES {
            return Err(LinkError::Registration(format!(
                "module registry is full ({MAX_MODULES} entries)"
            )));
        }
        modules.push((prefix.to_string(), handler));
        Ok(())
    }

    /// Subscribe every registered module's command filter on the transport.
    /// Called by the manager after the session is (re-)established.
    pub async fn subscribe_all(&self, transport: &dyn Transport) -> Result<()> {
        let filters: Vec<String> = {
            let modules = self.modules.read();
            modules
                .iter()
                .map(|(prefix, _)| {
                    format!(
                        "{}/{}/{}/+",
                        self.link.base_topic, prefix, self.link.client_id
                    )
                })
                .collect()
        };
        for filter in filters {
            transport.subscribe(&filter).await?;
            debug!(%filter, "subscribed command filter");
        }
        Ok(())
    }

    /// Route one inbound message to the matching module. Unmatched and
    /// malformed topics are dropped silently.
    pub async fn dispatch(&self, topic: &str, payload: &[u8]) {
        let Some(parsed) = ParsedTopic::parse(topic, &self.link.base_topic) else {
            trace!(%topic, "ignoring message outside command namespace");
            return;
        };
        if parsed.device_id != self.link.client_id {
            trace!(%topic, "ignoring message addressed to another device");
            return;
        }

        // Clone the handler out so the registry lock is not held across
        // the handler await.
        let handler = {
            let modules = self.modules.read();
            modules
                .iter()
                .find(|(prefix, _)| prefix.as_str() == parsed.module)
                .map(|(_, handler)| handler.clone())
        };
        match handler {
            Some(handler) => handler.handle(parsed.command, payload).await,
            None => debug!(module = parsed.module, "no module registered for prefix"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_segments() {
        let parsed = ParsedTopic::parse("xn/web/wifi/device-1/set", "xn/web").unwrap();
        assert_eq!(parsed.module, "wifi");
        assert_eq!(parsed.device_id, "device-1");
        assert_eq!(parsed.command, "set");
    }

    #[test]
    fn parse_keeps_command_remainder_intact() {
        let parsed = ParsedTopic::parse("xn/web/wifi/device-1/set/extra", "xn/web").unwrap();
        assert_eq!(parsed.command, "set/extra");
    }

    #[test]
    fn parse_requires_base_on_segment_boundary() {
        // Base prefix must be followed by '/'.
        assert!(ParsedTopic::parse("xn/webx/wifi/device-1/set", "xn/web").is_none());
        assert!(ParsedTopic::parse("xn/web", "xn/web").is_none());
        assert!(ParsedTopic::parse("other/wifi/device-1/set", "xn/web").is_none());
    }

    #[test]
    fn parse_rejects_missing_or_empty_segments() {
        assert!(ParsedTopic::parse("xn/web/wifi/device-1", "xn/web").is_none());
        assert!(ParsedTopic::parse("xn/web/wifi//set", "xn/web").is_none());
        assert!(ParsedTopic::parse("xn/web//device-1/set", "xn/web").is_none());
        assert!(ParsedTopic::parse("xn/web/wifi/device-1/", "xn/web").is_none());
    }

    #[test]
    fn parse_is_case_sensitive() {
        let parsed = ParsedTopic::parse("xn/web/WIFI/device-1/set", "xn/web").unwrap();
        assert_eq!(parsed.module, "WIFI");
        assert_ne!(parsed.module, "wifi");
    }
}
