use crate::callsite::DEFAULT_INTERNAL_PREFIX;
use crate::entry::Kind;
use crate::error::HarkError;
use figment::{Figment, providers::{Env, Format, Yaml}};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Route serving the browser client script. Always bypasses logging.
pub const CLIENT_SCRIPT_PATH: &str = "/logger-client";

/// Logger configuration as written by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarkConfig {
    /// Foreground style name per kind (`red`, `gray`, `greenBright`, ...).
    #[serde(default)]
    pub colors: HashMap<Kind, String>,
    /// Background style name per kind.
    #[serde(default)]
    pub backgrounds: HashMap<Kind, String>,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    /// Request paths that bypass logging entirely.
    #[serde(default)]
    pub filter: Vec<String>,
    #[serde(default)]
    pub indent: Option<Indent>,
    #[serde(default = "default_true")]
    pub multiline: bool,
    /// Pretty-print object values instead of compact JSON.
    #[serde(default)]
    pub json_multiline: bool,
    /// Largest response body buffered for logging; bigger bodies stream through.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default)]
    pub sink: SinkKind,
    #[serde(default = "default_broadcast_addr")]
    pub broadcast_addr: String,
    /// Frames whose function path starts with this are never reported as callers.
    #[serde(default = "default_internal_prefix")]
    pub internal_frame_prefix: String,
}

/// Indentation: a number of spaces or a literal string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Indent {
    Spaces(usize),
    Literal(String),
}

impl Indent {
    pub fn resolve(&self) -> String {
        match self {
            Indent::Spaces(n) => " ".repeat(*n),
            Indent::Literal(s) => s.clone(),
        }
    }
}

/// Where rendered exchanges go.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Stdout,
    Tracing,
    /// Push mode: mirror every exchange to connected browser clients.
    Broadcast,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_timeout() -> u64 { 2000 }
fn default_true() -> bool { true }
fn default_max_body_bytes() -> usize { 1024 * 1024 }
fn default_broadcast_addr() -> String { "0.0.0.0:8081".into() }
fn default_internal_prefix() -> String { DEFAULT_INTERNAL_PREFIX.into() }

// ── Impls ─────────────────────────────────────────────────────

impl Default for HarkConfig {
    fn default() -> Self {
        Self {
            colors: HashMap::new(),
            backgrounds: HashMap::new(),
            timeout_ms: default_timeout(),
            filter: Vec::new(),
            indent: None,
            multiline: true,
            json_multiline: false,
            max_body_bytes: default_max_body_bytes(),
            sink: SinkKind::Stdout,
            broadcast_addr: default_broadcast_addr(),
            internal_frame_prefix: default_internal_prefix(),
        }
    }
}

impl HarkConfig {
    /// Load configuration from YAML file + env overrides (`HARK_TIMEOUT_MS`, ...).
    pub fn load(path: &Path) -> Result<Self, HarkError> {
        let config: Self = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("HARK_"))
            .extract()
            .map_err(|e| HarkError::Config(e.to_string()))?;
        debug!(path = %path.display(), sink = ?config.sink, "Loaded hark config");
        Ok(config)
    }

    /// Validate once and produce the options every exchange reads.
    pub fn normalize(&self) -> Result<Options, HarkError> {
        if self.timeout_ms == 0 {
            return Err(HarkError::Config("timeout_ms must be greater than zero".into()));
        }
        if self.max_body_bytes == 0 {
            return Err(HarkError::Config("max_body_bytes must be greater than zero".into()));
        }
        if self.sink == SinkKind::Broadcast {
            self.broadcast_addr.parse::<SocketAddr>().map_err(|e| {
                HarkError::Config(format!("invalid broadcast_addr {:?}: {e}", self.broadcast_addr))
            })?;
        }

        let mut filter: Vec<String> = Vec::with_capacity(self.filter.len() + 1);
        for path in &self.filter {
            if !filter.contains(path) {
                filter.push(path.clone());
            }
        }
        if !filter.iter().any(|p| p == CLIENT_SCRIPT_PATH) {
            filter.push(CLIENT_SCRIPT_PATH.to_string());
        }

        Ok(Options {
            colors: self.colors.clone(),
            backgrounds: self.backgrounds.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            filter,
            indent: self.indent.as_ref().map(Indent::resolve).unwrap_or_default(),
            multiline: self.multiline,
            json_multiline: self.json_multiline,
            max_body_bytes: self.max_body_bytes,
        })
    }
}

/// Normalized options shared by every exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub colors: HashMap<Kind, String>,
    pub backgrounds: HashMap<Kind, String>,
    pub timeout: Duration,
    pub filter: Vec<String>,
    pub indent: String,
    pub multiline: bool,
    pub json_multiline: bool,
    pub max_body_bytes: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            colors: HashMap::new(),
            backgrounds: HashMap::new(),
            timeout: Duration::from_millis(default_timeout()),
            filter: vec![CLIENT_SCRIPT_PATH.to_string()],
            indent: String::new(),
            multiline: true,
            json_multiline: false,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Options {
    pub fn color_of(&self, kind: Kind) -> &str {
        self.colors.get(&kind).map(String::as_str).unwrap_or(crate::color::NEUTRAL)
    }

    pub fn background_of(&self, kind: Kind) -> &str {
        self.backgrounds.get(&kind).map(String::as_str).unwrap_or(crate::color::NEUTRAL)
    }

    /// The client-script route is filtered even when `filter` omits it.
    pub fn is_filtered(&self, path: &str) -> bool {
        path == CLIENT_SCRIPT_PATH || self.filter.iter().any(|p| p == path)
    }

    pub fn timeout_ms(&self) -> u128 {
        self.timeout.as_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // ── Default values ────────────────────────────────────────────

    #[test]
    fn default_config_has_expected_values() {
        let cfg = HarkConfig::default();
        assert_eq!(cfg.timeout_ms, 2000);
        assert!(cfg.filter.is_empty());
        assert!(cfg.indent.is_none());
        assert!(cfg.multiline);
        assert!(!cfg.json_multiline);
        assert_eq!(cfg.sink, SinkKind::Stdout);
        assert_eq!(cfg.broadcast_addr, "0.0.0.0:8081");
        assert_eq!(cfg.internal_frame_prefix, "hark_middleware::");
    }

    #[test]
    fn default_options_match_normalized_default_config() {
        let normalized = HarkConfig::default().normalize().unwrap();
        assert_eq!(normalized, Options::default());
    }

    // ── normalize() ───────────────────────────────────────────────

    #[test]
    fn filter_always_contains_client_script() {
        let opts = HarkConfig::default().normalize().unwrap();
        assert_eq!(opts.filter, vec!["/logger-client".to_string()]);
        assert!(opts.is_filtered("/logger-client"));
        assert!(!opts.is_filtered("/"));
    }

    #[test]
    fn hand_built_filter_still_skips_client_script() {
        let opts = Options {
            filter: vec!["/health".into()],
            ..Options::default()
        };
        assert!(opts.is_filtered("/health"));
        assert!(opts.is_filtered(CLIENT_SCRIPT_PATH));
        assert!(!opts.is_filtered("/"));
    }

    #[test]
    fn filter_is_deduplicated_and_keeps_order() {
        let cfg = HarkConfig {
            filter: vec!["/favicon.ico".into(), "/health".into(), "/favicon.ico".into(), "/logger-client".into()],
            ..HarkConfig::default()
        };
        let opts = cfg.normalize().unwrap();
        assert_eq!(opts.filter, vec!["/favicon.ico", "/health", "/logger-client"]);
    }

    #[test]
    fn numeric_indent_becomes_spaces() {
        let cfg = HarkConfig {
            indent: Some(Indent::Spaces(3)),
            ..HarkConfig::default()
        };
        assert_eq!(cfg.normalize().unwrap().indent, "   ");
    }

    #[test]
    fn literal_indent_is_kept() {
        let cfg = HarkConfig {
            indent: Some(Indent::Literal("\t| ".into())),
            ..HarkConfig::default()
        };
        assert_eq!(cfg.normalize().unwrap().indent, "\t| ");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cfg = HarkConfig {
            timeout_ms: 0,
            ..HarkConfig::default()
        };
        assert!(matches!(cfg.normalize(), Err(HarkError::Config(_))));
    }

    #[test]
    fn bad_broadcast_addr_rejected_only_in_broadcast_mode() {
        let mut cfg = HarkConfig {
            broadcast_addr: "not-an-addr".into(),
            ..HarkConfig::default()
        };
        assert!(cfg.normalize().is_ok());
        cfg.sink = SinkKind::Broadcast;
        assert!(matches!(cfg.normalize(), Err(HarkError::Config(_))));
    }

    #[test]
    fn unmapped_kinds_fall_back_to_reset() {
        let mut cfg = HarkConfig::default();
        cfg.colors.insert(Kind::Request, "red".into());
        let opts = cfg.normalize().unwrap();
        assert_eq!(opts.color_of(Kind::Request), "red");
        assert_eq!(opts.color_of(Kind::Response), "reset");
        assert_eq!(opts.background_of(Kind::Request), "reset");
    }

    // ── HarkConfig::load() ────────────────────────────────────────

    #[test]
    fn load_from_valid_yaml_overrides_defaults() {
        let yaml = r#"
timeout_ms: 200
indent: 3
multiline: false
filter:
  - "/favicon.ico"
colors:
  request: red
  response: green
  sql: yellow
  meta: gray
backgrounds:
  meta: white
sink: broadcast
"#;
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(tmpfile, "{yaml}").unwrap();
        let cfg = HarkConfig::load(tmpfile.path()).unwrap();
        assert_eq!(cfg.timeout_ms, 200);
        assert_eq!(cfg.indent, Some(Indent::Spaces(3)));
        assert!(!cfg.multiline);
        assert_eq!(cfg.sink, SinkKind::Broadcast);
        assert_eq!(cfg.colors.get(&Kind::Sql).map(String::as_str), Some("yellow"));
        assert_eq!(cfg.backgrounds.get(&Kind::Meta).map(String::as_str), Some("white"));
        // Defaults still apply for unspecified fields
        assert!(!cfg.json_multiline);
        assert_eq!(cfg.max_body_bytes, 1024 * 1024);
    }

    #[test]
    fn load_yaml_with_string_indent() {
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(tmpfile, "indent: \"--\"\n").unwrap();
        let cfg = HarkConfig::load(tmpfile.path()).unwrap();
        assert_eq!(cfg.indent, Some(Indent::Literal("--".into())));
    }

    #[test]
    fn load_yaml_with_unknown_sink_fails() {
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(tmpfile, "sink: carrier-pigeon\n").unwrap();
        assert!(matches!(HarkConfig::load(tmpfile.path()), Err(HarkError::Config(_))));
    }
}
