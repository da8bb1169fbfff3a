use crate::callsite::CallSite;
use crate::config::Options;
use crate::entry::{Kind, LogArg, LogEntry};
use crate::error::HarkError;
use crate::render::{Rendered, render};
use crate::sql::{format_sql, is_sql};
use crate::tokenizer::{Token, tokenize};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Sign drawn before the terminal `info` entry.
pub const INFO_SIGN: &str = "=";

/// What the middleware saw of the inbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLine {
    pub method: String,
    pub path: String,
    /// Query parameters for GET, the parsed body otherwise.
    pub payload: Value,
}

/// Ordered log entries for one HTTP exchange.
///
/// Created when the request enters the middleware and consumed by the single
/// terminal render. Insertion order is render order.
#[derive(Debug, Clone)]
pub struct LogRecordBuffer {
    entries: Vec<LogEntry>,
    has_debug_data: bool,
    has_data: bool,
    start_time: Option<DateTime<Utc>>,
    options: Arc<Options>,
}

impl LogRecordBuffer {
    /// Open a buffer with the request line as its first entry.
    pub fn start(request: &RequestLine, options: Arc<Options>) -> Result<Self, HarkError> {
        let mut line = format!("{} {}", request.method, request.path);
        if let Some(payload) = compact_payload(&request.payload)? {
            line.push(' ');
            line.push_str(&payload);
        }

        Ok(Self {
            entries: vec![LogEntry::text(Kind::Request, line)],
            has_debug_data: false,
            has_data: false,
            start_time: None,
            options,
        })
    }

    /// An empty buffer, for exchanges assembled by hand.
    pub fn empty(options: Arc<Options>) -> Self {
        Self {
            entries: Vec::new(),
            has_debug_data: false,
            has_data: false,
            start_time: None,
            options,
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn has_debug_data(&self) -> bool {
        self.has_debug_data
    }

    pub fn has_data(&self) -> bool {
        self.has_data
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Record one `log()` call: every argument becomes a part of a single
    /// composite `log` entry, in call order. A call with no arguments
    /// records nothing.
    pub fn append_log<I>(&mut self, args: I, site: Option<CallSite>) -> Result<(), HarkError>
    where
        I: IntoIterator<Item = LogArg>,
    {
        let parts = args
            .into_iter()
            .map(|arg| self.log_part(arg))
            .collect::<Result<Vec<_>, _>>()?;

        self.attach_debug(site);
        if let Some(entry) = LogEntry::composite(Kind::Log, parts) {
            self.entries.push(entry);
        }
        Ok(())
    }

    /// Record the response payload.
    pub fn append_response(&mut self, body: LogArg, site: Option<CallSite>) -> Result<(), HarkError> {
        let text = match body {
            LogArg::Text(text) => text,
            LogArg::Json(value) => self.serialize_json(&value)?,
        };
        self.attach_debug(site);
        self.entries.push(LogEntry::text(Kind::Response, text));
        self.has_data = true;
        Ok(())
    }

    /// Record a response that was served from a file.
    pub fn append_response_file(&mut self, path: impl Into<String>, site: Option<CallSite>) {
        self.attach_debug(site);
        self.entries.push(LogEntry::text(Kind::ResponseFile, path));
        self.has_data = true;
    }

    /// Close the exchange: synthesize an empty response when nothing was
    /// sent, then append the status/timing `info` entry.
    pub fn finalize(&mut self, status: u16) {
        self.finalize_at(status, Utc::now());
    }

    pub fn finalize_at(&mut self, status: u16, now: DateTime<Utc>) {
        if !self.has_data {
            self.entries.push(LogEntry::text(Kind::Response, ""));
            self.has_data = true;
        }

        let mut parts = Vec::with_capacity(2);
        if status != 200 {
            parts.push(LogEntry::text(Kind::for_status(status), format!("({status})")));
        }
        if let Some(start) = self.start_time {
            let elapsed = (now - start).num_milliseconds().max(0);
            parts.push(LogEntry::text(Kind::Time, format!("{elapsed}ms")));
        }
        if let Some(info) = LogEntry::composite(Kind::Info, parts) {
            self.entries.push(info.with_sign(INFO_SIGN));
        }
    }

    /// Close the exchange because no response arrived in time.
    pub fn timeout_notice(&mut self, timeout_ms: u128) {
        self.entries.push(LogEntry::text(
            Kind::Meta,
            format!("[NO RESPONSE AFTER {timeout_ms}ms]"),
        ));
    }

    pub fn tokenize(&self) -> Vec<Token> {
        tokenize(self, &self.options)
    }

    pub fn render(&self) -> Rendered {
        render(self.tokenize())
    }

    fn log_part(&self, arg: LogArg) -> Result<LogEntry, HarkError> {
        match arg {
            LogArg::Text(text) => {
                let trimmed = text.trim();
                if is_sql(trimmed) {
                    let sql = format_sql(trimmed, self.options.multiline, &self.options.indent);
                    Ok(LogEntry::text(Kind::Sql, sql))
                } else {
                    Ok(LogEntry::text(Kind::Log, trimmed))
                }
            }
            LogArg::Json(value) => Ok(LogEntry::text(Kind::Log, self.serialize_json(&value)?)),
        }
    }

    fn serialize_json(&self, value: &Value) -> Result<String, HarkError> {
        if self.options.json_multiline {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }

    /// Insert call-site info once per buffer, ahead of every non-request entry.
    fn attach_debug(&mut self, site: Option<CallSite>) {
        if self.has_debug_data {
            return;
        }
        let Some(site) = site else {
            return;
        };
        let at = self
            .entries
            .iter()
            .take_while(|e| e.kind == Kind::Request)
            .count();
        self.entries.insert(at, LogEntry::text(Kind::Debug, site.to_string()));
        self.has_debug_data = true;
        self.start_time = Some(Utc::now());
    }
}

/// Compact JSON of the request payload, or `None` when there is nothing to show.
fn compact_payload(payload: &Value) -> Result<Option<String>, HarkError> {
    if payload.is_null() {
        return Ok(None);
    }
    let json = serde_json::to_string(payload)?;
    if json == "{}" {
        return Ok(None);
    }
    Ok(Some(json))
}
