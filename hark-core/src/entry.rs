use crate::error::HarkError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a log entry or of a rendered token.
///
/// The first eight variants are entry kinds appended to a buffer. `Status*`
/// and `Time` only appear inside the terminal `info` entry. `Sign` and `Reset`
/// are token-only kinds used for separators and layout whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kind {
    Request,
    Log,
    Sql,
    Response,
    ResponseFile,
    Meta,
    Info,
    Debug,
    Status,
    StatusClient,
    StatusServer,
    Time,
    Sign,
    Reset,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Request => "request",
            Kind::Log => "log",
            Kind::Sql => "sql",
            Kind::Response => "response",
            Kind::ResponseFile => "response-file",
            Kind::Meta => "meta",
            Kind::Info => "info",
            Kind::Debug => "debug",
            Kind::Status => "status",
            Kind::StatusClient => "status-client",
            Kind::StatusServer => "status-server",
            Kind::Time => "time",
            Kind::Sign => "sign",
            Kind::Reset => "reset",
        }
    }

    pub fn all() -> &'static [Kind] {
        &[
            Kind::Request,
            Kind::Log,
            Kind::Sql,
            Kind::Response,
            Kind::ResponseFile,
            Kind::Meta,
            Kind::Info,
            Kind::Debug,
            Kind::Status,
            Kind::StatusClient,
            Kind::StatusServer,
            Kind::Time,
            Kind::Sign,
            Kind::Reset,
        ]
    }

    /// Status sub-entry kind for an HTTP status code.
    pub fn for_status(code: u16) -> Kind {
        match code {
            400..=499 => Kind::StatusClient,
            500..=599 => Kind::StatusServer,
            _ => Kind::Status,
        }
    }

    /// `response` and `response-file` parts default to the `⇒` sign.
    pub fn is_response(&self) -> bool {
        matches!(self, Kind::Response | Kind::ResponseFile)
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scalar text, or the ordered nested parts of a composite entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue {
    Text(String),
    Parts(Vec<LogEntry>),
}

/// One recorded unit of exchange activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub kind: Kind,
    pub value: EntryValue,
    /// Separator glyph override, drawn when this entry is not the first part.
    pub sign: Option<String>,
}

impl LogEntry {
    pub fn text(kind: Kind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: EntryValue::Text(value.into()),
            sign: None,
        }
    }

    /// Build a composite entry. Returns `None` for an empty part list so an
    /// empty composite can never be appended.
    pub fn composite(kind: Kind, parts: Vec<LogEntry>) -> Option<Self> {
        if parts.is_empty() {
            return None;
        }
        Some(Self {
            kind,
            value: EntryValue::Parts(parts),
            sign: None,
        })
    }

    pub fn with_sign(mut self, sign: impl Into<String>) -> Self {
        self.sign = Some(sign.into());
        self
    }

    pub fn parts(&self) -> Option<&[LogEntry]> {
        match &self.value {
            EntryValue::Parts(parts) => Some(parts),
            EntryValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            EntryValue::Text(text) => Some(text),
            EntryValue::Parts(_) => None,
        }
    }
}

/// One argument of a `log()` call.
#[derive(Debug, Clone, PartialEq)]
pub enum LogArg {
    Text(String),
    Json(Value),
}

impl LogArg {
    /// Convert any serializable value. Strings and other scalars stay text;
    /// objects and arrays are kept as JSON and serialized at append time.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, HarkError> {
        Ok(serde_json::to_value(value)?.into())
    }
}

impl From<Value> for LogArg {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => LogArg::Text(s),
            Value::Object(_) | Value::Array(_) => LogArg::Json(value),
            scalar => LogArg::Text(scalar.to_string()),
        }
    }
}

impl From<&str> for LogArg {
    fn from(value: &str) -> Self {
        LogArg::Text(value.to_string())
    }
}

impl From<String> for LogArg {
    fn from(value: String) -> Self {
        LogArg::Text(value)
    }
}

impl From<&String> for LogArg {
    fn from(value: &String) -> Self {
        LogArg::Text(value.clone())
    }
}
