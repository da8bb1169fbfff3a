//! Flattens a log-record buffer into typed, styled tokens.
//!
//! Layout rules:
//! - the top-level entry list is laid out like a composite: the first entry
//!   has no separator, every later one gets `indent + sign + " "` (multiline)
//!   or `" " + sign + " "` (single-line);
//! - nested parts of a `log` composite follow the same rule, except that in
//!   multiline mode the separator starts with a newline;
//! - `info` parts render inline, separated by a single space;
//! - in multiline mode every top-level entry ends with a `reset` newline.

use crate::buffer::LogRecordBuffer;
use crate::config::Options;
use crate::entry::{EntryValue, Kind, LogEntry};
use serde::{Deserialize, Serialize};

pub const SIGN_MULTILINE: &str = "⤷";
pub const SIGN_INLINE: &str = "→";
pub const SIGN_RESPONSE: &str = "⇒";

/// A typed, styled fragment of rendered output. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    kind: Kind,
    value: String,
    color: String,
    background: String,
}

impl Token {
    pub fn new(kind: Kind, value: impl Into<String>, color: impl Into<String>, background: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            color: color.into(),
            background: background.into(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn background(&self) -> &str {
        &self.background
    }
}

/// Flatten `buffer` into tokens. Pure: the same buffer always yields the
/// same sequence.
pub fn tokenize(buffer: &LogRecordBuffer, options: &Options) -> Vec<Token> {
    tokenize_entries(buffer.entries(), options)
}

pub fn tokenize_entries(entries: &[LogEntry], options: &Options) -> Vec<Token> {
    let mut tokenizer = Tokenizer {
        options,
        tokens: Vec::with_capacity(entries.len() * 3),
    };
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            tokenizer.separator(entry, false);
        }
        tokenizer.entry(entry);
        if options.multiline {
            tokenizer.push(Kind::Reset, "\n");
        }
    }
    tokenizer.tokens
}

struct Tokenizer<'a> {
    options: &'a Options,
    tokens: Vec<Token>,
}

impl Tokenizer<'_> {
    fn entry(&mut self, entry: &LogEntry) {
        match &entry.value {
            EntryValue::Parts(parts) if entry.kind == Kind::Info => self.inline_parts(parts),
            EntryValue::Parts(parts) => {
                for (j, part) in parts.iter().enumerate() {
                    if j > 0 {
                        self.separator(part, true);
                    }
                    self.entry(part);
                }
            }
            EntryValue::Text(path) if entry.kind == Kind::ResponseFile => {
                self.push(Kind::ResponseFile, "file:");
                self.push(Kind::Response, path);
            }
            EntryValue::Text(text) if entry.kind == Kind::Response && text.is_empty() => {
                self.push(Kind::Response, "");
                self.push(Kind::Meta, "[EMPTY]");
            }
            EntryValue::Text(text) => self.push(entry.kind, text),
        }
    }

    fn inline_parts(&mut self, parts: &[LogEntry]) {
        for (j, part) in parts.iter().enumerate() {
            if j > 0 {
                self.push(Kind::Reset, " ");
            }
            match &part.value {
                EntryValue::Text(text) => self.push(part.kind, text),
                EntryValue::Parts(nested) => self.inline_parts(nested),
            }
        }
    }

    fn separator(&mut self, entry: &LogEntry, nested: bool) {
        let multiline = self.options.multiline;
        let sign = entry
            .sign
            .as_deref()
            .unwrap_or_else(|| default_sign(entry.kind, multiline));
        let indent = &self.options.indent;
        let value = match (multiline, nested) {
            (false, _) => format!(" {sign} "),
            (true, false) => format!("{indent}{sign} "),
            (true, true) => format!("\n{indent}{sign} "),
        };
        self.push(Kind::Sign, value);
    }

    fn push(&mut self, kind: Kind, value: impl Into<String>) {
        let color = self.options.color_of(kind);
        let background = self.options.background_of(kind);
        self.tokens.push(Token::new(kind, value, color, background));
    }
}

fn default_sign(kind: Kind, multiline: bool) -> &'static str {
    if kind.is_response() {
        SIGN_RESPONSE
    } else if multiline {
        SIGN_MULTILINE
    } else {
        SIGN_INLINE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline() -> Options {
        Options {
            multiline: false,
            ..Options::default()
        }
    }

    fn values(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(Token::value).collect()
    }

    #[test]
    fn first_entry_has_no_separator() {
        let entries = [LogEntry::text(Kind::Request, "GET /")];
        let tokens = tokenize_entries(&entries, &inline());
        assert_eq!(values(&tokens), vec!["GET /"]);
    }

    #[test]
    fn response_uses_double_arrow_in_both_modes() {
        let entries = [
            LogEntry::text(Kind::Request, "GET /"),
            LogEntry::text(Kind::Response, "Hello"),
        ];
        assert_eq!(values(&tokenize_entries(&entries, &inline())), vec!["GET /", " ⇒ ", "Hello"]);
        assert_eq!(
            values(&tokenize_entries(&entries, &Options::default())),
            vec!["GET /", "\n", "⇒ ", "Hello", "\n"]
        );
    }

    #[test]
    fn sign_override_wins() {
        let entries = [
            LogEntry::text(Kind::Request, "GET /"),
            LogEntry::text(Kind::Meta, "note").with_sign("!"),
        ];
        assert_eq!(values(&tokenize_entries(&entries, &inline())), vec!["GET /", " ! ", "note"]);
    }

    #[test]
    fn nested_log_parts_break_lines_in_multiline_mode() {
        let opts = Options {
            indent: "  ".into(),
            ..Options::default()
        };
        let log = LogEntry::composite(
            Kind::Log,
            vec![LogEntry::text(Kind::Log, "a"), LogEntry::text(Kind::Sql, "SELECT 1")],
        )
        .unwrap();
        let entries = [LogEntry::text(Kind::Request, "GET /"), log];
        let tokens = tokenize_entries(&entries, &opts);
        assert_eq!(values(&tokens), vec!["GET /", "\n", "  ⤷ ", "a", "\n  ⤷ ", "SELECT 1", "\n"]);
        assert_eq!(tokens[5].kind(), Kind::Sql);
        assert_eq!(tokens[4].kind(), Kind::Sign);
    }

    #[test]
    fn info_parts_render_inline() {
        let info = LogEntry::composite(
            Kind::Info,
            vec![LogEntry::text(Kind::StatusClient, "(404)"), LogEntry::text(Kind::Time, "3ms")],
        )
        .unwrap()
        .with_sign("=");
        let entries = [LogEntry::text(Kind::Request, "GET /404"), info];
        let tokens = tokenize_entries(&entries, &inline());
        assert_eq!(values(&tokens), vec!["GET /404", " = ", "(404)", " ", "3ms"]);
        assert_eq!(tokens[2].kind(), Kind::StatusClient);
        assert_eq!(tokens[3].kind(), Kind::Reset);
    }

    #[test]
    fn empty_response_gets_marker() {
        let entries = [LogEntry::text(Kind::Request, "GET /"), LogEntry::text(Kind::Response, "")];
        let tokens = tokenize_entries(&entries, &inline());
        assert_eq!(values(&tokens), vec!["GET /", " ⇒ ", "", "[EMPTY]"]);
        assert_eq!(tokens[2].kind(), Kind::Response);
        assert_eq!(tokens[3].kind(), Kind::Meta);
    }

    #[test]
    fn response_file_emits_literal_then_path() {
        let entries = [
            LogEntry::text(Kind::Request, "GET /readme"),
            LogEntry::text(Kind::ResponseFile, "/srv/README.md"),
        ];
        let tokens = tokenize_entries(&entries, &inline());
        assert_eq!(values(&tokens), vec!["GET /readme", " ⇒ ", "file:", "/srv/README.md"]);
        assert_eq!(tokens[2].kind(), Kind::ResponseFile);
        assert_eq!(tokens[3].kind(), Kind::Response);
    }

    #[test]
    fn colors_resolve_by_kind_with_reset_fallback() {
        let mut opts = inline();
        opts.colors.insert(Kind::Request, "red".into());
        opts.backgrounds.insert(Kind::Meta, "white".into());
        let entries = [LogEntry::text(Kind::Request, "GET /"), LogEntry::text(Kind::Response, "")];
        let tokens = tokenize_entries(&entries, &opts);
        assert_eq!((tokens[0].color(), tokens[0].background()), ("red", "reset"));
        assert_eq!((tokens[2].color(), tokens[2].background()), ("reset", "reset"));
        assert_eq!((tokens[3].color(), tokens[3].background()), ("reset", "white"));
    }

    #[test]
    fn token_serializes_with_four_fields() {
        let token = Token::new(Kind::StatusServer, "(500)", "white", "red");
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "status-server", "value": "(500)", "color": "white", "background": "red"})
        );
    }
}
