//! Browser-side rendering of pushed exchanges.
//!
//! The embedded `logger-client.js` receives `WirePayload` frames and prints
//! them with `console.log("%c...", styles...)`. `render_console` builds the
//! same call in Rust so the palette and escaping can be tested here.

use crate::broadcaster::WirePayload;
use hark_core::Kind;
use rust_embed::RustEmbed;

/// Port placeholder substituted when the script is served.
const PORT_PLACEHOLDER: &str = "__HARK_WS_PORT__";

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

/// The browser client script, wired to the push server on `ws_port`.
pub fn client_script(ws_port: u16) -> Option<String> {
    let file = Assets::get("logger-client.js")?;
    let source = String::from_utf8_lossy(&file.data);
    Some(source.replace(PORT_PLACEHOLDER, &ws_port.to_string()))
}

/// Arguments of one `console.log` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleCall {
    pub format: String,
    pub styles: Vec<String>,
}

pub fn console_color(kind: Kind) -> &'static str {
    match kind {
        Kind::Request => "red",
        Kind::Response => "green",
        Kind::Sql => "darkorange",
        Kind::StatusClient => "red",
        Kind::StatusServer => "white",
        Kind::Meta => "red",
        _ => "black",
    }
}

pub fn console_background(kind: Kind) -> &'static str {
    match kind {
        Kind::StatusClient => "yellow",
        Kind::StatusServer => "red",
        Kind::Meta => "yellow",
        _ => "transparent",
    }
}

/// One `%c` segment per token, styled from the browser palette.
pub fn render_console(payload: &WirePayload) -> ConsoleCall {
    let mut format = String::new();
    let mut styles = Vec::with_capacity(payload.tokens.len());
    for token in &payload.tokens {
        format.push_str("%c");
        // A literal `%` would start a new console directive.
        format.push_str(&token.value().replace('%', "%%"));
        styles.push(format!(
            "color:{};background:{}",
            console_color(token.kind()),
            console_background(token.kind())
        ));
    }
    ConsoleCall { format, styles }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hark_core::Token;

    #[test]
    fn one_style_per_token() {
        let payload = WirePayload {
            text: "GET / ⇒ [EMPTY]".into(),
            tokens: vec![
                Token::new(Kind::Request, "GET /", "reset", "reset"),
                Token::new(Kind::Sign, " ⇒ ", "reset", "reset"),
                Token::new(Kind::Meta, "[EMPTY]", "reset", "reset"),
            ],
        };
        let call = render_console(&payload);
        assert_eq!(call.format, "%cGET /%c ⇒ %c[EMPTY]");
        assert_eq!(
            call.styles,
            vec![
                "color:red;background:transparent",
                "color:black;background:transparent",
                "color:red;background:yellow",
            ]
        );
    }

    #[test]
    fn percent_signs_are_escaped() {
        let payload = WirePayload {
            text: "100%".into(),
            tokens: vec![Token::new(Kind::Log, "100%d", "reset", "reset")],
        };
        assert_eq!(render_console(&payload).format, "%c100%%d");
    }

    #[test]
    fn server_status_palette() {
        assert_eq!(console_color(Kind::StatusServer), "white");
        assert_eq!(console_background(Kind::StatusServer), "red");
        assert_eq!(console_color(Kind::Sql), "darkorange");
        assert_eq!(console_background(Kind::Log), "transparent");
    }

    #[test]
    fn script_is_embedded_with_port() {
        let script = client_script(9001).unwrap();
        assert!(script.contains(":9001"));
        assert!(!script.contains(PORT_PLACEHOLDER));
        assert!(script.contains("window.logger"));
    }
}
