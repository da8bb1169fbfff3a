use crate::color;
use crate::tokenizer::Token;
use serde::Serialize;

/// Rendered output of one exchange: the colorized text plus the tokens it
/// was built from, for sinks that need the structured form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendered {
    pub text: String,
    pub tokens: Vec<Token>,
}

/// Concatenate token values, each wrapped in its (color, background) style.
pub fn render(tokens: Vec<Token>) -> Rendered {
    let mut text = String::with_capacity(tokens.iter().map(|t| t.value().len()).sum());
    for token in &tokens {
        if token.value().is_empty() {
            continue;
        }
        text.push_str(&color::style(token.color(), token.background(), token.value()));
    }
    Rendered { text, tokens }
}
