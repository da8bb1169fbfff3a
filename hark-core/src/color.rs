use owo_colors::{AnsiColors, OwoColorize, Style};

/// Neutral style name: no foreground/background styling.
pub const NEUTRAL: &str = "reset";

/// Wrap `text` in ANSI styling for a (color, background) pair.
///
/// Names follow chalk conventions (`red`, `gray`, `redBright`, `bgWhite`).
/// Unknown or neutral names apply no styling.
pub fn style(color: &str, background: &str, text: &str) -> String {
    let fg = parse_color(color);
    let bg = parse_background(background);
    if fg.is_none() && bg.is_none() {
        return text.to_string();
    }

    let mut style = Style::new();
    if let Some(fg) = fg {
        style = style.color(fg);
    }
    if let Some(bg) = bg {
        style = style.on_color(bg);
    }
    text.style(style).to_string()
}

fn parse_background(name: &str) -> Option<AnsiColors> {
    let key = normalize(name);
    let key = key.strip_prefix("bg").filter(|rest| !rest.is_empty()).unwrap_or(&key);
    color_by_key(key)
}

fn parse_color(name: &str) -> Option<AnsiColors> {
    color_by_key(&normalize(name))
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn color_by_key(key: &str) -> Option<AnsiColors> {
    let color = match key {
        "black" => AnsiColors::Black,
        "red" => AnsiColors::Red,
        "green" => AnsiColors::Green,
        "yellow" => AnsiColors::Yellow,
        "blue" => AnsiColors::Blue,
        "magenta" => AnsiColors::Magenta,
        "cyan" => AnsiColors::Cyan,
        "white" => AnsiColors::White,
        "gray" | "grey" | "blackbright" | "brightblack" => AnsiColors::BrightBlack,
        "redbright" | "brightred" => AnsiColors::BrightRed,
        "greenbright" | "brightgreen" => AnsiColors::BrightGreen,
        "yellowbright" | "brightyellow" => AnsiColors::BrightYellow,
        "bluebright" | "brightblue" => AnsiColors::BrightBlue,
        "magentabright" | "brightmagenta" => AnsiColors::BrightMagenta,
        "cyanbright" | "brightcyan" => AnsiColors::BrightCyan,
        "whitebright" | "brightwhite" => AnsiColors::BrightWhite,
        _ => return None,
    };
    Some(color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_pair_leaves_text_untouched() {
        assert_eq!(style("reset", "reset", "plain"), "plain");
        assert_eq!(style("", "", "plain"), "plain");
    }

    #[test]
    fn unknown_names_fall_back_to_neutral() {
        assert_eq!(style("chartreuse", "transparent", "x"), "x");
    }

    #[test]
    fn foreground_color_wraps_text() {
        let out = style("red", "reset", "GET /");
        assert_ne!(out, "GET /");
        assert!(out.contains("\x1b[31m"), "{out:?}");
        assert_eq!(strip_ansi_escapes::strip_str(&out), "GET /");
    }

    #[test]
    fn background_accepts_plain_and_bg_prefixed_names() {
        let a = style("reset", "white", "[EMPTY]");
        let b = style("reset", "bgWhite", "[EMPTY]");
        assert_eq!(a, b);
        assert!(a.contains("\x1b[47m"), "{a:?}");
    }

    #[test]
    fn chalk_style_bright_names() {
        assert_eq!(parse_color("gray"), Some(AnsiColors::BrightBlack));
        assert_eq!(parse_color("redBright"), Some(AnsiColors::BrightRed));
        assert_eq!(parse_color("bright-red"), Some(AnsiColors::BrightRed));
        assert_eq!(parse_background("bgBlueBright"), Some(AnsiColors::BrightBlue));
    }
}
