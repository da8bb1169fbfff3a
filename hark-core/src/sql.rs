/// Statement prefixes recognised as SQL. The trailing space is part of the
/// keyword, so `selected` or a bare `SELECT` do not match.
const SQL_KEYWORDS: [&str; 5] = ["SELECT ", "INSERT ", "UPDATE ", "DELETE ", "WITH "];

/// Continuation indent for wrapped SQL lines, aligned past the `⤷ ` sign.
const SQL_CONTINUATION: &str = "  ";

/// Returns true when the (already trimmed) text looks like a SQL statement.
pub fn is_sql(text: &str) -> bool {
    let upper = text.to_uppercase();
    SQL_KEYWORDS.iter().any(|kw| upper.starts_with(kw))
}

/// Re-lay a SQL statement. Every line is trimmed and blank lines dropped;
/// multiline mode joins lines with a newline plus continuation indent,
/// single-line mode collapses them onto one line.
pub fn format_sql(text: &str, multiline: bool, indent: &str) -> String {
    let lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    if multiline {
        let joiner = format!("\n{indent}{SQL_CONTINUATION}");
        lines.collect::<Vec<_>>().join(&joiner)
    } else {
        lines.collect::<Vec<_>>().join(" ")
    }
}
