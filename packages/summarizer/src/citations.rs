use std::sync::LazyLock;

use regex::Regex;

static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[0-9,\s]+\]").expect("valid numeric citation pattern"));
static AUTHOR_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\([A-Za-z\s]+(?:et al\.)?,\s*\d{4}\)").expect("valid author-year pattern")
});

/// Remove bracketed numeric citations (`[1]`, `[2, 3]`) and parenthesised
/// author-year citations (`(Smith, 2020)`, `(Smith et al., 2020)`), then
/// collapse whitespace.
pub fn strip_citations(text: &str) -> String {
    let text = NUMERIC.replace_all(text, "");
    let text = AUTHOR_YEAR.replace_all(&text, "");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .replace(" .", ".")
        .replace(" ,", ",")
}
