//! Text helpers shared by the prompt builders and feed collectors.

/// Truncate to at most `max_chars` characters (not bytes — titles and
/// descriptions are Vietnamese, so byte slicing would panic mid-codepoint).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Crude HTML-to-text: drop everything between `<` and `>`, decode the
/// handful of entities feeds actually emit, collapse whitespace. Good enough
/// for feed descriptions and article bodies destined for an LLM prompt.
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    let decoded = out
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "Thị trường chứng khoán";
        assert_eq!(truncate_chars(text, 3), "Thị");
        assert_eq!(truncate_chars(text, 1000), text);
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn strip_tags_flattens_markup() {
        let html = "<p>Giá vàng <b>tăng</b> mạnh&nbsp;&amp; USD giảm</p>";
        assert_eq!(strip_tags(html), "Giá vàng tăng mạnh & USD giảm");
    }
}
