use super::render::escape_html;

/// Snippet a site owner pastes into their page to mount the widget.
pub fn snippet(script_url: &str, chat_id: &str) -> String {
    format!(
        "<script src=\"{}\"></script>\n<script>initChatWidget('{}');</script>",
        escape_html(script_url),
        escape_js_string(chat_id)
    )
}

/// Escape for a single-quoted JS literal that sits inside an HTML
/// `<script>` element.
fn escape_js_string(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => output.push_str("\\\\"),
            '\'' => output.push_str("\\'"),
            '"' => output.push_str("\\\""),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '<' => output.push_str("\\u003c"),
            '>' => output.push_str("\\u003e"),
            '&' => output.push_str("\\u0026"),
            '\u{2028}' => output.push_str("\\u2028"),
            '\u{2029}' => output.push_str("\\u2029"),
            _ => output.push(ch),
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_snippet() {
        assert_eq!(
            snippet("https://cdn.example/widget.js", "abc123"),
            "<script src=\"https://cdn.example/widget.js\"></script>\n<script>initChatWidget('abc123');</script>"
        );
    }

    #[test]
    fn hostile_chat_id_cannot_break_out() {
        let out = snippet("/widget.js", "x');</script><script>alert(1)//");
        assert_eq!(out.matches("</script>").count(), 2);
        assert!(out.contains("initChatWidget('x\\');\\u003c/script\\u003e"));
    }

    #[test]
    fn script_url_is_attribute_escaped() {
        let out = snippet("/w.js?a=1&b=\"2\"", "id");
        assert!(out.contains("src=\"/w.js?a=1&amp;b=&quot;2&quot;\""));
    }
}
