//! Widget embed snippet generation
//!
//! Produces the `<script>` tag site owners paste into their pages to
//! load the hosted chat widget. The publish id travels as a query
//! parameter, so it is percent-escaped; everything else in the snippet
//! is static.

/// Hosted widget bundle
pub const WIDGET_SCRIPT_BASE: &str = "https://adrenal.ai/chatbot.min.js";

/// URL of the widget bundle for one published chatbot
pub fn script_url(publish_id: &str) -> String {
    format!("{WIDGET_SCRIPT_BASE}?c={}", escape_query(publish_id))
}

/// Complete embed snippet for one published chatbot
pub fn embed_snippet(publish_id: &str) -> String {
    format!(
        r#"<script src="{}" async defer></script>"#,
        script_url(publish_id)
    )
}

/// Percent-escape a query parameter value. Unreserved characters pass
/// through unchanged; everything else, non-ASCII included, is escaped
/// byte-wise.
fn escape_query(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{byte:02X}"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_url_carries_publish_id() {
        assert_eq!(
            script_url("pub-1"),
            "https://adrenal.ai/chatbot.min.js?c=pub-1"
        );
    }

    #[test]
    fn test_embed_snippet_is_async_script_tag() {
        assert_eq!(
            embed_snippet("pub-1"),
            r#"<script src="https://adrenal.ai/chatbot.min.js?c=pub-1" async defer></script>"#
        );
    }

    #[test]
    fn test_publish_id_is_percent_escaped() {
        assert_eq!(
            script_url("a b&c\"d"),
            "https://adrenal.ai/chatbot.min.js?c=a%20b%26c%22d"
        );
        // Non-ASCII escapes byte-wise as UTF-8.
        assert_eq!(script_url("é"), "https://adrenal.ai/chatbot.min.js?c=%C3%A9");
    }

    #[test]
    fn test_unreserved_characters_pass_through() {
        assert_eq!(escape_query("Az09-_.~"), "Az09-_.~");
    }
}
