//! Utility functions.
//!
//! HTML helpers for messages sent with `ParseMode::Html`.

use crate::database::Author;

/// Escape text for Telegram HTML.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Clickable mention of an author, with @username when known.
pub fn author_mention(author: &Author) -> String {
    let link = format!(
        "<a href=\"tg://user?id={}\">{}</a>",
        author.user_id,
        html_escape(&author.full_name())
    );
    match &author.username {
        Some(username) => format!("{} (@{})", link, html_escape(username)),
        None => link,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<b>&</b>"), "&lt;b&gt;&amp;&lt;/b&gt;");
    }

    #[test]
    fn test_author_mention() {
        let mut author = Author::new(42, "Ann <3");
        assert_eq!(
            author_mention(&author),
            "<a href=\"tg://user?id=42\">Ann &lt;3</a>"
        );

        author.username = Some("ann".into());
        author.last_name = Some("Lee".into());
        assert_eq!(
            author_mention(&author),
            "<a href=\"tg://user?id=42\">Ann &lt;3 Lee</a> (@ann)"
        );
    }
}
