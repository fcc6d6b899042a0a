use once_cell::sync::Lazy;
use regex::Regex;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

const ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    // last so "&amp;lt;" decodes to the literal text "&lt;"
    ("&amp;", "&"),
];

/// Plain-text rendition of a rich-text description, used for search.
pub fn strip_markup(input: &str) -> String {
    let mut text = TAG.replace_all(input, "").into_owned();
    for (entity, replacement) in ENTITIES {
        if text.contains(entity) {
            text = text.replace(entity, replacement);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("<p>Buy <strong>oat</strong> milk</p>", "Buy oat milk")]
    #[case("plain text", "plain text")]
    #[case("<ol><li>one</li><li>two</li></ol>", "onetwo")]
    #[case("fish&nbsp;&amp;&nbsp;chips", "fish & chips")]
    #[case("&amp;lt;b&amp;gt;", "&lt;b&gt;")]
    #[case("", "")]
    fn strips_tags_and_decodes_entities(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_markup(input), expected);
    }

    #[test]
    fn tag_attributes_do_not_leak_into_text() {
        let html = r#"<a href="https://example.com/milk">link</a>"#;
        assert_eq!(strip_markup(html), "link");
    }
}
