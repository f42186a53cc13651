//! Decoding of the HTML entities allowed in script text.
//!
//! Pipeline definitions are often authored inside XML or HTML tooling, so a
//! script like `Amount &gt; 0 &amp;&amp; Flag` must read as `Amount > 0 && Flag`
//! before lexing. Only the five predefined entities are recognized.

use std::borrow::Cow;

const ENTITIES: [(&str, &str); 4] = [
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
];

/// Decodes `&lt; &gt; &quot; &apos;` and then `&amp;`.
///
/// `&amp;` goes last, so `&amp;lt;` decodes to the literal text `&lt;`
/// rather than to `<`.
///
/// ```
/// use quill_lang::entities::decode_entities;
///
/// assert_eq!(decode_entities("a &lt;= b &amp;&amp; c"), "a <= b && c");
/// assert_eq!(decode_entities("&amp;lt;"), "&lt;");
/// ```
pub fn decode_entities(script: &str) -> Cow<'_, str> {
    if !script.contains('&') {
        return Cow::Borrowed(script);
    }

    let mut decoded = script.to_string();
    for (entity, text) in ENTITIES {
        if decoded.contains(entity) {
            decoded = decoded.replace(entity, text);
        }
    }
    Cow::Owned(decoded.replace("&amp;", "&"))
}

#[test]
fn test_plain_script_is_borrowed() {
    assert!(matches!(decode_entities("Add(1, 2)"), Cow::Borrowed(_)));
}

#[test]
fn test_all_entities() {
    assert_eq!(
        decode_entities("&lt;&gt;&quot;&apos;&amp;"),
        "<>\"'&"
    );
}
