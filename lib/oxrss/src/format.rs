/// Scores how likely a resource is to be a RSS or Atom feed.
///
/// `suffix` is a file name extension without the leading dot and `identifier` any name of the
/// resource (an URL or a file path). Higher is more likely, `0` means no hint at all.
///
/// ```
/// use oxrss::recognize_syntax;
///
/// assert_eq!(recognize_syntax(Some("rss"), None), 7);
/// assert!(
///     recognize_syntax(None, Some("http://example.com/rss2/feed"))
///         > recognize_syntax(None, Some("http://example.com/feed.xml"))
/// );
/// assert_eq!(recognize_syntax(Some("ttl"), Some("data.ttl")), 0);
/// ```
pub fn recognize_syntax(suffix: Option<&str>, identifier: Option<&str>) -> u8 {
    let mut score = match suffix {
        Some("rss") => 7,
        Some("atom") => 5,
        Some("xml") => 4,
        _ => 0,
    };
    if let Some(identifier) = identifier {
        if identifier.contains("rss2")
            || (suffix.is_none() && (identifier.contains("rss") || identifier.contains("atom")))
            || identifier.contains("rss.xml")
            || identifier.contains("atom.xml")
        {
            score += if identifier.contains("rss2") { 5 } else { 4 };
        }
    }
    score
}
