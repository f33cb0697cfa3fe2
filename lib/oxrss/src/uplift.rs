use crate::date::format_timestamp;
use crate::model::{Feed, FieldValue, Item};
use crate::vocab::Field;
use tracing::debug;

/// Date parser returning a Unix timestamp.
pub(crate) type DateParser = fn(&str) -> Option<i64>;

/// Adds to each non-empty node the fields derived from other ones:
/// `dc:date` from `pubDate` (only with a date parser) and `content:encoded` from `description`.
///
/// Existing values are never overwritten so running it again changes nothing.
pub(crate) fn uplift_fields(feed: &mut Feed, date_parser: Option<DateParser>) {
    for item in feed.nodes_mut() {
        if item.is_empty() {
            continue;
        }
        if let Some(date_parser) = date_parser {
            uplift(item, Field::PubDate, Field::DcDate, |date| {
                let timestamp = date_parser(date);
                if timestamp.is_none() {
                    debug!(date, "not uplifting unparsable date");
                }
                format_timestamp(timestamp?)
            });
        }
        uplift(item, Field::Description, Field::ContentEncoded, |text| {
            Some(text.to_owned())
        });
    }
}

fn uplift(item: &mut Item, from: Field, to: Field, convert: impl FnOnce(&str) -> Option<String>) {
    if !item.values(to).is_empty() {
        return;
    }
    let Some(FieldValue::Literal(source)) = item.values(from).first() else {
        return;
    };
    if let Some(derived) = convert(source) {
        item.add_value(to, FieldValue::Literal(derived));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::parse_date;
    use crate::vocab::NodeType;

    fn literal(value: &str) -> FieldValue {
        FieldValue::Literal(value.into())
    }

    fn feed() -> Feed {
        let mut feed = Feed::default();
        let channel = feed.push(NodeType::Channel);
        channel.add_value(Field::PubDate, literal("Sat, 07 Sep 2002 00:00:01 +0000"));
        let item = feed.push(NodeType::Item);
        item.add_value(Field::Description, literal("Hello <b>world</b>"));
        item.add_value(Field::PubDate, literal("not a date"));
        let item = feed.push(NodeType::Item);
        item.add_value(Field::Description, literal("new"));
        item.add_value(Field::ContentEncoded, literal("old"));
        feed
    }

    #[test]
    fn derived_fields() {
        let mut feed = feed();
        uplift_fields(&mut feed, Some(parse_date));
        assert_eq!(
            feed.channel().unwrap().values(Field::DcDate),
            [literal("2002-09-07T00:00:01Z")]
        );
        let first = &feed.items()[0];
        assert!(first.values(Field::DcDate).is_empty());
        assert_eq!(
            first.values(Field::ContentEncoded),
            [literal("Hello <b>world</b>")]
        );
        assert_eq!(
            feed.items()[1].values(Field::ContentEncoded),
            [literal("old")]
        );
    }

    #[test]
    fn without_date_parser() {
        let mut feed = feed();
        uplift_fields(&mut feed, None);
        assert!(feed.channel().unwrap().values(Field::DcDate).is_empty());
        assert_eq!(feed.items()[0].values(Field::ContentEncoded).len(), 1);
    }

    #[test]
    fn idempotent() {
        let mut once = feed();
        uplift_fields(&mut once, Some(parse_date));
        let mut twice = once.clone();
        uplift_fields(&mut twice, Some(parse_date));
        assert_eq!(once, twice);
    }
}
