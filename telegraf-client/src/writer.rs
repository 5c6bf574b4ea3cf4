use std::{collections::BTreeMap, fmt::Write as _};

use indexmap::IndexMap;

use crate::point::{FieldValue, Point};

/// Appends the line-protocol encoding of `point` to `buf`.
///
/// The sender's static tags are merged with the point's own tags; on a key collision the
/// point-level value wins. The merged set is rendered sorted by key, which collectors index
/// noticeably faster, and any tag with an empty value is omitted entirely. Fields keep their
/// insertion order. Encoding never fails: every invariant it relies on is checked when the
/// point is built.
pub(crate) fn encode_point(point: &Point, static_tags: &IndexMap<String, String>, buf: &mut String) {
    push_escaped_name(point.measurement(), buf);

    let mut merged: BTreeMap<&str, &str> = BTreeMap::new();
    for (key, value) in static_tags {
        merged.insert(key.as_str(), value.as_str());
    }
    for (key, value) in point.tags() {
        merged.insert(key.as_str(), value.as_str());
    }

    for (key, value) in merged {
        if value.is_empty() {
            continue;
        }

        buf.push(',');
        push_escaped_name(key, buf);
        buf.push('=');
        push_escaped_name(value, buf);
    }

    let mut field_delim = ' ';
    for (key, value) in point.fields() {
        buf.push(field_delim);
        field_delim = ',';

        push_escaped_name(key, buf);
        buf.push('=');
        push_field_value(value, buf);
    }

    if let Some(timestamp) = point.timestamp() {
        buf.push(' ');

        // Range-checked at construction, so the nanosecond form always exists.
        let nanos = timestamp.timestamp_nanos_opt().unwrap_or_default();
        let mut int_writer = itoa::Buffer::new();
        buf.push_str(int_writer.format(nanos));
    }
}

/// Escapes the characters the line-protocol grammar treats as structure: commas, spaces, equals
/// signs, and the escape character itself. Applied identically to measurements, tag keys, tag
/// values, and field keys.
fn push_escaped_name(name: &str, buf: &mut String) {
    for c in name.chars() {
        if matches!(c, ',' | ' ' | '=' | '\\') {
            buf.push('\\');
        }
        buf.push(c);
    }
}

fn push_field_value(value: &FieldValue, buf: &mut String) {
    match value {
        FieldValue::Integer(v) => {
            let mut int_writer = itoa::Buffer::new();
            buf.push_str(int_writer.format(*v));
        }
        FieldValue::Float(v) => {
            // Fixed fifteen fractional digits: large and small magnitudes both round-trip
            // without ever falling into scientific notation.
            let _ = write!(buf, "{v:.15}");
        }
        FieldValue::Text(v) => {
            buf.push('"');
            for c in v.chars() {
                if c == '"' || c == '\\' {
                    buf.push('\\');
                }
                buf.push(c);
            }
            buf.push('"');
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use indexmap::IndexMap;
    use proptest::{collection::btree_map, prelude::*, proptest};

    use super::encode_point;
    use crate::point::Point;

    fn static_tags(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    fn encode(point: &Point, tags: &IndexMap<String, String>) -> String {
        let mut buf = String::new();
        encode_point(point, tags, &mut buf);
        buf
    }

    #[test]
    fn counter_with_static_tag() {
        let point = Point::builder("requests").field("count", 1).build().expect("valid point");
        let encoded = encode(&point, &static_tags(&[("env", "prod")]));

        assert_eq!(encoded, "requests,env=prod count=1");
    }

    #[test]
    fn merged_tags_are_sorted_by_key() {
        let point = Point::builder("cpu")
            .field("value", 3)
            .tag("host", "a")
            .build()
            .expect("valid point");
        let encoded = encode(&point, &static_tags(&[("env", "prod")]));

        assert_eq!(encoded, "cpu,env=prod,host=a value=3");
    }

    #[test]
    fn point_tag_wins_over_static_tag() {
        let point = Point::builder("cpu")
            .field("value", 3)
            .tag("env", "staging")
            .build()
            .expect("valid point");
        let encoded = encode(&point, &static_tags(&[("env", "prod")]));

        assert_eq!(encoded, "cpu,env=staging value=3");
    }

    #[test]
    fn empty_valued_tags_are_omitted() {
        let point = Point::builder("cpu")
            .field("value", 3)
            .tag("host", "")
            .build()
            .expect("valid point");
        let encoded = encode(&point, &static_tags(&[("env", ""), ("region", "eu")]));

        assert_eq!(encoded, "cpu,region=eu value=3");
    }

    #[test]
    fn fields_keep_insertion_order() {
        let point = Point::builder("worker")
            .field("zebra", 1)
            .field("apple", 2)
            .build()
            .expect("valid point");
        let encoded = encode(&point, &IndexMap::new());

        assert_eq!(encoded, "worker zebra=1,apple=2");
    }

    #[test]
    fn structural_characters_are_escaped() {
        let point = Point::builder("cpu load,total")
            .field("busy time", 1)
            .tag("data center", "us=east")
            .build()
            .expect("valid point");
        let encoded = encode(&point, &IndexMap::new());

        assert_eq!(encoded, r"cpu\ load\,total,data\ center=us\=east busy\ time=1");
    }

    #[test]
    fn backslashes_are_escaped() {
        let point = Point::builder(r"disk\c").field("free", 1).build().expect("valid point");
        let encoded = encode(&point, &IndexMap::new());

        assert_eq!(encoded, r"disk\\c free=1");
    }

    #[test]
    fn value_formatting() {
        let cases = [
            (Point::builder("m").field("f", 42i64), "m f=42"),
            (Point::builder("m").field("f", -7i64), "m f=-7"),
            (Point::builder("m").field("f", 2.5f64), "m f=2.500000000000000"),
            (Point::builder("m").field("f", 0.1f64), "m f=0.100000000000000"),
            (
                Point::builder("m").field("f", 34_563_478_564_785.0f64),
                "m f=34563478564785.000000000000000",
            ),
            (Point::builder("m").field("f", "plain"), "m f=\"plain\""),
            (Point::builder("m").field("f", r#"quo"te"#), r#"m f="quo\"te""#),
        ];

        for (builder, expected) in cases {
            let point = builder.build().expect("valid point");
            assert_eq!(encode(&point, &IndexMap::new()), expected);
        }
    }

    #[test]
    fn timestamp_renders_as_epoch_nanoseconds() {
        let timestamp = DateTime::from_timestamp(1_000_000_000, 123).expect("valid datetime");
        let point = Point::builder("requests")
            .field("count", 1)
            .timestamp(timestamp)
            .build()
            .expect("valid point");
        let encoded = encode(&point, &IndexMap::new());

        assert_eq!(encoded, "requests count=1 1000000000000000123");
    }

    #[test]
    fn encoding_is_idempotent() {
        let point = Point::builder("requests")
            .field("count", 1)
            .field("latency", 0.25)
            .tag("host", "a")
            .build()
            .expect("valid point");
        let tags = static_tags(&[("env", "prod")]);

        assert_eq!(encode(&point, &tags), encode(&point, &tags));
    }

    proptest! {
        #[test]
        fn property_test_tag_ordering(
            measurement in "[a-z]{1,12}",
            tags in btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..5),
            value in any::<i64>(),
        ) {
            // Insert tags in reverse order to prove the encoder sorts them itself.
            let mut builder = Point::builder(measurement.clone());
            for (key, tag_value) in tags.iter().rev() {
                builder = builder.tag(key.clone(), tag_value.clone());
            }
            let point = builder.field("v", value).build().expect("valid point");

            let encoded = encode(&point, &IndexMap::new());
            let encoded_again = encode(&point, &IndexMap::new());
            prop_assert_eq!(&encoded, &encoded_again);

            let head = encoded.split(' ').next().expect("measurement section");
            let mut segments = head.split(',');
            prop_assert_eq!(segments.next(), Some(measurement.as_str()));

            let rendered_keys: Vec<&str> = segments
                .map(|segment| segment.split('=').next().expect("tag key"))
                .collect();
            let expected_keys: Vec<&str> = tags
                .iter()
                .filter(|(_, tag_value)| !tag_value.is_empty())
                .map(|(key, _)| key.as_str())
                .collect();

            // BTreeMap iterates sorted, so matching it proves both the ordering and
            // the empty-value omission.
            prop_assert_eq!(rendered_keys, expected_keys);
        }
    }
}
