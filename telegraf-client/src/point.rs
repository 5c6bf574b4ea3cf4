use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use thiserror::Error;

/// Errors that could occur while constructing a [`Point`].
#[derive(Debug, Error, Eq, PartialEq)]
pub enum PointError {
    /// The measurement name was empty.
    #[error("a measurement name must be specified")]
    EmptyMeasurement,

    /// The point carried no fields.
    #[error("at least one field must be specified")]
    NoFields,

    /// A field had an empty name.
    #[error("fields must have non-empty names")]
    EmptyFieldName,

    /// A tag had an empty name.
    #[error("tags must have non-empty names")]
    EmptyTagName,

    /// The timestamp cannot be represented as nanoseconds since the Unix epoch.
    #[error("timestamp is outside the representable nanosecond range")]
    TimestampOutOfRange,
}

/// A scalar value carried by a single field of a [`Point`].
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// A signed integer value.
    Integer(i64),

    /// A floating-point value.
    Float(f64),

    /// A string value.
    Text(String),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Float(f64::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// A single immutable metric observation.
///
/// A point is one recorded occurrence of a measurement: the measurement name, one or more fields
/// carrying the actual values, optional tags for grouping and filtering, and an optional UTC
/// timestamp.
///
/// Points are validated when they are built, so a `Point` that exists is always encodable: the
/// measurement is non-empty, at least one field is present, no field or tag has an empty name, and
/// the timestamp (if any) fits the wire representation. Field order is preserved as inserted;
/// tags are sorted when the point is encoded.
#[derive(Clone, Debug)]
pub struct Point {
    measurement: String,
    fields: IndexMap<String, FieldValue>,
    tags: IndexMap<String, String>,
    timestamp: Option<DateTime<Utc>>,
}

impl Point {
    /// Creates a builder for a point with the given measurement name.
    pub fn builder(measurement: impl Into<String>) -> PointBuilder {
        PointBuilder {
            measurement: measurement.into(),
            fields: IndexMap::new(),
            tags: IndexMap::new(),
            timestamp: None,
        }
    }

    /// The measurement name this point belongs to.
    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    /// The fields carried by this point, in insertion order.
    pub fn fields(&self) -> &IndexMap<String, FieldValue> {
        &self.fields
    }

    /// The tags attached to this point.
    pub fn tags(&self) -> &IndexMap<String, String> {
        &self.tags
    }

    /// The timestamp of this point, if one was set.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }
}

/// Builder for a [`Point`].
pub struct PointBuilder {
    measurement: String,
    fields: IndexMap<String, FieldValue>,
    tags: IndexMap<String, String>,
    timestamp: Option<DateTime<Utc>>,
}

impl PointBuilder {
    /// Adds a field to the point.
    ///
    /// Fields are rendered in the order they are added. Adding a field with a name that was
    /// already used replaces the previous value without changing its position.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Adds a tag to the point.
    ///
    /// Point-level tags take precedence over a sender's static tags when both carry the same key.
    /// Tags with empty values are dropped during encoding rather than rejected here.
    #[must_use]
    pub fn tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(name.into(), value.into());
        self
    }

    /// Sets the timestamp of the point.
    #[must_use]
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Validates the accumulated state and builds the point.
    ///
    /// # Errors
    ///
    /// Returns a [`PointError`] if the measurement name is empty, no fields were added, any field
    /// or tag name is empty, or the timestamp falls outside the nanosecond epoch range.
    pub fn build(self) -> Result<Point, PointError> {
        if self.measurement.is_empty() {
            return Err(PointError::EmptyMeasurement);
        }

        if self.fields.is_empty() {
            return Err(PointError::NoFields);
        }

        if self.fields.keys().any(|name| name.is_empty()) {
            return Err(PointError::EmptyFieldName);
        }

        if self.tags.keys().any(|name| name.is_empty()) {
            return Err(PointError::EmptyTagName);
        }

        if let Some(timestamp) = self.timestamp {
            if timestamp.timestamp_nanos_opt().is_none() {
                return Err(PointError::TimestampOutOfRange);
            }
        }

        Ok(Point {
            measurement: self.measurement,
            fields: self.fields,
            tags: self.tags,
            timestamp: self.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::{FieldValue, Point, PointError};

    #[test]
    fn builds_a_minimal_point() {
        let point = Point::builder("requests").field("count", 1).build().expect("valid point");

        assert_eq!(point.measurement(), "requests");
        assert_eq!(point.fields().len(), 1);
        assert!(point.tags().is_empty());
        assert!(point.timestamp().is_none());
    }

    #[test]
    fn rejects_empty_measurement() {
        let result = Point::builder("").field("count", 1).build();
        assert_eq!(result.err(), Some(PointError::EmptyMeasurement));
    }

    #[test]
    fn rejects_missing_fields() {
        let result = Point::builder("requests").build();
        assert_eq!(result.err(), Some(PointError::NoFields));
    }

    #[test]
    fn rejects_empty_field_name() {
        let result = Point::builder("requests").field("", 1).build();
        assert_eq!(result.err(), Some(PointError::EmptyFieldName));
    }

    #[test]
    fn rejects_empty_tag_name() {
        let result = Point::builder("requests").field("count", 1).tag("", "x").build();
        assert_eq!(result.err(), Some(PointError::EmptyTagName));
    }

    #[test]
    fn rejects_timestamp_outside_nanosecond_range() {
        // Past the year 2262, where the i64 nanosecond epoch representation ends.
        let far_future = DateTime::from_timestamp(10_000_000_000, 0).expect("valid datetime");
        let result = Point::builder("requests").field("count", 1).timestamp(far_future).build();
        assert_eq!(result.err(), Some(PointError::TimestampOutOfRange));
    }

    #[test]
    fn preserves_field_insertion_order() {
        let point = Point::builder("requests")
            .field("zebra", 1)
            .field("apple", 2)
            .build()
            .expect("valid point");

        let names: Vec<_> = point.fields().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zebra", "apple"]);
    }

    #[test]
    fn duplicate_field_keeps_position_and_replaces_value() {
        let point = Point::builder("requests")
            .field("a", 1)
            .field("b", 2)
            .field("a", 3)
            .build()
            .expect("valid point");

        let fields: Vec<_> = point.fields().iter().collect();
        assert_eq!(fields[0], (&"a".to_string(), &FieldValue::Integer(3)));
        assert_eq!(fields[1], (&"b".to_string(), &FieldValue::Integer(2)));
    }
}
