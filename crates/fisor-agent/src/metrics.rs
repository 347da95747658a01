//! Diagnostic values reported by agents and evaluation routines.
//!
//! Values are either scalars or (possibly nested) sequences. Before a value is
//! logged it is normalized with [`MetricValue::into_loggable`]: a sequence that
//! holds a single element at every level collapses to that scalar, every other
//! sequence is kept as a nested list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Scalar(f64),
    Sequence(Vec<MetricValue>),
}

impl MetricValue {
    /// Returns the value if it holds exactly one number.
    #[must_use]
    pub fn single_value(&self) -> Option<f64> {
        match self {
            Self::Scalar(value) => Some(*value),
            Self::Sequence(values) => match values.as_slice() {
                [value] => value.single_value(),
                _ => None,
            },
        }
    }

    #[must_use]
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(value) => Some(*value),
            Self::Sequence(_) => None,
        }
    }

    /// Converts the value into the form written to tracking sinks.
    #[must_use]
    pub fn into_loggable(self) -> Self {
        match self.single_value() {
            Some(value) => Self::Scalar(value),
            None => self,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<f32> for MetricValue {
    fn from(value: f32) -> Self {
        Self::Scalar(value.into())
    }
}

#[expect(clippy::cast_precision_loss)]
impl From<usize> for MetricValue {
    fn from(value: usize) -> Self {
        Self::Scalar(value as f64)
    }
}

impl<T> From<Vec<T>> for MetricValue
where
    T: Into<MetricValue>,
{
    fn from(values: Vec<T>) -> Self {
        Self::Sequence(values.into_iter().map(Into::into).collect())
    }
}

/// Named metric values, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<String, MetricValue>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K, V>(&mut self, name: K, value: V)
    where
        K: Into<String>,
        V: Into<MetricValue>,
    {
        self.values.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.values.get(name)
    }

    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(MetricValue::as_scalar)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns a copy with every name prefixed by `prefix/`.
    #[must_use]
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self {
            values: self
                .values
                .iter()
                .map(|(k, v)| (format!("{prefix}/{k}"), v.clone()))
                .collect(),
        }
    }

    /// Normalizes every value with [`MetricValue::into_loggable`].
    #[must_use]
    pub fn into_loggable(self) -> Self {
        Self {
            values: self
                .values
                .into_iter()
                .map(|(k, v)| (k, v.into_loggable()))
                .collect(),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<MetricValue>,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut record = Self::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_is_unchanged() {
        assert_eq!(
            MetricValue::from(1.5).into_loggable(),
            MetricValue::Scalar(1.5)
        );
    }

    #[test]
    fn test_single_element_sequences_collapse() {
        let value = MetricValue::from(vec![vec![2.0_f32]]);
        assert_eq!(value.into_loggable(), MetricValue::Scalar(2.0));
    }

    #[test]
    fn test_arrays_stay_nested_lists() {
        let value = MetricValue::from(vec![vec![1.0_f32], vec![2.0]]);
        let logged = value.clone().into_loggable();
        assert_eq!(logged, value);
        assert_eq!(
            serde_json::to_string(&logged).unwrap(),
            "[[1.0],[2.0]]"
        );
    }

    #[test]
    fn test_empty_sequence_stays_list() {
        let value = MetricValue::Sequence(vec![]);
        assert_eq!(value.clone().into_loggable(), value);
    }

    #[test]
    fn test_record_prefix_and_serialize() {
        let record = [("loss", MetricValue::from(0.25)), ("mean", vec![1.0_f32].into())]
            .into_iter()
            .collect::<Record>();
        let logged = record.prefixed("train").into_loggable();
        assert_eq!(logged.scalar("train/loss"), Some(0.25));
        assert_eq!(logged.scalar("train/mean"), Some(1.0));
        assert!(!logged.contains("loss"));
        assert_eq!(
            serde_json::to_string(&logged).unwrap(),
            r#"{"train/loss":0.25,"train/mean":1.0}"#
        );
    }

    #[test]
    fn test_record_deserializes_mixed_values() {
        let record: Record = serde_json::from_str(r#"{"a":1.0,"b":[1.0,[2.0,3.0]]}"#).unwrap();
        assert_eq!(record.scalar("a"), Some(1.0));
        assert_eq!(
            record.get("b"),
            Some(&MetricValue::Sequence(vec![
                MetricValue::Scalar(1.0),
                MetricValue::Sequence(vec![MetricValue::Scalar(2.0), MetricValue::Scalar(3.0)]),
            ]))
        );
    }
}
