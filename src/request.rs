use std::collections::BTreeMap;

use serde::Serialize;

/// Value type for a request keyword.
///
/// Serializes untagged, so a [`Request`] becomes exactly the JSON object the
/// CDS API expects: scalars stay scalars, lists stay arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RequestValue {
    Str(String),
    Int(i64),
    StrList(Vec<String>),
    IntList(Vec<i64>),
}

impl From<&str> for RequestValue {
    fn from(value: &str) -> Self {
        RequestValue::Str(value.to_string())
    }
}

impl From<String> for RequestValue {
    fn from(value: String) -> Self {
        RequestValue::Str(value)
    }
}

impl From<&String> for RequestValue {
    fn from(value: &String) -> Self {
        RequestValue::Str(value.clone())
    }
}

impl From<i64> for RequestValue {
    fn from(value: i64) -> Self {
        RequestValue::Int(value)
    }
}

impl From<i32> for RequestValue {
    fn from(value: i32) -> Self {
        RequestValue::Int(value as i64)
    }
}

impl From<Vec<String>> for RequestValue {
    fn from(value: Vec<String>) -> Self {
        RequestValue::StrList(value)
    }
}

impl From<Vec<&str>> for RequestValue {
    fn from(value: Vec<&str>) -> Self {
        RequestValue::StrList(value.into_iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for RequestValue {
    fn from(value: [&str; N]) -> Self {
        RequestValue::StrList(value.into_iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<i64>> for RequestValue {
    fn from(value: Vec<i64>) -> Self {
        RequestValue::IntList(value)
    }
}

impl<const N: usize> From<[i64; N]> for RequestValue {
    fn from(value: [i64; N]) -> Self {
        RequestValue::IntList(value.to_vec())
    }
}

impl RequestValue {
    pub fn as_strings(&self) -> Vec<String> {
        match self {
            RequestValue::Str(s) => vec![s.clone()],
            RequestValue::Int(i) => vec![i.to_string()],
            RequestValue::StrList(xs) => xs.clone(),
            RequestValue::IntList(xs) => xs.iter().map(|x| x.to_string()).collect(),
        }
    }
}

/// CDS retrieval request expressed as keyword/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Request {
    pub(crate) inner: BTreeMap<String, RequestValue>,
}

impl Request {
    pub fn new() -> Self {
        Self {
            inner: BTreeMap::new(),
        }
    }

    /// Insert a keyword/value pair (value can be a scalar or list).
    pub fn kw(mut self, key: impl Into<String>, value: impl Into<RequestValue>) -> Self {
        self.inner.insert(key.into(), value.into());
        self
    }

    /// Construct a request from an iterator of keyword/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<RequestValue>,
    {
        let mut r = Self::new();
        for (k, v) in pairs {
            r = r.kw(k, v);
        }
        r
    }

    // Convenience builders for the EFAS historical query schema.
    pub fn system_version(self, v: impl Into<RequestValue>) -> Self {
        self.kw("system_version", v)
    }

    pub fn variable(self, v: impl Into<RequestValue>) -> Self {
        self.kw("variable", v)
    }

    pub fn model_levels(self, v: impl Into<RequestValue>) -> Self {
        self.kw("model_levels", v)
    }

    pub fn hyear(self, v: impl Into<RequestValue>) -> Self {
        self.kw("hyear", v)
    }

    pub fn hmonth(self, v: impl Into<RequestValue>) -> Self {
        self.kw("hmonth", v)
    }

    pub fn hday(self, v: impl Into<RequestValue>) -> Self {
        self.kw("hday", v)
    }

    pub fn time(self, v: impl Into<RequestValue>) -> Self {
        self.kw("time", v)
    }

    pub fn format(self, v: impl Into<RequestValue>) -> Self {
        self.kw("format", v)
    }

    /// Bounding box as `[north, west, south, east]`.
    pub fn area(self, v: impl Into<RequestValue>) -> Self {
        self.kw("area", v)
    }

    pub fn get(&self, key: &str) -> Option<&RequestValue> {
        self.inner.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::{Request, RequestValue};

    #[test]
    fn kw_builders_set_schema_fields() {
        let r = Request::new()
            .hyear("2019")
            .time(["00:00", "06:00", "12:00", "18:00"]);
        assert_eq!(r.get("hyear"), Some(&RequestValue::Str("2019".to_string())));
        assert_eq!(r.get("time").unwrap().as_strings().len(), 4);
    }

    #[test]
    fn from_pairs_builds_request() {
        let r = Request::from_pairs([("variable", "river_discharge_in_the_last_6_hours")]);
        assert_eq!(
            r.get("variable"),
            Some(&RequestValue::Str(
                "river_discharge_in_the_last_6_hours".to_string()
            ))
        );
    }

    #[test]
    fn serializes_to_flat_json_object() {
        let r = Request::new()
            .hyear("2019")
            .hmonth(["01", "02"])
            .area([54i64, 14, 49, 20]);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["hyear"], "2019");
        assert_eq!(v["hmonth"], serde_json::json!(["01", "02"]));
        assert_eq!(v["area"], serde_json::json!([54, 14, 49, 20]));
    }

    #[test]
    fn as_strings_flattens_scalars_and_lists() {
        assert_eq!(RequestValue::from(2019).as_strings(), vec!["2019"]);
        assert_eq!(
            RequestValue::from(["01", "02"]).as_strings(),
            vec!["01", "02"]
        );
    }
}
