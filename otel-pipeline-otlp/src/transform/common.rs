use crate::proto::common::{
    any_value, AnyValue, ArrayValue, InstrumentationScope, KeyValue, KeyValueList,
};
use crate::proto::resource::Resource;
use otel_pipeline_sdk::common::{AnyValue as SdkAnyValue, Array, KeyValue as SdkKeyValue, Value};
use otel_pipeline_sdk::otel_warn;
use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the Unix epoch; times before the epoch encode as 0.
pub(crate) fn to_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Converts attributes, dropping the ones the wire format cannot carry.
///
/// Returns the converted attributes and the number dropped.
pub(crate) fn attributes(attributes: &[SdkKeyValue]) -> (Vec<KeyValue>, u32) {
    let mut dropped = 0;
    let converted = attributes
        .iter()
        .filter_map(|kv| match key_value(kv) {
            Ok(kv) => Some(kv),
            Err(reason) => {
                otel_warn!(
                    name: "Encoder.AttributeDropped",
                    key = kv.key.as_str(),
                    reason = reason
                );
                dropped += 1;
                None
            }
        })
        .collect();
    (converted, dropped)
}

fn key_value(kv: &SdkKeyValue) -> Result<KeyValue, &'static str> {
    if kv.key.as_str().is_empty() {
        return Err("empty key");
    }
    Ok(KeyValue {
        key: kv.key.as_str().to_string(),
        value: Some(AnyValue {
            value: Some(value(&kv.value)?),
        }),
    })
}

fn value(value: &Value) -> Result<any_value::Value, &'static str> {
    Ok(match value {
        Value::Bool(v) => any_value::Value::BoolValue(*v),
        Value::I64(v) => any_value::Value::IntValue(*v),
        Value::U64(v) => any_value::Value::IntValue(
            i64::try_from(*v).map_err(|_| "unsigned value exceeds i64::MAX")?,
        ),
        Value::F64(v) => any_value::Value::DoubleValue(*v),
        Value::String(v) => any_value::Value::StringValue(v.to_string()),
        Value::Bytes(v) => any_value::Value::BytesValue(v.clone()),
        Value::Array(array) => any_value::Value::ArrayValue(match array {
            Array::Bool(vals) => array_value(vals, |v| any_value::Value::BoolValue(*v)),
            Array::I64(vals) => array_value(vals, |v| any_value::Value::IntValue(*v)),
            Array::F64(vals) => array_value(vals, |v| any_value::Value::DoubleValue(*v)),
            Array::String(vals) => {
                array_value(vals, |v| any_value::Value::StringValue(v.to_string()))
            }
        }),
    })
}

fn array_value<T>(vals: &[T], f: impl Fn(&T) -> any_value::Value) -> ArrayValue {
    ArrayValue {
        values: vals
            .iter()
            .map(|v| AnyValue { value: Some(f(v)) })
            .collect(),
    }
}

/// Log bodies carry arbitrary nested values.
pub(crate) fn any_value(value: &SdkAnyValue) -> AnyValue {
    let value = match value {
        SdkAnyValue::Int(v) => any_value::Value::IntValue(*v),
        SdkAnyValue::Double(v) => any_value::Value::DoubleValue(*v),
        SdkAnyValue::String(v) => any_value::Value::StringValue(v.to_string()),
        SdkAnyValue::Boolean(v) => any_value::Value::BoolValue(*v),
        SdkAnyValue::Bytes(v) => any_value::Value::BytesValue(v.clone()),
        SdkAnyValue::ListAny(values) => any_value::Value::ArrayValue(ArrayValue {
            values: values.iter().map(any_value).collect(),
        }),
        SdkAnyValue::Map(entries) => any_value::Value::KvlistValue(KeyValueList {
            values: entries
                .iter()
                .map(|(key, value)| KeyValue {
                    key: key.as_str().to_string(),
                    value: Some(any_value(value)),
                })
                .collect(),
        }),
    };
    AnyValue { value: Some(value) }
}

pub(crate) fn resource(resource: &otel_pipeline_sdk::Resource) -> Resource {
    let attrs: Vec<SdkKeyValue> = resource.iter().cloned().collect();
    let (attributes, dropped_attributes_count) = attributes(&attrs);
    Resource {
        attributes,
        dropped_attributes_count,
    }
}

pub(crate) fn scope(scope: &otel_pipeline_sdk::InstrumentationScope) -> InstrumentationScope {
    let attrs: Vec<SdkKeyValue> = scope.attributes().cloned().collect();
    let (attributes, dropped_attributes_count) = attributes(&attrs);
    InstrumentationScope {
        name: scope.name().to_string(),
        version: scope.version().unwrap_or_default().to_string(),
        attributes,
        dropped_attributes_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn unrepresentable_attributes_are_dropped_and_counted() {
        let input = vec![
            SdkKeyValue::new("ok", 1_i64),
            SdkKeyValue::new("", "no key"),
            SdkKeyValue::new("big", u64::MAX),
            SdkKeyValue::new("small", 7_u64),
        ];
        let (converted, dropped) = attributes(&input);
        assert_eq!(dropped, 2);
        let keys: Vec<_> = converted.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, vec!["ok", "small"]);
        assert_eq!(
            converted[1].value,
            Some(AnyValue {
                value: Some(any_value::Value::IntValue(7))
            })
        );
    }

    #[test]
    fn arrays_and_nested_bodies() {
        let (converted, _) = attributes(&[SdkKeyValue::new(
            "tags",
            Value::Array(Array::String(vec!["a".into(), "b".into()])),
        )]);
        match converted[0].value.as_ref().and_then(|v| v.value.as_ref()) {
            Some(any_value::Value::ArrayValue(array)) => assert_eq!(array.values.len(), 2),
            other => panic!("unexpected value {other:?}"),
        }

        let body = any_value(&SdkAnyValue::Map(vec![(
            "inner".into(),
            SdkAnyValue::ListAny(vec![SdkAnyValue::Int(1), SdkAnyValue::Boolean(true)]),
        )]));
        match body.value {
            Some(any_value::Value::KvlistValue(list)) => {
                assert_eq!(list.values[0].key, "inner")
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn pre_epoch_times_encode_as_zero() {
        assert_eq!(to_nanos(UNIX_EPOCH - Duration::from_secs(1)), 0);
        assert_eq!(to_nanos(UNIX_EPOCH + Duration::from_nanos(42)), 42);
    }
}
