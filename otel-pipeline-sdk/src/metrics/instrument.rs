use crate::common::{Array, KeyValue, Value};
use crate::otel_debug;
use crate::record::{Gauge, Histogram, MetricData, NumberValue, Sum, Temporality};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

/// Default explicit bucket boundaries for histograms.
pub(crate) const DEFAULT_HISTOGRAM_BOUNDS: [f64; 15] = [
    0.0, 5.0, 10.0, 25.0, 50.0, 75.0, 100.0, 250.0, 500.0, 750.0, 1000.0, 2500.0, 5000.0,
    7500.0, 10000.0,
];

/// Callback reporting the current values of an observable gauge.
pub type GaugeCallback = Box<dyn Fn() -> Vec<(NumberValue, Vec<KeyValue>)> + Send + Sync>;

/// A set of attributes identifying one metric stream, sorted by key so that
/// order of insertion does not matter.
#[derive(Clone, Debug)]
pub(crate) struct AttributeSet(Vec<KeyValue>);

impl AttributeSet {
    pub(crate) fn from_slice(attributes: &[KeyValue]) -> Self {
        let mut kvs = attributes.to_vec();
        kvs.sort_by(|a, b| a.key.cmp(&b.key));
        // Keep the last value for duplicate keys.
        kvs.reverse();
        kvs.dedup_by(|a, b| a.key == b.key);
        kvs.reverse();
        AttributeSet(kvs)
    }

    pub(crate) fn into_vec(self) -> Vec<KeyValue> {
        self.0
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.key == b.key && value_eq(&a.value, &b.value))
    }
}

impl Eq for AttributeSet {}

impl Hash for AttributeSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for kv in &self.0 {
            kv.key.hash(state);
            hash_value(&kv.value, state);
        }
    }
}

// Floats compare by bit pattern so that the set can be a map key.
fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::F64(x), Value::F64(y)) => x.to_bits() == y.to_bits(),
        (Value::Array(Array::F64(x)), Value::Array(Array::F64(y))) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| x.to_bits() == y.to_bits())
        }
        _ => a == b,
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Bool(v) => v.hash(state),
        Value::I64(v) => v.hash(state),
        Value::U64(v) => v.hash(state),
        Value::F64(v) => v.to_bits().hash(state),
        Value::String(v) => v.hash(state),
        Value::Bytes(v) => v.hash(state),
        Value::Array(Array::Bool(v)) => v.hash(state),
        Value::Array(Array::I64(v)) => v.hash(state),
        Value::Array(Array::F64(v)) => v.iter().for_each(|f| f.to_bits().hash(state)),
        Value::Array(Array::String(v)) => v.hash(state),
    }
}

/// Running sums, one per attribute set.
#[derive(Debug, Default)]
pub struct SumState {
    values: Mutex<HashMap<AttributeSet, NumberValue>>,
}

impl SumState {
    fn add(&self, value: NumberValue, attributes: &[KeyValue]) {
        let Ok(mut values) = self.values.lock() else {
            return;
        };
        let entry = values
            .entry(AttributeSet::from_slice(attributes))
            .or_insert(match value {
                NumberValue::I64(_) => NumberValue::I64(0),
                NumberValue::F64(_) => NumberValue::F64(0.0),
            });
        *entry = match (*entry, value) {
            (NumberValue::I64(a), NumberValue::I64(b)) => NumberValue::I64(a.wrapping_add(b)),
            (a, b) => NumberValue::F64(as_f64(a) + as_f64(b)),
        };
    }

    fn snapshot(&self) -> Vec<(AttributeSet, NumberValue)> {
        self.values
            .lock()
            .map(|values| values.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default()
    }
}

/// Bucket counts of one histogram stream.
#[derive(Debug, Clone)]
struct Buckets {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    counts: Vec<u64>,
}

/// Explicit-bucket histograms, one per attribute set.
#[derive(Debug)]
pub struct HistogramState {
    bounds: Vec<f64>,
    values: Mutex<HashMap<AttributeSet, Buckets>>,
}

impl HistogramState {
    pub(crate) fn new(mut bounds: Vec<f64>) -> Self {
        bounds.retain(|b| !b.is_nan());
        bounds.sort_by(|a, b| a.total_cmp(b));
        bounds.dedup();
        HistogramState {
            bounds,
            values: Mutex::new(HashMap::new()),
        }
    }

    fn record(&self, value: f64, attributes: &[KeyValue]) {
        let Ok(mut values) = self.values.lock() else {
            return;
        };
        let bucket_count = self.bounds.len() + 1;
        let buckets = values
            .entry(AttributeSet::from_slice(attributes))
            .or_insert_with(|| Buckets {
                count: 0,
                sum: 0.0,
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
                counts: vec![0; bucket_count],
            });
        // First bound that is >= value; values above every bound land in the last bucket.
        let index = self.bounds.partition_point(|bound| *bound < value);
        buckets.counts[index] += 1;
        buckets.count += 1;
        buckets.sum += value;
        buckets.min = buckets.min.min(value);
        buckets.max = buckets.max.max(value);
    }
}

/// Gauge observed through a callback at collection time.
pub struct GaugeState {
    callback: GaugeCallback,
}

impl std::fmt::Debug for GaugeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaugeState").finish_non_exhaustive()
    }
}

/// An instrument, tagged by kind. Each variant holds only the state its
/// aggregation needs.
#[derive(Debug)]
pub enum Instrument {
    /// Monotonic sum. Negative increments are rejected.
    Counter(SumState),
    /// Non-monotonic sum.
    UpDownCounter(SumState),
    /// Distribution of recorded values.
    Histogram(HistogramState),
    /// Last value, read from a callback on each collection.
    ObservableGauge(GaugeState),
}

impl Instrument {
    pub(crate) fn observable_gauge(callback: GaugeCallback) -> Self {
        Instrument::ObservableGauge(GaugeState { callback })
    }

    /// Record a measurement. For counters this is an increment.
    pub(crate) fn record(&self, name: &str, value: NumberValue, attributes: &[KeyValue]) {
        match self {
            Instrument::Counter(state) => {
                if as_f64(value) < 0.0 {
                    otel_debug!(
                        name: "Counter.NegativeIncrementIgnored",
                        instrument_name = name.to_string()
                    );
                    return;
                }
                state.add(value, attributes);
            }
            Instrument::UpDownCounter(state) => state.add(value, attributes),
            Instrument::Histogram(state) => {
                let value = as_f64(value);
                if !value.is_finite() {
                    otel_debug!(
                        name: "Histogram.NonFiniteValueIgnored",
                        instrument_name = name.to_string()
                    );
                    return;
                }
                state.record(value, attributes);
            }
            Instrument::ObservableGauge(_) => {
                otel_debug!(
                    name: "ObservableGauge.RecordIgnored",
                    instrument_name = name.to_string(),
                    message = "Observable gauges only report values from their callback."
                );
            }
        }
    }

    /// Current value of every stream.
    pub(crate) fn collect(&self) -> Vec<(Vec<KeyValue>, MetricData)> {
        match self {
            Instrument::Counter(state) | Instrument::UpDownCounter(state) => {
                let is_monotonic = matches!(self, Instrument::Counter(_));
                state
                    .snapshot()
                    .into_iter()
                    .map(|(attrs, value)| {
                        (
                            attrs.into_vec(),
                            MetricData::Sum(Sum {
                                value,
                                temporality: Temporality::Cumulative,
                                is_monotonic,
                            }),
                        )
                    })
                    .collect()
            }
            Instrument::Histogram(state) => {
                let Ok(values) = state.values.lock() else {
                    return Vec::new();
                };
                values
                    .iter()
                    .map(|(attrs, buckets)| {
                        (
                            attrs.clone().into_vec(),
                            MetricData::Histogram(Histogram {
                                count: buckets.count,
                                sum: buckets.sum,
                                min: (buckets.count > 0).then_some(buckets.min),
                                max: (buckets.count > 0).then_some(buckets.max),
                                bounds: state.bounds.clone(),
                                bucket_counts: buckets.counts.clone(),
                                temporality: Temporality::Cumulative,
                            }),
                        )
                    })
                    .collect()
            }
            Instrument::ObservableGauge(state) => {
                let mut latest: HashMap<AttributeSet, NumberValue> = HashMap::new();
                for (value, attrs) in (state.callback)() {
                    latest.insert(AttributeSet::from_slice(&attrs), value);
                }
                latest
                    .into_iter()
                    .map(|(attrs, value)| (attrs.into_vec(), MetricData::Gauge(Gauge { value })))
                    .collect()
            }
        }
    }
}

fn as_f64(value: NumberValue) -> f64 {
    match value {
        NumberValue::I64(v) => v as f64,
        NumberValue::F64(v) => v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_order_does_not_split_streams() {
        let counter = Instrument::Counter(SumState::default());
        counter.record(
            "c",
            NumberValue::I64(1),
            &[KeyValue::new("a", 1_i64), KeyValue::new("b", 2_i64)],
        );
        counter.record(
            "c",
            NumberValue::I64(2),
            &[KeyValue::new("b", 2_i64), KeyValue::new("a", 1_i64)],
        );
        let points = counter.collect();
        assert_eq!(points.len(), 1);
        assert!(matches!(
            &points[0].1,
            MetricData::Sum(Sum { value: NumberValue::I64(3), is_monotonic: true, .. })
        ));
    }

    #[test]
    fn counter_rejects_negative_increment() {
        let counter = Instrument::Counter(SumState::default());
        counter.record("c", NumberValue::I64(5), &[]);
        counter.record("c", NumberValue::I64(-2), &[]);
        let points = counter.collect();
        assert!(matches!(
            &points[0].1,
            MetricData::Sum(Sum { value: NumberValue::I64(5), .. })
        ));

        let up_down = Instrument::UpDownCounter(SumState::default());
        up_down.record("u", NumberValue::I64(5), &[]);
        up_down.record("u", NumberValue::I64(-7), &[]);
        assert!(matches!(
            &up_down.collect()[0].1,
            MetricData::Sum(Sum { value: NumberValue::I64(-2), is_monotonic: false, .. })
        ));
    }

    #[test]
    fn histogram_buckets_values() {
        let histogram = Instrument::Histogram(HistogramState::new(vec![10.0, 0.0, 5.0]));
        for v in [0.0, 3.0, 5.0, 7.5, 100.0] {
            histogram.record("h", NumberValue::F64(v), &[]);
        }
        histogram.record("h", NumberValue::F64(f64::NAN), &[]);
        let points = histogram.collect();
        let MetricData::Histogram(h) = &points[0].1 else {
            panic!("expected a histogram");
        };
        assert_eq!(h.bounds, vec![0.0, 5.0, 10.0]);
        assert_eq!(h.bucket_counts, vec![1, 2, 1, 1]);
        assert_eq!(h.count, 5);
        assert_eq!(h.sum, 115.5);
        assert_eq!(h.min, Some(0.0));
        assert_eq!(h.max, Some(100.0));
    }

    #[test]
    fn gauge_reads_callback_on_collect() {
        let gauge = Instrument::observable_gauge(Box::new(|| {
            vec![
                (NumberValue::F64(0.5), vec![KeyValue::new("cpu", 0_i64)]),
                (NumberValue::F64(0.7), vec![KeyValue::new("cpu", 1_i64)]),
            ]
        }));
        gauge.record("g", NumberValue::F64(9.0), &[]);
        let mut values: Vec<f64> = gauge
            .collect()
            .into_iter()
            .map(|(_, data)| match data {
                MetricData::Gauge(Gauge { value: NumberValue::F64(v) }) => v,
                _ => -1.0,
            })
            .collect();
        values.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(values, vec![0.5, 0.7]);
    }
}
