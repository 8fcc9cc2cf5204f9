use crate::common::KeyValue;
use crate::resource::{InstrumentationScope, Resource};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::SystemTime;

/// Whether a point reports a running total or the change since the last export.
///
/// The pipeline only carries this tag; it never converts between the two.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Temporality {
    /// Accumulated since the start time.
    #[default]
    Cumulative,
    /// Accumulated since the previous collection.
    Delta,
}

/// A numeric measurement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumberValue {
    /// Integer measurement
    I64(i64),
    /// Floating point measurement
    F64(f64),
}

impl From<i64> for NumberValue {
    fn from(v: i64) -> Self {
        NumberValue::I64(v)
    }
}

impl From<f64> for NumberValue {
    fn from(v: f64) -> Self {
        NumberValue::F64(v)
    }
}

/// A summed value.
#[derive(Clone, Debug, PartialEq)]
pub struct Sum {
    /// The sum
    pub value: NumberValue,
    /// Cumulative or delta
    pub temporality: Temporality,
    /// Whether the sum only ever increases
    pub is_monotonic: bool,
}

/// A last-value measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct Gauge {
    /// The last value recorded
    pub value: NumberValue,
}

/// Explicit-bucket histogram counts.
///
/// `bucket_counts` has one more entry than `bounds`: bucket `i` counts values
/// in `(bounds[i-1], bounds[i]]`, and the last bucket everything above the
/// highest bound.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    /// Number of values recorded
    pub count: u64,
    /// Sum of the values recorded
    pub sum: f64,
    /// Smallest value recorded
    pub min: Option<f64>,
    /// Largest value recorded
    pub max: Option<f64>,
    /// Upper bucket boundaries, ascending
    pub bounds: Vec<f64>,
    /// Counts per bucket
    pub bucket_counts: Vec<u64>,
    /// Cumulative or delta
    pub temporality: Temporality,
}

/// Payload of a metric point.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricData {
    /// Counter and up-down counter output
    Sum(Sum),
    /// Observable gauge output
    Gauge(Gauge),
    /// Histogram output
    Histogram(Histogram),
}

/// One data point of one metric stream.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricPoint {
    /// Metric name
    pub name: Cow<'static, str>,
    /// Metric description
    pub description: Cow<'static, str>,
    /// Unit of the values
    pub unit: Cow<'static, str>,
    /// Attributes identifying the stream
    pub attributes: Vec<KeyValue>,
    /// Start of the aggregation window
    pub start_time: Option<SystemTime>,
    /// Time of the measurement
    pub time: SystemTime,
    /// The aggregated value
    pub data: MetricData,
    /// Resource the point was produced by
    pub resource: Arc<Resource>,
    /// Instrumentation scope that produced this point
    pub scope: Arc<InstrumentationScope>,
}

impl MetricPoint {
    /// Start building a point for the metric named `name`.
    pub fn builder(name: impl Into<Cow<'static, str>>) -> MetricPointBuilder {
        MetricPointBuilder {
            name: name.into(),
            description: Cow::Borrowed(""),
            unit: Cow::Borrowed(""),
            attributes: Vec::new(),
            start_time: None,
            time: None,
        }
    }
}

/// Builder for [`MetricPoint`].
#[derive(Debug)]
pub struct MetricPointBuilder {
    name: Cow<'static, str>,
    description: Cow<'static, str>,
    unit: Cow<'static, str>,
    attributes: Vec<KeyValue>,
    start_time: Option<SystemTime>,
    time: Option<SystemTime>,
}

impl MetricPointBuilder {
    /// Set the description.
    pub fn with_description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the unit.
    pub fn with_unit(mut self, unit: impl Into<Cow<'static, str>>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Set the stream attributes.
    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = KeyValue>) -> Self {
        self.attributes = attributes.into_iter().collect();
        self
    }

    /// Set the aggregation window.
    pub fn with_times(mut self, start: Option<SystemTime>, time: SystemTime) -> Self {
        self.start_time = start;
        self.time = Some(time);
        self
    }

    /// Finish the point with `data`.
    pub fn build(
        self,
        data: MetricData,
        resource: Arc<Resource>,
        scope: Arc<InstrumentationScope>,
    ) -> MetricPoint {
        MetricPoint {
            name: self.name,
            description: self.description,
            unit: self.unit,
            attributes: self.attributes,
            start_time: self.start_time,
            time: self.time.unwrap_or_else(SystemTime::now),
            data,
            resource,
            scope,
        }
    }
}
