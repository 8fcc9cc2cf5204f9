//! Metric instruments and the [`Meter`] that owns them.
//!
//! Instruments aggregate in memory. A collection turns every stream of every
//! instrument into a [`MetricPoint`] record carrying cumulative values.
mod collector;
mod instrument;

pub use collector::MetricCollector;
pub use instrument::{GaugeCallback, HistogramState, Instrument, SumState};

use crate::common::KeyValue;
use crate::otel_debug;
use crate::record::{MetricPoint, NumberValue, Record};
use crate::resource::{InstrumentationScope, Resource};
use instrument::DEFAULT_HISTOGRAM_BOUNDS;
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Creates instruments for one instrumentation scope.
#[derive(Clone, Debug)]
pub struct Meter {
    inner: Arc<MeterInner>,
}

#[derive(Debug)]
struct MeterInner {
    scope: Arc<InstrumentationScope>,
    resource: Arc<Resource>,
    start_time: SystemTime,
    instruments: Mutex<Vec<InstrumentHandle>>,
}

impl Meter {
    /// Create a meter for `scope` on `resource`.
    pub fn new(scope: Arc<InstrumentationScope>, resource: Arc<Resource>) -> Self {
        Meter {
            inner: Arc::new(MeterInner {
                scope,
                resource,
                start_time: SystemTime::now(),
                instruments: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The scope this meter reports under.
    pub fn scope(&self) -> &Arc<InstrumentationScope> {
        &self.inner.scope
    }

    /// Monotonic sum.
    pub fn counter(&self, name: impl Into<Cow<'static, str>>) -> InstrumentBuilder<'_> {
        InstrumentBuilder::new(self, name.into(), InstrumentKind::Counter)
    }

    /// Sum that may go up and down.
    pub fn up_down_counter(&self, name: impl Into<Cow<'static, str>>) -> InstrumentBuilder<'_> {
        InstrumentBuilder::new(self, name.into(), InstrumentKind::UpDownCounter)
    }

    /// Explicit-bucket histogram.
    pub fn histogram(&self, name: impl Into<Cow<'static, str>>) -> InstrumentBuilder<'_> {
        InstrumentBuilder::new(self, name.into(), InstrumentKind::Histogram)
    }

    /// Gauge whose values are read from `callback` on every collection.
    pub fn observable_gauge<F>(
        &self,
        name: impl Into<Cow<'static, str>>,
        callback: F,
    ) -> InstrumentBuilder<'_>
    where
        F: Fn() -> Vec<(NumberValue, Vec<KeyValue>)> + Send + Sync + 'static,
    {
        InstrumentBuilder::new(
            self,
            name.into(),
            InstrumentKind::ObservableGauge(Box::new(callback)),
        )
    }

    /// Snapshot every stream of every instrument created by this meter.
    pub fn collect(&self) -> Vec<Record> {
        let instruments = match self.inner.instruments.lock() {
            Ok(instruments) => instruments.clone(),
            Err(_) => {
                otel_debug!(name: "Meter.Collect.MutexPoisoning");
                return Vec::new();
            }
        };
        let now = SystemTime::now();
        let mut records = Vec::new();
        for handle in instruments {
            let entry = &handle.0;
            for (attributes, data) in entry.instrument.collect() {
                let point = MetricPoint::builder(entry.name.clone())
                    .with_description(entry.description.clone())
                    .with_unit(entry.unit.clone())
                    .with_attributes(attributes)
                    .with_times(Some(self.inner.start_time), now)
                    .build(
                        data,
                        self.inner.resource.clone(),
                        self.inner.scope.clone(),
                    );
                records.push(Record::Metric(point));
            }
        }
        records
    }

    fn register(&self, handle: InstrumentHandle) {
        match self.inner.instruments.lock() {
            Ok(mut instruments) => instruments.push(handle),
            Err(_) => {
                otel_debug!(name: "Meter.Register.MutexPoisoning");
            }
        }
    }
}

enum InstrumentKind {
    Counter,
    UpDownCounter,
    Histogram,
    ObservableGauge(GaugeCallback),
}

/// Configures an instrument before it is registered with its meter.
pub struct InstrumentBuilder<'a> {
    meter: &'a Meter,
    name: Cow<'static, str>,
    description: Cow<'static, str>,
    unit: Cow<'static, str>,
    bounds: Option<Vec<f64>>,
    kind: InstrumentKind,
}

impl fmt::Debug for InstrumentBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentBuilder")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

impl<'a> InstrumentBuilder<'a> {
    fn new(meter: &'a Meter, name: Cow<'static, str>, kind: InstrumentKind) -> Self {
        InstrumentBuilder {
            meter,
            name,
            description: Cow::Borrowed(""),
            unit: Cow::Borrowed(""),
            bounds: None,
            kind,
        }
    }

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

    /// Set histogram bucket boundaries. Ignored by other kinds.
    pub fn with_boundaries(mut self, bounds: Vec<f64>) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Register the instrument with the meter.
    pub fn build(self) -> InstrumentHandle {
        let instrument = match self.kind {
            InstrumentKind::Counter => Instrument::Counter(SumState::default()),
            InstrumentKind::UpDownCounter => Instrument::UpDownCounter(SumState::default()),
            InstrumentKind::Histogram => Instrument::Histogram(HistogramState::new(
                self.bounds
                    .unwrap_or_else(|| DEFAULT_HISTOGRAM_BOUNDS.to_vec()),
            )),
            InstrumentKind::ObservableGauge(callback) => Instrument::observable_gauge(callback),
        };
        let handle = InstrumentHandle(Arc::new(InstrumentEntry {
            name: self.name,
            description: self.description,
            unit: self.unit,
            instrument,
        }));
        self.meter.register(handle.clone());
        handle
    }
}

#[derive(Debug)]
struct InstrumentEntry {
    name: Cow<'static, str>,
    description: Cow<'static, str>,
    unit: Cow<'static, str>,
    instrument: Instrument,
}

/// A registered instrument. Cheap to clone and share across threads.
#[derive(Clone, Debug)]
pub struct InstrumentHandle(Arc<InstrumentEntry>);

impl InstrumentHandle {
    /// Increment a counter or up-down counter.
    pub fn add(&self, value: impl Into<NumberValue>, attributes: &[KeyValue]) {
        self.record(value, attributes);
    }

    /// Record a measurement.
    pub fn record(&self, value: impl Into<NumberValue>, attributes: &[KeyValue]) {
        self.0
            .instrument
            .record(&self.0.name, value.into(), attributes);
    }

    /// The instrument's name.
    /// The instrument name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The aggregation behind this handle.
    pub fn instrument(&self) -> &Instrument {
        &self.0.instrument
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MetricData, Sum};

    fn meter() -> Meter {
        Meter::new(
            InstrumentationScope::builder("meter-test").build_shared(),
            Arc::new(Resource::builder().with_service_name("svc").build()),
        )
    }

    #[test]
    fn collect_emits_one_point_per_stream() {
        let meter = meter();
        let requests = meter
            .counter("requests")
            .with_unit("1")
            .with_description("Requests served")
            .build();
        requests.add(1_i64, &[KeyValue::new("route", "/a")]);
        requests.add(1_i64, &[KeyValue::new("route", "/b")]);
        requests.add(1_i64, &[KeyValue::new("route", "/a")]);

        let records = meter.collect();
        assert_eq!(records.len(), 2);
        for record in &records {
            let Record::Metric(point) = record else {
                panic!("expected a metric point");
            };
            assert_eq!(point.name, "requests");
            assert_eq!(point.unit, "1");
            assert_eq!(point.scope.name(), "meter-test");
            assert!(point.start_time.is_some());
        }
        let total: i64 = records
            .iter()
            .map(|r| match r {
                Record::Metric(MetricPoint {
                    data: MetricData::Sum(Sum { value: NumberValue::I64(v), .. }),
                    ..
                }) => *v,
                _ => 0,
            })
            .sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn collect_is_cumulative() {
        let meter = meter();
        let gauge_calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let calls = gauge_calls.clone();
        meter
            .observable_gauge("temperature", move || {
                calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                vec![(NumberValue::F64(21.5), vec![])]
            })
            .build();
        let hist = meter.histogram("latency").with_boundaries(vec![1.0]).build();
        hist.record(0.5, &[]);

        assert_eq!(meter.collect().len(), 2);
        hist.record(2.0, &[]);
        let records = meter.collect();
        assert_eq!(gauge_calls.load(std::sync::atomic::Ordering::SeqCst), 2);
        let counts = records.iter().find_map(|r| match r {
            Record::Metric(MetricPoint {
                data: MetricData::Histogram(h),
                ..
            }) => Some(h.bucket_counts.clone()),
            _ => None,
        });
        assert_eq!(counts, Some(vec![1, 1]));
    }
}
