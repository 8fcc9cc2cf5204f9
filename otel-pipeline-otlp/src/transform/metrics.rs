use super::common::{attributes, resource, scope, to_nanos};
use super::group_by_resource_and_scope;
use crate::proto::collector::ExportMetricsServiceRequest;
use crate::proto::metrics::{
    metric, number_data_point, AggregationTemporality, Gauge, Histogram, HistogramDataPoint,
    Metric, NumberDataPoint, ResourceMetrics, ScopeMetrics, Sum,
};
use otel_pipeline_sdk::record::{MetricData, MetricPoint, NumberValue, Temporality};

fn temporality(temporality: Temporality) -> i32 {
    match temporality {
        Temporality::Cumulative => AggregationTemporality::Cumulative as i32,
        Temporality::Delta => AggregationTemporality::Delta as i32,
    }
}

fn number_value(value: NumberValue) -> number_data_point::Value {
    match value {
        NumberValue::I64(v) => number_data_point::Value::AsInt(v),
        NumberValue::F64(v) => number_data_point::Value::AsDouble(v),
    }
}

fn number_point(point: &MetricPoint, value: NumberValue) -> NumberDataPoint {
    // Metric points carry no dropped-attribute counter, so drops are only logged.
    let (attributes, _) = attributes(&point.attributes);
    NumberDataPoint {
        attributes,
        start_time_unix_nano: point.start_time.map(to_nanos).unwrap_or_default(),
        time_unix_nano: to_nanos(point.time),
        flags: 0,
        value: Some(number_value(value)),
    }
}

/// One `Metric` holding a single data point.
fn metric(point: &MetricPoint) -> Metric {
    let data = match &point.data {
        MetricData::Gauge(gauge) => metric::Data::Gauge(Gauge {
            data_points: vec![number_point(point, gauge.value)],
        }),
        MetricData::Sum(sum) => metric::Data::Sum(Sum {
            data_points: vec![number_point(point, sum.value)],
            aggregation_temporality: temporality(sum.temporality),
            is_monotonic: sum.is_monotonic,
        }),
        MetricData::Histogram(histogram) => {
            let (attributes, _) = attributes(&point.attributes);
            metric::Data::Histogram(Histogram {
                data_points: vec![HistogramDataPoint {
                    attributes,
                    start_time_unix_nano: point.start_time.map(to_nanos).unwrap_or_default(),
                    time_unix_nano: to_nanos(point.time),
                    count: histogram.count,
                    sum: Some(histogram.sum),
                    bucket_counts: histogram.bucket_counts.clone(),
                    explicit_bounds: histogram.bounds.clone(),
                    flags: 0,
                    min: histogram.min,
                    max: histogram.max,
                }],
                aggregation_temporality: temporality(histogram.temporality),
            })
        }
    };
    Metric {
        name: point.name.to_string(),
        description: point.description.to_string(),
        unit: point.unit.to_string(),
        data: Some(data),
    }
}

/// Appends the points of `next` to `existing` when both describe the same stream.
fn merge_into(existing: &mut Metric, next: &mut Metric) -> bool {
    if existing.name != next.name
        || existing.description != next.description
        || existing.unit != next.unit
    {
        return false;
    }
    match (existing.data.as_mut(), next.data.as_mut()) {
        (Some(metric::Data::Gauge(a)), Some(metric::Data::Gauge(b))) => {
            a.data_points.append(&mut b.data_points);
            true
        }
        (Some(metric::Data::Sum(a)), Some(metric::Data::Sum(b)))
            if a.aggregation_temporality == b.aggregation_temporality
                && a.is_monotonic == b.is_monotonic =>
        {
            a.data_points.append(&mut b.data_points);
            true
        }
        (Some(metric::Data::Histogram(a)), Some(metric::Data::Histogram(b)))
            if a.aggregation_temporality == b.aggregation_temporality =>
        {
            a.data_points.append(&mut b.data_points);
            true
        }
        _ => false,
    }
}

/// Points of the same stream within a scope share one `Metric`, in first-appearance order.
fn merge_streams(points: Vec<Metric>) -> Vec<Metric> {
    let mut metrics: Vec<Metric> = Vec::with_capacity(points.len());
    for mut next in points {
        if !metrics
            .iter_mut()
            .any(|existing| merge_into(existing, &mut next))
        {
            metrics.push(next);
        }
    }
    metrics
}

pub(crate) fn metrics_request<'a>(
    points: impl IntoIterator<Item = &'a MetricPoint>,
) -> ExportMetricsServiceRequest {
    let groups = group_by_resource_and_scope(
        points
            .into_iter()
            .map(|p| (&p.resource, &p.scope, metric(p))),
    );
    ExportMetricsServiceRequest {
        resource_metrics: groups
            .into_iter()
            .map(|group| ResourceMetrics {
                resource: Some(resource(group.resource)),
                schema_url: group.resource.schema_url().unwrap_or_default().to_string(),
                scope_metrics: group
                    .scopes
                    .into_iter()
                    .map(|scope_group| ScopeMetrics {
                        scope: Some(scope(scope_group.scope)),
                        schema_url: scope_group.scope.schema_url().unwrap_or_default().to_string(),
                        metrics: merge_streams(scope_group.items),
                    })
                    .collect(),
            })
            .collect(),
    }
}
