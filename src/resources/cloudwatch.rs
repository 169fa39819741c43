//! Metric alarm resources

use serde::Serialize;

use crate::template::{ResourceProperties, Value};

/// Dimension restricting a metric to one resource (e.g. a queue name).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricDimension {
    name: String,
    value: Value,
}

impl MetricDimension {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Threshold alarm on a single metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Alarm {
    namespace: String,
    metric_name: String,
    dimensions: Vec<MetricDimension>,
    statistic: String,
    alarm_actions: Vec<Value>,
    period: String,
    evaluation_periods: String,
    threshold: String,
    comparison_operator: String,
}

impl Alarm {
    /// Sum-statistic threshold alarm with the composer's standard cadence
    /// (300 s period, single evaluation period) invoking one action.
    pub fn sum_threshold(
        namespace: impl Into<String>,
        metric_name: impl Into<String>,
        dimension: MetricDimension,
        comparison_operator: impl Into<String>,
        threshold: i64,
        action: Value,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            metric_name: metric_name.into(),
            dimensions: vec![dimension],
            statistic: "Sum".to_string(),
            alarm_actions: vec![action],
            period: "300".to_string(),
            evaluation_periods: "1".to_string(),
            threshold: threshold.to_string(),
            comparison_operator: comparison_operator.into(),
        }
    }
}

impl ResourceProperties for Alarm {
    const KIND: &'static str = "AWS::CloudWatch::Alarm";
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn queue_depth_alarm_matches_documented_shape() {
        let alarm = Alarm::sum_threshold(
            "AWS/SQS",
            "ApproximateNumberOfMessagesVisible",
            MetricDimension::new("QueueName", Value::reference("loggingQueue")),
            "GreaterThanThreshold",
            10000,
            Value::reference("loggingIndexerScaleUpPolicy"),
        );
        assert_eq!(
            serde_json::to_value(&alarm).unwrap(),
            json!({
                "Namespace": "AWS/SQS",
                "MetricName": "ApproximateNumberOfMessagesVisible",
                "Dimensions": [{"Name": "QueueName", "Value": {"Ref": "loggingQueue"}}],
                "Statistic": "Sum",
                "AlarmActions": [{"Ref": "loggingIndexerScaleUpPolicy"}],
                "Period": "300",
                "EvaluationPeriods": "1",
                "Threshold": "10000",
                "ComparisonOperator": "GreaterThanThreshold"
            })
        );
    }
}
