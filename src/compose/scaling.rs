//! Threshold Autoscaling Wiring
//!
//! Binds a numeric metric (typically queue depth) to a pair of delta
//! scaling policies and a pair of high/low alarms, each alarm invoking
//! exactly its policy.

use tracing::info;

use crate::errors::{ComposeError, ComposeResult};
use crate::resources::autoscaling::ScalingPolicy;
use crate::resources::cloudwatch::{Alarm, MetricDimension};
use crate::template::{ResourceId, Topology};

/// The metric an alarm pair watches.
#[derive(Debug, Clone)]
pub struct MetricRef {
    namespace: String,
    metric_name: String,
    dimension: MetricDimension,
}

impl MetricRef {
    pub fn new(
        namespace: impl Into<String>,
        metric_name: impl Into<String>,
        dimension: MetricDimension,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            metric_name: metric_name.into(),
            dimension,
        }
    }

    /// Visible-message depth of a queue, the log transport scaling signal.
    pub fn queue_depth(queue: &ResourceId) -> Self {
        Self::new(
            "AWS/SQS",
            "ApproximateNumberOfMessagesVisible",
            MetricDimension::new("QueueName", queue.reference()),
        )
    }
}

/// Thresholds and deltas for one alarm pair.
///
/// The defaults are the composer's documented literal fallbacks: scale up
/// by 2 instances, scale down by 1, 600-second cooldown.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdScalingConfig {
    pub high_threshold: i64,
    pub low_threshold: i64,
    pub scale_up_delta: i64,
    pub scale_down_delta: i64,
    pub cooldown_seconds: u32,
}

impl ThresholdScalingConfig {
    /// Alarm pair with default deltas and cooldown.
    pub fn for_thresholds(high_threshold: i64, low_threshold: i64) -> Self {
        Self {
            high_threshold,
            low_threshold,
            ..Self::default()
        }
    }
}

impl Default for ThresholdScalingConfig {
    fn default() -> Self {
        Self {
            high_threshold: 10000,
            low_threshold: 1000,
            scale_up_delta: 2,
            scale_down_delta: -1,
            cooldown_seconds: 600,
        }
    }
}

/// Handles to the four resources an alarm pair registers.
#[derive(Debug, Clone)]
pub struct ScalingHandles {
    pub scale_up_policy: ResourceId,
    pub scale_down_policy: ResourceId,
    pub high_alarm: ResourceId,
    pub low_alarm: ResourceId,
}

/// Wire a metric to scale-up/scale-down policies and a high/low alarm pair
/// on the given autoscaling group.
///
/// Registers `{prefix}ScaleUpPolicy`, `{prefix}ScaleDownPolicy`,
/// `{prefix}HighAlarm` and `{prefix}LowAlarm`. Fails with a
/// [`ComposeError::Configuration`] before registering anything when
/// `high_threshold <= low_threshold`.
pub fn wire_thresholds(
    topology: &mut Topology,
    prefix: &str,
    group: &ResourceId,
    metric: &MetricRef,
    config: ThresholdScalingConfig,
) -> ComposeResult<ScalingHandles> {
    if config.high_threshold <= config.low_threshold {
        return Err(ComposeError::configuration(
            prefix,
            "high_threshold",
            format!(
                "high threshold {} must be greater than low threshold {}",
                config.high_threshold, config.low_threshold
            ),
        ));
    }

    let scale_up_policy = topology.add_resource(
        format!("{prefix}ScaleUpPolicy"),
        &ScalingPolicy::change_in_capacity(
            group.reference(),
            config.scale_up_delta,
            config.cooldown_seconds,
        ),
    )?;
    let scale_down_policy = topology.add_resource(
        format!("{prefix}ScaleDownPolicy"),
        &ScalingPolicy::change_in_capacity(
            group.reference(),
            config.scale_down_delta,
            config.cooldown_seconds,
        ),
    )?;
    let high_alarm = topology.add_resource(
        format!("{prefix}HighAlarm"),
        &Alarm::sum_threshold(
            metric.namespace.clone(),
            metric.metric_name.clone(),
            metric.dimension.clone(),
            "GreaterThanThreshold",
            config.high_threshold,
            scale_up_policy.reference(),
        ),
    )?;
    let low_alarm = topology.add_resource(
        format!("{prefix}LowAlarm"),
        &Alarm::sum_threshold(
            metric.namespace.clone(),
            metric.metric_name.clone(),
            metric.dimension.clone(),
            "LessThanThreshold",
            config.low_threshold,
            scale_down_policy.reference(),
        ),
    )?;
    info!(
        prefix,
        high = config.high_threshold,
        low = config.low_threshold,
        "wired threshold autoscaling"
    );

    Ok(ScalingHandles {
        scale_up_policy,
        scale_down_policy,
        high_alarm,
        low_alarm,
    })
}
