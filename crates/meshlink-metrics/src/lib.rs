//! Metrics infrastructure for the meshlink gateway.
//!
//! This crate describes every metric the gateway emits as a structured [`Metric`]
//! constant, so names and label keys are declared once. It re-exports the
//! `metrics` crate for convenience.
//!
//! # Example
//!
//! ```rust
//! use meshlink_metrics::{metric_defs, MetricLabels};
//!
//! let labels = MetricLabels::new("garden-gw");
//! metrics::counter!(metric_defs::COMMANDS_SENT.name, &labels.to_labels()).increment(1);
//! ```
//!
//! # Metric Type
//!
//! ```rust
//! use meshlink_metrics::{Metric, MetricKind};
//! use metrics::Unit;
//!
//! const MY_COUNTER: Metric = Metric::counter("my.counter")
//!     .with_description("A counter metric")
//!     .with_unit(Unit::Count)
//!     .with_labels(&["gateway", "reason"]);
//!
//! assert_eq!(MY_COUNTER.kind, MetricKind::Counter);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// Use the const constructors to declare metrics at compile time.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "meshlink.command.sent").
    pub name: &'static str,
    /// The kind of metric (counter, gauge, histogram).
    pub kind: MetricKind,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Gauge,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Histogram,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the metrics recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the gateway.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Command Handshake
    // ========================================================================

    /// Commands written to the local node.
    pub const COMMANDS_SENT: Metric = Metric::counter("meshlink.command.sent")
        .with_description("Commands written to the local node")
        .with_unit(Unit::Count)
        .with_labels(&["gateway"]);

    /// Commands acknowledged with `success`.
    pub const COMMANDS_ACKED: Metric = Metric::counter("meshlink.command.acked")
        .with_description("Commands acknowledged with success")
        .with_unit(Unit::Count)
        .with_labels(&["gateway"]);

    /// Commands acknowledged with `failure`.
    pub const COMMANDS_REJECTED: Metric = Metric::counter("meshlink.command.rejected")
        .with_description("Commands acknowledged with failure")
        .with_unit(Unit::Count)
        .with_labels(&["gateway"]);

    /// Commands that saw no matching acknowledgment before the deadline.
    pub const COMMANDS_TIMED_OUT: Metric = Metric::counter("meshlink.command.timeout")
        .with_description("Commands with no matching acknowledgment before the deadline")
        .with_unit(Unit::Count)
        .with_labels(&["gateway"]);

    /// Commands refused because another was in flight.
    pub const COMMANDS_BUSY: Metric = Metric::counter("meshlink.command.busy")
        .with_description("Commands refused because another command was in flight")
        .with_unit(Unit::Count)
        .with_labels(&["gateway"]);

    /// Commands aborted by a bus fault.
    pub const COMMANDS_TRANSPORT_FAILED: Metric = Metric::counter("meshlink.command.transport_failed")
        .with_description("Commands aborted by a local bus fault")
        .with_unit(Unit::Count)
        .with_labels(&["gateway"]);

    /// Time from command write to matching acknowledgment.
    pub const COMMAND_ACK_LATENCY: Metric = Metric::histogram("meshlink.command.ack_latency_ms")
        .with_description("Time from command write to matching acknowledgment")
        .with_unit(Unit::Milliseconds)
        .with_labels(&["gateway"]);

    // ========================================================================
    // Frames and Relays
    // ========================================================================

    /// Frames discarded during classification.
    ///
    /// Labels: gateway, reason (empty|malformed|unclassifiable|unexpected|unmatched_ack|not_ack)
    pub const FRAMES_DISCARDED: Metric = Metric::counter("meshlink.frame.discarded")
        .with_description("Local frames discarded during classification")
        .with_unit(Unit::Count)
        .with_labels(&["gateway", "reason"]);

    /// Sensor readings forwarded to the mesh.
    pub const READINGS_FORWARDED: Metric = Metric::counter("meshlink.relay.forwarded")
        .with_description("Sensor readings forwarded to the mesh")
        .with_unit(Unit::Count)
        .with_labels(&["gateway"]);

    /// Mesh packets received.
    ///
    /// Labels: gateway, port (text|other)
    pub const MESH_PACKETS_RECEIVED: Metric = Metric::counter("meshlink.mesh.received")
        .with_description("Mesh packets received")
        .with_unit(Unit::Count)
        .with_labels(&["gateway", "port"]);

    /// Transport faults.
    ///
    /// Labels: gateway, channel (local|mesh)
    pub const TRANSPORT_ERRORS: Metric = Metric::counter("meshlink.transport.errors")
        .with_description("Transport faults by channel")
        .with_unit(Unit::Count)
        .with_labels(&["gateway", "channel"]);

    /// Whether the mesh session is up (1) or down (0).
    pub const MESH_CONNECTED: Metric = Metric::gauge("meshlink.mesh.connected")
        .with_description("Mesh session state (1 = connected)")
        .with_labels(&["gateway"]);

    /// Returns a slice of all defined metrics.
    pub const ALL: &[&Metric] = &[
        &COMMANDS_SENT,
        &COMMANDS_ACKED,
        &COMMANDS_REJECTED,
        &COMMANDS_TIMED_OUT,
        &COMMANDS_BUSY,
        &COMMANDS_TRANSPORT_FAILED,
        &COMMAND_ACK_LATENCY,
        &FRAMES_DISCARDED,
        &READINGS_FORWARDED,
        &MESH_PACKETS_RECEIVED,
        &TRANSPORT_ERRORS,
        &MESH_CONNECTED,
    ];
}

/// Labels identifying the gateway that emitted a metric.
#[derive(Debug, Clone)]
pub struct MetricLabels {
    /// Gateway name.
    pub gateway: String,
}

impl MetricLabels {
    /// Creates labels for the named gateway.
    pub fn new(gateway: impl Into<String>) -> Self {
        Self {
            gateway: gateway.into(),
        }
    }

    /// Converts the labels to the metrics crate label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("gateway", self.gateway.clone())]
    }

    /// Returns labels with additional key-value pairs.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Describes all metrics used by the gateway.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

/// Install a Prometheus exporter serving `/metrics` on the given address.
#[cfg(feature = "prometheus")]
pub fn install_prometheus_exporter(
    addr: std::net::SocketAddr,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    describe_metrics();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let labels = MetricLabels::new("gw1");
        assert_eq!(labels.to_labels(), vec![("gateway", "gw1".to_string())]);

        let extended = labels.with(&[("reason", "empty".to_string())]);
        assert_eq!(extended.len(), 2);
        assert!(extended.contains(&("reason", "empty".to_string())));
    }

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::COMMANDS_SENT.name, "meshlink.command.sent");
        assert_eq!(metric_defs::COMMANDS_SENT.kind, MetricKind::Counter);
        assert_eq!(metric_defs::COMMAND_ACK_LATENCY.kind, MetricKind::Histogram);
        assert_eq!(metric_defs::COMMAND_ACK_LATENCY.unit, Some(Unit::Milliseconds));
        assert_eq!(metric_defs::MESH_CONNECTED.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::FRAMES_DISCARDED.labels, &["gateway", "reason"]);
    }

    #[test]
    fn test_all_metrics_have_unique_names() {
        let mut names: Vec<_> = metric_defs::ALL.iter().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), metric_defs::ALL.len());
    }

    #[test]
    fn test_describe_without_recorder() {
        // No recorder installed: describing is a no-op and must not panic
        describe_metrics();
    }

    #[test]
    fn test_metric_minimal() {
        const MINIMAL: Metric = Metric::counter("minimal");

        assert_eq!(MINIMAL.name, "minimal");
        assert_eq!(MINIMAL.description, "");
        assert_eq!(MINIMAL.unit, None);
        assert_eq!(MINIMAL.labels, &[] as &[&str]);
    }
}
