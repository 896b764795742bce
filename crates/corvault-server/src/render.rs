//! Prometheus text exposition of a [`Snapshot`].

use corvault_core::{CATALOG, MetricDef, Snapshot};
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::ServerError;

/// Gauge families for the whole catalog, registered once.
///
/// Each render clears every family before loading the new snapshot, so values
/// from an earlier cycle never leak into the next exposition.
pub struct Exposition {
    registry: Registry,
    gauges: Vec<(&'static MetricDef, GaugeVec)>,
}

impl Exposition {
    pub fn new() -> Result<Self, ServerError> {
        let registry = Registry::new();
        let mut gauges = Vec::with_capacity(CATALOG.len());
        for metric in &CATALOG {
            let gauge = GaugeVec::new(Opts::new(metric.name, metric.help), metric.label_names())?;
            registry.register(Box::new(gauge.clone()))?;
            gauges.push((metric, gauge));
        }
        Ok(Self { registry, gauges })
    }

    /// Content type of the rendered text.
    pub fn format_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }

    pub fn render(&self, snapshot: &Snapshot) -> Result<String, ServerError> {
        for (_, gauge) in &self.gauges {
            gauge.reset();
        }
        for series in snapshot.series() {
            let Some((_, gauge)) = self.gauges.iter().find(|(m, _)| m.name == series.metric.name)
            else {
                continue;
            };
            for obs in &series.observations {
                let values = obs.labels.values();
                gauge.with_label_values(values.as_slice()).set(obs.value);
            }
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
