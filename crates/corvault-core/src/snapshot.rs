//! Grouping one cycle's observations into exported series.

use crate::catalog::{CATALOG, MetricDef};
use crate::project::Observation;

/// All observations of one metric for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub metric: &'static MetricDef,
    pub observations: Vec<Observation>,
}

/// The complete, immutable result of one collection cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    series: Vec<Series>,
}

impl Snapshot {
    /// Series in catalog order, one per catalog entry.
    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.metric.name == name)
    }

    pub fn observation_count(&self) -> usize {
        self.series.iter().map(|s| s.observations.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.series.iter().flat_map(|s| s.observations.iter())
    }

    /// JSON view used by the CLI.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.series
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "name": s.metric.name,
                        "help": s.metric.help,
                        "samples": s.observations.iter().map(|o| {
                            let labels: serde_json::Map<String, serde_json::Value> = o
                                .labels
                                .pairs()
                                .into_iter()
                                .map(|(k, v)| (k.to_string(), serde_json::Value::from(v)))
                                .collect();
                            serde_json::json!({ "labels": labels, "value": o.value })
                        }).collect::<Vec<_>>(),
                    })
                })
                .collect(),
        )
    }
}

/// Group controller and disk observations by metric, in catalog order.
pub fn assemble(controller_obs: Vec<Observation>, disk_obs: Vec<Observation>) -> Snapshot {
    let mut series: Vec<Series> = CATALOG
        .iter()
        .map(|metric| Series {
            metric,
            observations: Vec::new(),
        })
        .collect();

    for obs in controller_obs.into_iter().chain(disk_obs) {
        // Catalog names are unique, so the name identifies the series.
        match series.iter_mut().find(|s| s.metric.name == obs.metric.name) {
            Some(slot) => slot.observations.push(obs),
            None => log::warn!(
                "dropping observation for unknown metric {} (id {})",
                obs.metric.name,
                obs.labels.id
            ),
        }
    }

    Snapshot { series }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::find;
    use crate::project::{Labels, PathIndex};

    fn obs(name: &str, id: &str, cid: Option<PathIndex>, value: f64) -> Observation {
        Observation {
            metric: find(name).unwrap(),
            labels: Labels {
                host: "cv1".to_string(),
                id: id.to_string(),
                cid,
            },
            value,
        }
    }

    #[test]
    fn test_every_catalog_entry_has_a_series() {
        let snap = assemble(Vec::new(), Vec::new());
        assert_eq!(snap.series().len(), CATALOG.len());
        assert_eq!(snap.observation_count(), 0);
        assert_eq!(snap.series()[0].metric.name, "seagate_corvault_controller_cpuload");
    }

    #[test]
    fn test_grouping_by_metric() {
        let snap = assemble(
            vec![
                obs("seagate_corvault_controller_iops", "A", None, 5.0),
                obs("seagate_corvault_controller_iops", "B", None, 6.0),
            ],
            vec![
                obs("seagate_corvault_disk_io_timeouts", "d", Some(PathIndex::One), 0.0),
                obs("seagate_corvault_disk_io_timeouts", "d", Some(PathIndex::Two), 3.0),
            ],
        );
        assert_eq!(snap.observation_count(), 4);
        let iops = snap.get("seagate_corvault_controller_iops").unwrap();
        assert_eq!(iops.observations.len(), 2);
        let timeouts = snap.get("seagate_corvault_disk_io_timeouts").unwrap();
        assert_eq!(timeouts.observations[1].value, 3.0);
        assert!(snap.get("seagate_corvault_disk_reads").unwrap().observations.is_empty());
    }

    #[test]
    fn test_definition_outside_catalog() {
        static COPY: MetricDef = CATALOG[9];
        static UNKNOWN: MetricDef = MetricDef {
            name: "seagate_corvault_disk_temperature",
            ..CATALOG[10]
        };
        let labels = Labels {
            host: "cv1".to_string(),
            id: "A".to_string(),
            cid: None,
        };
        let snap = assemble(
            vec![
                Observation {
                    metric: &COPY,
                    labels: labels.clone(),
                    value: 5.0,
                },
                Observation {
                    metric: &UNKNOWN,
                    labels,
                    value: 40.0,
                },
            ],
            Vec::new(),
        );
        assert_eq!(snap.observation_count(), 1);
        let iops = snap.get("seagate_corvault_controller_iops").unwrap();
        assert_eq!(iops.observations[0].value, 5.0);
    }

    #[test]
    fn test_to_json_shape() {
        let snap = assemble(
            vec![obs("seagate_corvault_controller_cpuload", "A", None, 12.0)],
            Vec::new(),
        );
        let json = snap.to_json();
        let first = &json[0];
        assert_eq!(first["name"], "seagate_corvault_controller_cpuload");
        assert_eq!(first["samples"][0]["labels"]["id"], "A");
        assert_eq!(first["samples"][0]["value"], 12.0);
    }
}
