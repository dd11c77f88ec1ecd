// lx_sensor_exporter - Prometheus metrics exporter for Lisbon city sensors
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::labels::LabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::collections::HashMap;
use std::error;
use std::fmt;
use std::sync::atomic::AtomicU64;

const METRIC_NAME: &str = "sensor_measurement";
const METRIC_HELP: &str = "Latest measurement reported by a city sensor";

/// Gauge holding the latest value of one sensor. Clones share the same value.
pub type SensorGauge = Gauge<f64, AtomicU64>;

/// Error returned when two different sensors produce the same labels.
///
/// Both sensors would end up sharing one series in the exported metrics so the
/// second one is refused instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateLabelSet {
    pub key: String,
    pub existing_key: String,
}

impl fmt::Display for DuplicateLabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sensor {} has the same labels as already registered sensor {}",
            self.key, self.existing_key
        )
    }
}

impl error::Error for DuplicateLabelSet {}

/// A registered sensor gauge along with the labels it was created with.
#[derive(Debug)]
pub struct GaugeEntry {
    gauge: SensorGauge,
    labels: LabelSet,
}

impl GaugeEntry {
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn set(&self, value: f64) {
        self.gauge.set(value);
    }

    pub fn value(&self) -> f64 {
        self.gauge.get()
    }
}

/// Result of `SensorGauges::get_or_create`, indicating if a new gauge was registered.
#[derive(Debug)]
pub enum GaugeLookup<'a> {
    Existing(&'a GaugeEntry),
    Created(&'a GaugeEntry),
}

impl<'a> GaugeLookup<'a> {
    pub fn entry(&self) -> &'a GaugeEntry {
        match self {
            Self::Existing(e) => e,
            Self::Created(e) => e,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Gauges for every sensor seen so far, keyed by sensor ID.
///
/// All gauges belong to a single `sensor_measurement` family registered upon call
/// to `SensorGauges::new()`. Gauges are created the first time a sensor is seen
/// and are never removed. The labels of a gauge are fixed when it is created, later
/// calls for the same key get the existing gauge regardless of the labels passed.
///
/// This type is meant to have a single owner doing all writes. Values can be read
/// concurrently through the registry since the family and each gauge are thread safe.
#[derive(Debug)]
pub struct SensorGauges {
    family: Family<LabelSet, SensorGauge>,
    entries: HashMap<String, GaugeEntry>,
    owners: HashMap<LabelSet, String>,
}

impl SensorGauges {
    /// Create a new `SensorGauges` and register its metric family with the provided `Registry`.
    pub fn new(reg: &mut Registry) -> Self {
        let family = Family::<LabelSet, SensorGauge>::default();
        reg.register(METRIC_NAME, METRIC_HELP, family.clone());

        Self {
            family,
            entries: HashMap::new(),
            owners: HashMap::new(),
        }
    }

    /// Get the gauge for `key`, creating it with `labels` if this key hasn't been seen.
    pub fn get_or_create(&mut self, key: &str, labels: LabelSet) -> Result<GaugeLookup<'_>, DuplicateLabelSet> {
        if self.entries.contains_key(key) {
            return Ok(GaugeLookup::Existing(&self.entries[key]));
        }

        if let Some(existing) = self.owners.get(&labels) {
            return Err(DuplicateLabelSet {
                key: key.to_owned(),
                existing_key: existing.clone(),
            });
        }

        let gauge = self.family.get_or_create(&labels).clone();
        tracing::debug!(message = "registered new sensor gauge", key = %key, labels = ?labels);

        self.owners.insert(labels.clone(), key.to_owned());
        let entry = self
            .entries
            .entry(key.to_owned())
            .or_insert(GaugeEntry { gauge, labels });

        Ok(GaugeLookup::Created(entry))
    }

    pub fn get(&self, key: &str) -> Option<&GaugeEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(key: &str, address: &str) -> LabelSet {
        vec![
            ("type".to_owned(), "weather".to_owned()),
            ("key".to_owned(), key.to_owned()),
            ("address".to_owned(), address.to_owned()),
        ]
    }

    fn encode(reg: &Registry) -> String {
        let mut buf = String::new();
        prometheus_client::encoding::text::encode(&mut buf, reg).unwrap();
        buf
    }

    #[test]
    fn test_create_then_reuse() {
        let mut reg = Registry::default();
        let mut gauges = SensorGauges::new(&mut reg);

        let first = gauges.get_or_create("METEMP01", labels("METEMP01", "X")).unwrap();
        assert!(first.is_created());
        first.entry().set(21.5);

        let second = gauges.get_or_create("METEMP01", labels("METEMP01", "X")).unwrap();
        assert!(!second.is_created());
        assert_eq!(21.5, second.entry().value());
        assert_eq!(1, gauges.len());
    }

    #[test]
    fn test_labels_fixed_at_creation() {
        let mut reg = Registry::default();
        let mut gauges = SensorGauges::new(&mut reg);

        gauges.get_or_create("METEMP01", labels("METEMP01", "X")).unwrap();
        let lookup = gauges.get_or_create("METEMP01", labels("METEMP01", "Z")).unwrap();

        assert!(!lookup.is_created());
        assert_eq!(&labels("METEMP01", "X"), lookup.entry().labels());
        assert_eq!(1, gauges.len());
    }

    #[test]
    fn test_duplicate_label_set() {
        let mut reg = Registry::default();
        let mut gauges = SensorGauges::new(&mut reg);

        gauges.get_or_create("A", labels("same", "X")).unwrap().entry().set(1.0);
        let err = gauges.get_or_create("B", labels("same", "X")).unwrap_err();

        assert_eq!(
            DuplicateLabelSet {
                key: "B".to_owned(),
                existing_key: "A".to_owned(),
            },
            err
        );
        assert_eq!(1, gauges.len());
        assert!(gauges.get("B").is_none());
        assert_eq!(1.0, gauges.get("A").unwrap().value());
    }

    #[test]
    fn test_gauges_exposed_by_registry() {
        let mut reg = Registry::default();
        let mut gauges = SensorGauges::new(&mut reg);
        assert!(gauges.is_empty());

        gauges
            .get_or_create("METEMP01", labels("METEMP01", "Rossio"))
            .unwrap()
            .entry()
            .set(12.5);

        let out = encode(&reg);
        assert!(out.contains("# TYPE sensor_measurement gauge"));
        assert!(out.contains(r#"sensor_measurement{type="weather",key="METEMP01",address="Rossio"} 12.5"#));
    }
}
