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

use std::collections::HashMap;

/// Sensor categories keyed by the two character type prefix of a sensor ID.
pub const SENSOR_TYPES: &[(&str, &str)] = &[
    ("ME", "weather"),
    ("QA", "air quality"),
    ("RU", "noise"),
    ("CT", "vehicle counter"),
];

/// Measurement kinds keyed by the four character code that follows the type prefix.
pub const MEASUREMENTS: &[(&str, MeasurementKind)] = &[
    ("C6H6", MeasurementKind::new("benzene", Some("µg/m3"))),
    ("00CO", MeasurementKind::new("carbon monoxide", Some("µg/m3"))),
    ("00HR", MeasurementKind::new("relative humidity", Some("%"))),
    ("LAEQ", MeasurementKind::new("equivalent continuous sound level", Some("dB(A)"))),
    ("0NO2", MeasurementKind::new("nitrogen dioxide", Some("µg/m3"))),
    // Not listed in the upstream documentation but emitted by the feed
    ("00NO", MeasurementKind::new("nitrogen oxide", Some("µg/m3"))),
    ("00O3", MeasurementKind::new("ozone", Some("µg/m3"))),
    ("00PA", MeasurementKind::new("atmospheric pressure", Some("mbar"))),
    ("PM10", MeasurementKind::new("particles with a diameter of less than 10µm", Some("µg/m3"))),
    ("PM25", MeasurementKind::new("particles with a diameter of less than 2.5µm", Some("µg/m3"))),
    ("0SO2", MeasurementKind::new("sulfur dioxide", Some("µg/m3"))),
    ("TEMP", MeasurementKind::new("temperature", Some("ºC"))),
    ("0VTH", MeasurementKind::new("hourly traffic volume", Some("vehicles"))),
    ("00UV", MeasurementKind::new("ultraviolet", None)),
    ("00VD", MeasurementKind::new("wind direction", Some("º"))),
    ("00VI", MeasurementKind::new("wind intensity", Some("km/h"))),
];

/// Human readable description of what a sensor measures and, when known, its unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementKind {
    pub description: &'static str,
    pub unit: Option<&'static str>,
}

impl MeasurementKind {
    pub const fn new(description: &'static str, unit: Option<&'static str>) -> Self {
        MeasurementKind { description, unit }
    }
}

/// Lookup tables for the codes embedded in sensor IDs.
///
/// The upstream feed regularly emits codes that aren't documented anywhere so a
/// miss is an expected result and callers get `None` rather than an error.
#[derive(Debug, Clone)]
pub struct Catalog {
    types: HashMap<&'static str, &'static str>,
    measurements: HashMap<&'static str, MeasurementKind>,
}

impl Catalog {
    pub fn new(types: &[(&'static str, &'static str)], measurements: &[(&'static str, MeasurementKind)]) -> Self {
        Catalog {
            types: types.iter().copied().collect(),
            measurements: measurements.iter().copied().collect(),
        }
    }

    /// Category for a two character type prefix (e.g. "QA" is "air quality").
    pub fn sensor_type(&self, prefix: &str) -> Option<&'static str> {
        self.types.get(prefix).copied()
    }

    /// Measurement kind for a four character code (e.g. "0NO2" is "nitrogen dioxide").
    pub fn measurement(&self, code: &str) -> Option<MeasurementKind> {
        self.measurements.get(code).copied()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(SENSOR_TYPES, MEASUREMENTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sensor_types() {
        let catalog = Catalog::default();

        assert_eq!(Some("weather"), catalog.sensor_type("ME"));
        assert_eq!(Some("air quality"), catalog.sensor_type("QA"));
        assert_eq!(Some("noise"), catalog.sensor_type("RU"));
        assert_eq!(Some("vehicle counter"), catalog.sensor_type("CT"));
    }

    #[test]
    fn test_unknown_codes_are_misses() {
        let catalog = Catalog::default();

        assert_eq!(None, catalog.sensor_type("ZZ"));
        assert_eq!(None, catalog.sensor_type("me"));
        assert_eq!(None, catalog.measurement("0VD1"));
    }

    #[test]
    fn test_measurement_with_and_without_unit() {
        let catalog = Catalog::default();

        let benzene = catalog.measurement("C6H6").unwrap();
        assert_eq!("benzene", benzene.description);
        assert_eq!(Some("µg/m3"), benzene.unit);

        let uv = catalog.measurement("00UV").unwrap();
        assert_eq!("ultraviolet", uv.description);
        assert_eq!(None, uv.unit);
    }

    #[test]
    fn test_custom_tables() {
        let catalog = Catalog::new(&[("XX", "test")], &[("0ABC", MeasurementKind::new("abc", None))]);

        assert_eq!(Some("test"), catalog.sensor_type("XX"));
        assert_eq!(None, catalog.sensor_type("ME"));
        assert_eq!(Some(MeasurementKind::new("abc", None)), catalog.measurement("0ABC"));
    }
}
