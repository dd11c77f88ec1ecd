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

use crate::client::Reading;
use crate::decode::{DecodedIdentity, Resolution};

/// Ordered label names and values that identify one sensor series.
pub type LabelSet = Vec<(String, String)>;

/// Value used for any type or measurement code missing from the catalog.
pub const UNDOCUMENTED: &str = "Undocumented";

pub const LABEL_TYPE: &str = "type";
pub const LABEL_DESCRIPTION: &str = "description";
pub const LABEL_UNIT: &str = "unit";
pub const LABEL_PREFIX: &str = "prefix";
pub const LABEL_ID: &str = "id";
pub const LABEL_KEY: &str = "key";
pub const LABEL_ADDRESS: &str = "address";
pub const LABEL_DATE: &str = "date";

/// Build the labels for a reading.
///
/// Output depends only on the reading and its decoded ID and labels are always
/// emitted in the same order. The unit reported by the reading takes precedence
/// over the catalog unit and is omitted if neither has one. The date is only
/// included when the reading has one.
pub fn build(reading: &Reading, decoded: &DecodedIdentity<'_>) -> LabelSet {
    let mut labels = Vec::with_capacity(8);
    let sensor_type = match decoded.sensor_type {
        Resolution::Known(t) => t,
        Resolution::Undocumented => UNDOCUMENTED,
    };

    let (description, catalog_unit) = match decoded.measurement {
        Resolution::Known(m) => (m.description, m.unit),
        Resolution::Undocumented => (UNDOCUMENTED, None),
    };

    push(&mut labels, LABEL_TYPE, sensor_type);
    push(&mut labels, LABEL_DESCRIPTION, description);
    if let Some(unit) = reading.unit.as_deref().or(catalog_unit) {
        push(&mut labels, LABEL_UNIT, unit);
    }

    push(&mut labels, LABEL_PREFIX, decoded.parts.prefix);
    push(&mut labels, LABEL_ID, decoded.parts.suffix);
    push(&mut labels, LABEL_KEY, &reading.id);
    push(&mut labels, LABEL_ADDRESS, &reading.address);
    if let Some(date) = &reading.date {
        push(&mut labels, LABEL_DATE, date);
    }

    labels
}

fn push(labels: &mut LabelSet, name: &str, value: &str) {
    labels.push((name.to_owned(), escape(value)));
}

/// Escape a label value for the text exposition format. The encoder writes values
/// verbatim, so a quote or newline from upstream would break the whole output.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::decode::decode;

    fn labels_for(reading: &Reading) -> LabelSet {
        let catalog = Catalog::default();
        let decoded = decode(&catalog, &reading.id).unwrap();
        build(reading, &decoded)
    }

    fn pairs(labels: &[(&str, &str)]) -> LabelSet {
        labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_known_codes() {
        let labels = labels_for(&Reading::new("QA0NO2101", "Av. da Liberdade", 41.2));

        assert_eq!(
            pairs(&[
                ("type", "air quality"),
                ("description", "nitrogen dioxide"),
                ("unit", "µg/m3"),
                ("prefix", "QA0NO2"),
                ("id", "101"),
                ("key", "QA0NO2101"),
                ("address", "Av. da Liberdade"),
            ]),
            labels
        );
    }

    #[test]
    fn test_undocumented_codes() {
        let labels = labels_for(&Reading::new("ME0VD1234", "X", 12.5));

        assert_eq!(
            pairs(&[
                ("type", "weather"),
                ("description", "Undocumented"),
                ("prefix", "ME0VD1"),
                ("id", "234"),
                ("key", "ME0VD1234"),
                ("address", "X"),
            ]),
            labels
        );
    }

    #[test]
    fn test_reading_unit_and_date() {
        let mut reading = Reading::new("ME00VI1234", "Belem", 3.0);
        reading.unit = Some("m/s".to_owned());
        reading.date = Some("2023-01-01 10:00".to_owned());

        let labels = labels_for(&reading);

        assert_eq!(("unit".to_owned(), "m/s".to_owned()), labels[2]);
        assert_eq!(Some(&("date".to_owned(), "2023-01-01 10:00".to_owned())), labels.last());
    }

    #[test]
    fn test_unit_omitted_when_unknown() {
        let labels = labels_for(&Reading::new("ME00UV01", "Y", 3.0));

        assert!(labels.iter().all(|(k, _)| k != LABEL_UNIT));
        assert_eq!(("description".to_owned(), "ultraviolet".to_owned()), labels[1]);
    }

    #[test]
    fn test_values_escaped() {
        let mut reading = Reading::new("QA0NO2101", "Rua \"Augusta\"\nLisboa\\", 1.0);
        reading.date = Some("2023-01-01\n10:00".to_owned());

        let labels = labels_for(&reading);

        assert_eq!(Some("Rua \\\"Augusta\\\"\\nLisboa\\\\"), label_value(&labels, LABEL_ADDRESS));
        assert_eq!(Some("2023-01-01\\n10:00"), label_value(&labels, LABEL_DATE));
        assert_eq!(Some("QA0NO2101"), label_value(&labels, LABEL_KEY));
    }

    fn label_value<'a>(labels: &'a [(String, String)], name: &str) -> Option<&'a str> {
        labels.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_deterministic() {
        let reading = Reading::new("RULAEQ0042", "Rossio", 61.0);
        assert_eq!(labels_for(&reading), labels_for(&reading));
    }
}
