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

use crate::catalog::{Catalog, MeasurementKind};
use std::error;
use std::fmt;
use std::iter;

/// Number of characters in the type prefix of a sensor ID.
const TYPE_LEN: usize = 2;

/// Minimum number of characters in a sensor ID: type prefix and measurement code.
pub const PREFIX_LEN: usize = 6;

/// Error returned for sensor IDs too short to contain a type and measurement code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedIdentifier {
    pub id: String,
}

impl fmt::Display for MalformedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed sensor id {:?}, expected at least {} characters",
            self.id, PREFIX_LEN
        )
    }
}

impl error::Error for MalformedIdentifier {}

/// The fixed-position parts of a sensor ID like "QA0NO2101".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorId<'a> {
    /// Sensor category, "QA"
    pub type_prefix: &'a str,
    /// Kind of measurement, "0NO2"
    pub measurement_code: &'a str,
    /// Everything after the measurement code, "101"
    pub suffix: &'a str,
    /// Type prefix and measurement code together, "QA0NO2"
    pub prefix: &'a str,
}

impl<'a> SensorId<'a> {
    /// Split a sensor ID into its parts. Positions are counted in characters, not
    /// bytes, so IDs with non-ASCII characters are never split inside a character.
    pub fn parse(id: &'a str) -> Result<Self, MalformedIdentifier> {
        let type_end = char_offset(id, TYPE_LEN);
        let prefix_end = char_offset(id, PREFIX_LEN);

        match (type_end, prefix_end) {
            (Some(type_end), Some(prefix_end)) => Ok(SensorId {
                type_prefix: &id[..type_end],
                measurement_code: &id[type_end..prefix_end],
                suffix: &id[prefix_end..],
                prefix: &id[..prefix_end],
            }),
            _ => Err(MalformedIdentifier { id: id.to_owned() }),
        }
    }
}

/// Byte offset of the `n`th character of `s`, or the length of `s` if it has
/// exactly `n` characters.
fn char_offset(s: &str, n: usize) -> Option<usize> {
    s.char_indices().map(|(i, _)| i).chain(iter::once(s.len())).nth(n)
}

/// Result of looking up a code in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<T> {
    Known(T),
    Undocumented,
}

impl<T> Resolution<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            Self::Undocumented => None,
        }
    }
}

impl<T> From<Option<T>> for Resolution<T> {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => Self::Known(v),
            None => Self::Undocumented,
        }
    }
}

/// A sensor ID split into parts with each code resolved against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedIdentity<'a> {
    pub parts: SensorId<'a>,
    pub sensor_type: Resolution<&'static str>,
    pub measurement: Resolution<MeasurementKind>,
}

impl<'a> DecodedIdentity<'a> {
    pub fn prefix(&self) -> &'a str {
        self.parts.prefix
    }
}

/// Decode a sensor ID using the provided catalog.
///
/// Unknown type prefixes or measurement codes are not an error; they resolve to
/// `Resolution::Undocumented`. Only IDs shorter than six characters fail.
pub fn decode<'a>(catalog: &Catalog, id: &'a str) -> Result<DecodedIdentity<'a>, MalformedIdentifier> {
    let parts = SensorId::parse(id)?;
    Ok(DecodedIdentity {
        parts,
        sensor_type: catalog.sensor_type(parts.type_prefix).into(),
        measurement: catalog.measurement(parts.measurement_code).into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_parts() {
        let parts = SensorId::parse("QA0NO2101").unwrap();

        assert_eq!("QA", parts.type_prefix);
        assert_eq!("0NO2", parts.measurement_code);
        assert_eq!("101", parts.suffix);
        assert_eq!("QA0NO2", parts.prefix);
    }

    #[test]
    fn test_parse_exactly_six_characters() {
        let parts = SensorId::parse("ME00VD").unwrap();

        assert_eq!("ME", parts.type_prefix);
        assert_eq!("00VD", parts.measurement_code);
        assert_eq!("", parts.suffix);
        assert_eq!("ME00VD", parts.prefix);
    }

    #[test]
    fn test_parse_too_short() {
        assert_eq!(
            Err(MalformedIdentifier { id: "QA0NO".to_owned() }),
            SensorId::parse("QA0NO")
        );
        assert!(SensorId::parse("").is_err());
        assert!(SensorId::parse("Q").is_err());
    }

    #[test]
    fn test_parse_multibyte_characters() {
        // Six characters but more than six bytes
        let parts = SensorId::parse("RUººº1").unwrap();
        assert_eq!("RU", parts.type_prefix);
        assert_eq!("ººº1", parts.measurement_code);
        assert_eq!("", parts.suffix);

        // Five characters but more than six bytes
        assert!(SensorId::parse("RUººº").is_err());
    }

    #[test]
    fn test_decode_known_codes() {
        let catalog = Catalog::default();
        let decoded = decode(&catalog, "QAC6H6102").unwrap();

        assert_eq!(Resolution::Known("air quality"), decoded.sensor_type);
        assert_eq!(
            Resolution::Known(MeasurementKind::new("benzene", Some("µg/m3"))),
            decoded.measurement
        );
        assert_eq!("QAC6H6", decoded.prefix());
    }

    #[test]
    fn test_decode_unknown_codes() {
        let catalog = Catalog::default();
        let decoded = decode(&catalog, "ZZ0XYZ9").unwrap();

        assert_eq!(Resolution::Undocumented, decoded.sensor_type);
        assert_eq!(Resolution::Undocumented, decoded.measurement);
        assert_eq!(None, decoded.measurement.known());
    }

    #[test]
    fn test_decode_is_repeatable() {
        let catalog = Catalog::default();

        assert_eq!(decode(&catalog, "ME00VI1234"), decode(&catalog, "ME00VI1234"));
        assert_eq!(decode(&catalog, "ME00V"), decode(&catalog, "ME00V"));
    }
}
