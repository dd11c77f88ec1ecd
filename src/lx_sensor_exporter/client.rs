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

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::error;
use std::fmt;
use std::future::Future;

/// Default location of the latest readings of every city sensor.
pub const DEFAULT_API_URL: &str = "http://opendata-cml.qart.pt:8080/lastmeasurements";

#[derive(Debug)]
pub enum FetchError {
    Transport(reqwest::Error),
    Unexpected(StatusCode, Url),
    Decode(serde_json::Error),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{}", e),
            Self::Unexpected(status, url) => write!(f, "unexpected status {} for {}", status, url),
            Self::Decode(e) => write!(f, "malformed readings payload: {}", e),
        }
    }
}

impl error::Error for FetchError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

/// Something that can produce the current batch of sensor readings.
///
/// Implemented over HTTP by `OpendataClient` and by in-memory fakes in tests.
pub trait DataSource {
    fn fetch(&self) -> impl Future<Output = Result<Vec<Reading>, FetchError>> + Send;
}

#[derive(Debug)]
pub struct OpendataClient {
    client: Client,
    url: Url,
}

impl OpendataClient {
    const USER_AGENT: &'static str = "lx_sensor_exporter Prometheus Exporter";
    const JSON_RESPONSE: &'static str = "application/json";

    pub fn new(client: Client, url: Url) -> Self {
        OpendataClient { client, url }
    }

    pub async fn readings(&self) -> Result<Vec<Reading>, FetchError> {
        tracing::debug!(message = "making latest measurements request", url = %self.url);

        let res = self
            .client
            .get(self.url.clone())
            .header(USER_AGENT, Self::USER_AGENT)
            .header(ACCEPT, Self::JSON_RESPONSE)
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = res.status();
        if status != StatusCode::OK {
            return Err(FetchError::Unexpected(status, self.url.clone()));
        }

        let body = res.bytes().await.map_err(FetchError::Transport)?;
        parse_readings(&body)
    }
}

impl DataSource for OpendataClient {
    async fn fetch(&self) -> Result<Vec<Reading>, FetchError> {
        self.readings().await
    }
}

/// Parse a JSON array of readings as returned by the open data API.
pub fn parse_readings(body: &[u8]) -> Result<Vec<Reading>, FetchError> {
    serde_json::from_slice(body).map_err(FetchError::Decode)
}

/// A single measurement from a city sensor.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Reading {
    #[serde(alias = "Id")]
    pub id: String,
    #[serde(alias = "Address", default)]
    pub address: String,
    #[serde(alias = "Value")]
    pub value: f64,
    #[serde(alias = "Unit", default)]
    pub unit: Option<String>,
    #[serde(alias = "timestamp", alias = "Date", default)]
    pub date: Option<String>,
}

impl Reading {
    pub fn new<I: Into<String>, A: Into<String>>(id: I, address: A, value: f64) -> Self {
        Reading {
            id: id.into(),
            address: address.into(),
            value,
            unit: None,
            date: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_readings() {
        let body = br#"[
            {"id": "QA0NO2101", "address": "Av. da Liberdade", "value": 41.2},
            {"id": "ME00VI1234", "address": "Belem", "value": 12.5, "unit": "km/h", "date": "2023-01-01 10:00"}
        ]"#;

        let readings = parse_readings(body).unwrap();

        assert_eq!(2, readings.len());
        assert_eq!(Reading::new("QA0NO2101", "Av. da Liberdade", 41.2), readings[0]);
        assert_eq!(Some("km/h".to_owned()), readings[1].unit);
        assert_eq!(Some("2023-01-01 10:00".to_owned()), readings[1].date);
    }

    #[test]
    fn test_parse_readings_alternate_fields() {
        let body = br#"[{"Id": "RULAEQ01", "Address": "Rossio", "Value": -3, "timestamp": "t0", "extra": true}]"#;

        let readings = parse_readings(body).unwrap();

        assert_eq!("RULAEQ01", readings[0].id);
        assert_eq!("Rossio", readings[0].address);
        assert_eq!(-3.0, readings[0].value);
        assert_eq!(Some("t0".to_owned()), readings[0].date);
    }

    #[test]
    fn test_parse_readings_missing_address() {
        let readings = parse_readings(br#"[{"id": "CT0VTH55", "value": 120}]"#).unwrap();

        assert_eq!("", readings[0].address);
    }

    #[test]
    fn test_parse_readings_malformed() {
        assert!(matches!(parse_readings(b"<html>"), Err(FetchError::Decode(_))));
        assert!(matches!(parse_readings(br#"{"id": "x"}"#), Err(FetchError::Decode(_))));
        assert!(matches!(
            parse_readings(br#"[{"id": "QA0NO2101", "value": "high"}]"#),
            Err(FetchError::Decode(_))
        ));
    }
}
