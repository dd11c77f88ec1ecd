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

//! Prometheus metrics exporter for Lisbon city sensors
//!
//! ## Features
//!
//! `lx_sensor_exporter` periodically fetches the latest readings of every city sensor published
//! by the Lisbon [open data] API and emits them as Prometheus metrics. Each sensor becomes one
//! series of the `sensor_measurement` gauge. Labels are derived from the sensor ID, which
//! encodes the type of sensor and what it measures (e.g. `QA0NO2101` is an air quality sensor
//! measuring nitrogen dioxide). Codes that aren't documented upstream are labeled `Undocumented`.
//!
//! * `lx_sensor_measurement{type=$TYPE, description=$DESCRIPTION, unit=$UNIT, prefix=$PREFIX, id=$ID, key=$KEY, address=$ADDRESS}` -
//!   Latest reading of a sensor. `unit` is only present when known.
//! * `lx_sensor_polling_runs_total` - Number of completed polls.
//! * `lx_sensor_polling_download_errors_total` - Number of polls where readings could not be downloaded.
//! * `lx_sensor_polling_bad_reads_total` - Number of readings the sensor reported as failed (value `-99`).
//! * `lx_sensor_polling_skipped_records_total` - Number of readings skipped due to malformed sensor IDs.
//! * `lx_sensor_polling_download_time_milliseconds` - Download time of the last poll.
//! * `lx_sensor_polling_execution_time_milliseconds` - Total time of the last poll.
//! * `lx_sensor_polling_measurements` - Number of readings downloaded by the last poll.
//!
//! Labels for a sensor are fixed the first time it is seen. Later readings only update the value.
//!
//! [open data]: http://opendata-cml.qart.pt:8080/lastmeasurements
//!
//! ## Build
//!
//! `lx_sensor_exporter` is a Rust program and must be built from source using a
//! [Rust toolchain](https://rustup.rs/).
//!
//! ```text
//! cargo build --release
//! ```
//!
//! ## Usage
//!
//! ```text
//! ./lx_sensor_exporter --refresh-secs 300
//! ```
//!
//! ### Prometheus
//!
//! Prometheus metrics are exposed on port `9090` at `/metrics`. Add the host running
//! `lx_sensor_exporter` as a target under the Prometheus `scrape_configs` section.
//!
//! ```yaml
//! scrape_configs:
//! - job_name: lx_sensor_exporter
//!   scrape_interval: 60s
//!   static_configs:
//!   - targets: ['example:9090']
//! ```
//!

pub mod cache;
pub mod catalog;
pub mod client;
pub mod decode;
pub mod http;
pub mod labels;
pub mod poller;
pub mod validate;
