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

use crate::cache::{DuplicateLabelSet, GaugeLookup, SensorGauges};
use crate::catalog::Catalog;
use crate::client::{DataSource, FetchError, Reading};
use crate::decode::{self, MalformedIdentifier};
use crate::labels;
use crate::validate;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::error;
use std::fmt;
use std::time::Instant;

/// Reason a single reading could not be exported. Only that reading is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    Malformed(MalformedIdentifier),
    Duplicate(DuplicateLabelSet),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "{}", e),
            Self::Duplicate(e) => write!(f, "{}", e),
        }
    }
}

impl error::Error for RecordError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Malformed(e) => Some(e),
            Self::Duplicate(e) => Some(e),
        }
    }
}

impl From<MalformedIdentifier> for RecordError {
    fn from(e: MalformedIdentifier) -> Self {
        Self::Malformed(e)
    }
}

impl From<DuplicateLabelSet> for RecordError {
    fn from(e: DuplicateLabelSet) -> Self {
        Self::Duplicate(e)
    }
}

/// Metrics about the polling process itself, as opposed to the sensors.
#[derive(Debug)]
pub struct PollMetrics {
    runs: Counter,
    download_errors: Counter,
    bad_reads: Counter,
    skipped_records: Counter,
    download_time: Gauge,
    execution_time: Gauge,
    measurements: Gauge,
}

impl PollMetrics {
    /// Create a new `PollMetrics` and register each metric with the provided `Registry`.
    pub fn new(reg: &mut Registry) -> Self {
        let runs = Counter::default();
        let download_errors = Counter::default();
        let bad_reads = Counter::default();
        let skipped_records = Counter::default();
        let download_time = Gauge::default();
        let execution_time = Gauge::default();
        let measurements = Gauge::default();

        reg.register("sensor_polling_runs", "Total number of completed polls", runs.clone());
        reg.register(
            "sensor_polling_download_errors",
            "Total number of failed downloads",
            download_errors.clone(),
        );
        reg.register(
            "sensor_polling_bad_reads",
            "Total number of readings reported as failed by sensors",
            bad_reads.clone(),
        );
        reg.register(
            "sensor_polling_skipped_records",
            "Total number of readings skipped due to invalid sensor IDs or labels",
            skipped_records.clone(),
        );
        reg.register(
            "sensor_polling_download_time_milliseconds",
            "Time taken to download readings in the last poll",
            download_time.clone(),
        );
        reg.register(
            "sensor_polling_execution_time_milliseconds",
            "Time taken to download readings and update metrics in the last poll",
            execution_time.clone(),
        );
        reg.register(
            "sensor_polling_measurements",
            "Number of readings downloaded in the last poll",
            measurements.clone(),
        );

        Self {
            runs,
            download_errors,
            bad_reads,
            skipped_records,
            download_time,
            execution_time,
            measurements,
        }
    }

    pub fn runs(&self) -> u64 {
        self.runs.get()
    }

    pub fn download_errors(&self) -> u64 {
        self.download_errors.get()
    }

    pub fn bad_reads(&self) -> u64 {
        self.bad_reads.get()
    }

    pub fn skipped_records(&self) -> u64 {
        self.skipped_records.get()
    }

    pub fn measurements(&self) -> i64 {
        self.measurements.get()
    }
}

/// Summary of a single successful poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub bad_reads: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Turns batches of readings into sensor gauges and keeps track of how polling is going.
///
/// The `Poller` owns the catalog and every sensor gauge. Calling `run` performs one
/// complete poll and since it requires `&mut self` polls can never overlap.
#[derive(Debug)]
pub struct Poller {
    catalog: Catalog,
    gauges: SensorGauges,
    metrics: PollMetrics,
}

impl Poller {
    pub fn new(catalog: Catalog, gauges: SensorGauges, metrics: PollMetrics) -> Self {
        Poller {
            catalog,
            gauges,
            metrics,
        }
    }

    /// Fetch the latest readings from `source` and update gauges from them.
    ///
    /// If the fetch fails, no gauges are modified and the previous values of each
    /// remain exported until the next successful poll.
    pub async fn run<S: DataSource>(&mut self, source: &S) -> Result<CycleReport, FetchError> {
        let start = Instant::now();
        let readings = match source.fetch().await {
            Ok(r) => r,
            Err(e) => {
                self.metrics.download_errors.inc();
                tracing::error!(message = "failed to fetch sensor readings", error = %e);
                return Err(e);
            }
        };

        self.metrics.download_time.set(elapsed_millis(start));
        self.metrics.measurements.set(readings.len() as i64);

        let report = self.observe(&readings);

        self.metrics.runs.inc();
        self.metrics.execution_time.set(elapsed_millis(start));
        Ok(report)
    }

    /// Update gauges from each reading in order. Failures only skip the reading involved.
    pub fn observe(&mut self, readings: &[Reading]) -> CycleReport {
        let mut report = CycleReport {
            fetched: readings.len(),
            ..CycleReport::default()
        };

        for reading in readings {
            if !validate::validate(reading).is_valid() {
                self.metrics.bad_reads.inc();
                report.bad_reads += 1;
                continue;
            }

            match self.record(reading) {
                Ok(true) => report.created += 1,
                Ok(false) => report.updated += 1,
                Err(e) => {
                    self.metrics.skipped_records.inc();
                    report.skipped += 1;
                    tracing::warn!(message = "skipping sensor reading", id = %reading.id, error = %e);
                }
            }
        }

        report
    }

    /// Set the gauge for a valid reading, returning true if the gauge was newly created.
    fn record(&mut self, reading: &Reading) -> Result<bool, RecordError> {
        let decoded = decode::decode(&self.catalog, &reading.id)?;
        let labels = labels::build(reading, &decoded);
        let lookup = self.gauges.get_or_create(&reading.id, labels)?;

        lookup.entry().set(reading.value);
        Ok(matches!(lookup, GaugeLookup::Created(_)))
    }

    pub fn gauges(&self) -> &SensorGauges {
        &self.gauges
    }

    pub fn metrics(&self) -> &PollMetrics {
        &self.metrics
    }
}

fn elapsed_millis(start: Instant) -> i64 {
    i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX)
}
