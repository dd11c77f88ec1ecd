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

use clap::Parser;
use lx_sensor_exporter::cache::SensorGauges;
use lx_sensor_exporter::catalog::Catalog;
use lx_sensor_exporter::client::{OpendataClient, DEFAULT_API_URL};
use lx_sensor_exporter::http::RequestContext;
use lx_sensor_exporter::poller::{PollMetrics, Poller};
use prometheus_client::registry::Registry;
use reqwest::{Client, Url};
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{self, SignalKind};
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, Level};

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 9090);
const DEFAULT_REFRESH_SECS: u64 = 300;
const DEFAULT_TIMEOUT_MILLIS: u64 = 5000;
const DEFAULT_NAMESPACE: &str = "lx";

#[derive(Debug, Parser)]
#[clap(name = "lx_sensor_exporter", version = clap::crate_version!())]
struct LxSensorExporterApplication {
    /// URL of the open data API returning the latest reading of each sensor
    #[clap(long, default_value = DEFAULT_API_URL)]
    api_url: Url,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Fetch sensor readings from the open data API at this interval, in seconds. The next
    /// fetch is only started once the previous one has completed.
    #[clap(long, default_value_t = DEFAULT_REFRESH_SECS)]
    refresh_secs: u64,

    /// Timeout for fetching sensor readings from the open data API, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_MILLIS)]
    timeout_millis: u64,

    /// Prefix added to the name of every metric emitted
    #[clap(long, default_value_t = DEFAULT_NAMESPACE.into())]
    namespace: String,

    /// Address to bind to. By default, lx_sensor_exporter will bind to public address since
    /// the purpose is to expose metrics to an external system (Prometheus or another
    /// agent for ingestion)
    #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = LxSensorExporterApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    let timeout = Duration::from_millis(opts.timeout_millis);
    let http_client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    let client = OpendataClient::new(http_client, opts.api_url.clone());
    let mut registry = Registry::with_prefix(opts.namespace.as_str());
    let gauges = SensorGauges::new(&mut registry);
    let metrics = PollMetrics::new(&mut registry);
    let mut poller = Poller::new(Catalog::default(), gauges, metrics);

    let mut interval = tokio::time::interval(Duration::from_secs(opts.refresh_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let api_url = opts.api_url.clone();
    tokio::spawn(async move {
        tracing::info!(message = "sensor polling started", api_url = %api_url);

        loop {
            let _ = interval.tick().await;
            // Errors are logged and counted by the poller, the next tick is the retry
            if let Ok(report) = poller
                .run(&client)
                .instrument(tracing::span!(Level::DEBUG, "lx_sensor_poll"))
                .await
            {
                tracing::info!(
                    message = "fetched new sensor readings",
                    fetched = report.fetched,
                    created = report.created,
                    updated = report.updated,
                    bad_reads = report.bad_reads,
                    skipped = report.skipped,
                    sensors = poller.gauges().len(),
                );
            }
        }
    });

    let context = Arc::new(RequestContext::new(registry));
    let app = lx_sensor_exporter::http::router(context);
    let server = axum::Server::try_bind(&opts.bind)
        .unwrap_or_else(|e| {
            tracing::error!(message = "error binding to address", address = %opts.bind, error = %e);
            process::exit(1)
        })
        .serve(app.into_make_service());

    tracing::info!(message = "server started", address = %server.local_addr());
    server
        .with_graceful_shutdown(async {
            // Wait for either SIGTERM or SIGINT to shutdown
            tokio::select! {
                _ = sigterm() => {}
                _ = sigint() => {}
            }
        })
        .await?;

    tracing::info!("server shutdown");
    Ok(())
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    unix::signal(SignalKind::interrupt())?.recv().await;
    Ok(())
}
