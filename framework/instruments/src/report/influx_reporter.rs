use std::time::SystemTime;

use anyhow::Context;
use influxdb::{Client, InfluxDbWriteable, Timestamp, WriteQuery};
use loadcell_core::prelude::DelegatedShutdownListener;
use tokio::runtime::Runtime;
use tokio::select;
use tokio::sync::mpsc::UnboundedSender;

use crate::report::{CheckRecord, ReportCollector};
use crate::OperationRecord;

/// Ships per-operation and per-check points to InfluxDB.
///
/// Records are queued on an unbounded channel and written by a background task on the shared
/// runtime, so agents never block on the metrics backend. Remaining points are drained when the
/// shutdown signal arrives.
pub struct InfluxReporter {
    writer: UnboundedSender<WriteQuery>,
    run_id: String,
}

impl InfluxReporter {
    pub fn new(
        runtime: &Runtime,
        shutdown_listener: DelegatedShutdownListener,
        run_id: String,
    ) -> anyhow::Result<Self> {
        let client = Client::new(
            std::env::var("INFLUX_HOST").context(
                "Cannot configure the influx reporter without environment variable `INFLUX_HOST`",
            )?,
            std::env::var("INFLUX_BUCKET").context(
                "Cannot configure the influx reporter without environment variable `INFLUX_BUCKET`",
            )?,
        )
        .with_token(std::env::var("INFLUX_TOKEN").context(
            "Cannot configure the influx reporter without environment variable `INFLUX_TOKEN`",
        )?);

        let writer = start_influx_write_task(runtime, shutdown_listener, client);

        Ok(Self { writer, run_id })
    }

    fn timestamp() -> Timestamp {
        Timestamp::Nanoseconds(
            SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos(),
        )
    }

    fn submit(&self, query: WriteQuery) {
        if self.writer.send(query).is_err() {
            log::warn!("Influx write task has stopped, dropping metric");
        }
    }
}

impl ReportCollector for InfluxReporter {
    fn add_operation(&mut self, operation_record: &OperationRecord) {
        let Some(elapsed) = operation_record.elapsed else {
            // An unfinished record has no duration to report.
            return;
        };

        let mut query = Self::timestamp()
            .into_query("loadcell.operation_duration")
            .add_field("value", elapsed.as_micros() as f64 / 1000.0)
            .add_tag("operation_id", operation_record.operation_id.to_string())
            .add_tag("is_error", operation_record.is_error.to_string())
            .add_tag("run_id", self.run_id.to_string());

        for (k, v) in &operation_record.attr {
            query = query.add_tag(k.as_str(), v.to_string());
        }

        self.submit(query);
    }

    fn add_check(&mut self, check: &CheckRecord) {
        let query = Self::timestamp()
            .into_query("loadcell.check")
            .add_field("passed", i64::from(check.passed))
            .add_tag("check", check.name.to_string())
            .add_tag("run_id", self.run_id.to_string());

        self.submit(query);
    }

    fn finalize(&self) {
        // Draining happens in the write task when the shutdown signal arrives.
    }
}

fn start_influx_write_task(
    runtime: &Runtime,
    mut shutdown_listener: DelegatedShutdownListener,
    client: Client,
) -> UnboundedSender<WriteQuery> {
    let (writer, mut receiver) = tokio::sync::mpsc::unbounded_channel();
    runtime.spawn(async move {
        loop {
            select! {
                _ = shutdown_listener.wait_for_shutdown() => {
                    log::debug!("Shutting down the influx reporter");
                    break;
                }
                query = receiver.recv() => {
                    if let Some(query) = query {
                        if let Err(e) = client.query(query).await {
                            log::warn!("Failed to send metric to InfluxDB: {}", e);
                        }
                    } else {
                        break;
                    }
                }
            }
        }

        log::trace!("Draining any remaining metrics before shutting down...");
        let mut drain_count = 0;

        while let Ok(query) = receiver.try_recv() {
            if let Err(e) = client.query(query).await {
                log::warn!("Failed to send metric to InfluxDB: {}", e);
            }
            drain_count += 1;
        }

        log::debug!("Drained {} remaining metrics", drain_count);
    });
    writer
}
