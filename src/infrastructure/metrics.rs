// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

pub const JOBS_STARTED: &str = "analyzrs_jobs_started_total";
pub const JOBS_COMPLETED: &str = "analyzrs_jobs_completed_total";
pub const JOBS_FAILED: &str = "analyzrs_jobs_failed_total";
pub const JOB_DURATION: &str = "analyzrs_job_duration_seconds";
pub const SCANNER_FAILURES: &str = "analyzrs_scanner_failures_total";
pub const ENRICHMENT_FAILURES: &str = "analyzrs_enrichment_failures_total";
pub const LEASES_REQUEUED: &str = "analyzrs_leases_requeued_total";

/// 安装 Prometheus 导出器
pub fn init_metrics(listen_addr: &str) {
    let addr: SocketAddr = match listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address '{}': {}", listen_addr, e);
            return;
        }
    };

    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
        return;
    }

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
}

fn describe_metrics() {
    describe_counter!(JOBS_STARTED, "Total number of analysis jobs started");
    describe_counter!(JOBS_COMPLETED, "Total number of analysis jobs completed");
    describe_counter!(JOBS_FAILED, "Total number of analysis jobs failed");
    describe_histogram!(JOB_DURATION, "Duration of analysis jobs in seconds");
    describe_counter!(
        SCANNER_FAILURES,
        "Total number of scanner failures, labelled by scanner"
    );
    describe_counter!(
        ENRICHMENT_FAILURES,
        "Total number of failed AI enrichment attempts"
    );
    describe_counter!(
        LEASES_REQUEUED,
        "Total number of jobs re-queued after their lease expired"
    );
}
