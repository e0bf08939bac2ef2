/// Prometheus metrics for the queue sync pipeline.
use std::time::Duration;

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, TextEncoder,
};

static SYNC_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "modqueue_sync_runs_total",
            "Completed sync cycles by outcome",
        ),
        &["status"],
    )
    .expect("failed to create modqueue_sync_runs_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register modqueue_sync_runs_total");
    counter
});

static SYNC_PHASE_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "modqueue_sync_phase_duration_seconds",
            "Duration of sync cycle phases",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["phase"],
    )
    .expect("failed to create modqueue_sync_phase_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register modqueue_sync_phase_duration_seconds");
    histogram
});

static POSTS_RECONCILED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "modqueue_posts_reconciled_total",
            "Records processed by the reconciler, by outcome",
        ),
        &["outcome"],
    )
    .expect("failed to create modqueue_posts_reconciled_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register modqueue_posts_reconciled_total");
    counter
});

static SYNC_LAST_BATCH_SIZE: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "modqueue_sync_last_batch_size",
        "Records fetched by the most recent sync cycle",
    )
    .expect("failed to create modqueue_sync_last_batch_size");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register modqueue_sync_last_batch_size");
    gauge
});

pub fn record_sync_run(status: &str) {
    SYNC_RUNS_TOTAL.with_label_values(&[status]).inc();
}

pub fn observe_phase_duration(phase: &str, elapsed: Duration) {
    SYNC_PHASE_DURATION_SECONDS
        .with_label_values(&[phase])
        .observe(elapsed.as_secs_f64());
}

pub fn record_reconciled(outcome: &str, count: u64) {
    POSTS_RECONCILED_TOTAL
        .with_label_values(&[outcome])
        .inc_by(count);
}

pub fn set_last_batch_size(size: i64) {
    SYNC_LAST_BATCH_SIZE.set(size);
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
