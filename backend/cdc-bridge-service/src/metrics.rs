use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, TextEncoder};

static BATCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "cdc_bridge_batches_total",
            "Change-capture batches finished, by outcome",
        ),
        &["destination", "outcome"],
    )
    .expect("failed to create cdc_bridge_batches_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register cdc_bridge_batches_total");
    counter
});

static RECORDS_PUBLISHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "cdc_bridge_records_published_total",
            "Change records confirmed by the broker",
        ),
        &["destination"],
    )
    .expect("failed to create cdc_bridge_records_published_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register cdc_bridge_records_published_total");
    counter
});

static PUBLISH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "cdc_bridge_publish_failures_total",
            "Change records the broker failed or did not confirm",
        ),
        &["destination"],
    )
    .expect("failed to create cdc_bridge_publish_failures_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register cdc_bridge_publish_failures_total");
    counter
});

static RESTARTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "cdc_bridge_restarts_total",
            "Supervisor restarts of a stream, by failure class",
        ),
        &["destination", "class"],
    )
    .expect("failed to create cdc_bridge_restarts_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register cdc_bridge_restarts_total");
    counter
});

/// Counters for one stream, pre-bound to its destination label.
#[derive(Clone)]
pub struct StreamMetrics {
    destination: String,
    pub batches_acked: IntCounter,
    pub batches_rolled_back: IntCounter,
    pub records_published: IntCounter,
    pub publish_failures: IntCounter,
}

impl StreamMetrics {
    pub fn new(destination: &str) -> Self {
        Self {
            destination: destination.to_string(),
            batches_acked: BATCHES_TOTAL.with_label_values(&[destination, "acked"]),
            batches_rolled_back: BATCHES_TOTAL.with_label_values(&[destination, "rolled_back"]),
            records_published: RECORDS_PUBLISHED_TOTAL.with_label_values(&[destination]),
            publish_failures: PUBLISH_FAILURES_TOTAL.with_label_values(&[destination]),
        }
    }

    pub fn record_restart(&self, class: &str) {
        RESTARTS_TOTAL
            .with_label_values(&[self.destination.as_str(), class])
            .inc();
    }
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
