use lazy_static::lazy_static;
use prometheus::{IntCounterVec, Opts, Registry};

lazy_static! {
    pub static ref CONFIG_CHANGES: IntCounterVec = IntCounterVec::new(
        Opts::new("config_changes", "Accepted configuration changes"),
        &["object_type", "action"]
    )
    .expect("metric can not be created");

    pub static ref CONFIG_REJECTIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("config_rejections", "Rejected configuration changes"),
        &["object_type"]
    )
    .expect("metric can not be created");

    pub static ref ROLLBACK_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("config_rollback_failures", "Failed callback compensations"),
        &["component"]
    )
    .expect("metric can not be created");

    pub static ref PERSIST_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("config_persist_failures", "Configuration file update failures"),
        &["file"]
    )
    .expect("metric can not be created");

    pub static ref SYNC_MESSAGES: IntCounterVec = IntCounterVec::new(
        Opts::new("config_sync_messages", "Replication messages by direction"),
        &["direction"]
    )
    .expect("metric can not be created");

    pub static ref SYNC_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("config_sync_failures", "Replication failures"),
        &["direction"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

/// Register the control-plane collectors with the shared registry.
/// Registration errors only occur on double-registration, which is a
/// startup wiring bug; they are ignored so re-initialization in tests
/// stays harmless.
pub fn register_custom_metrics() {
    let _ = REGISTRY.register(Box::new(CONFIG_CHANGES.clone()));
    let _ = REGISTRY.register(Box::new(CONFIG_REJECTIONS.clone()));
    let _ = REGISTRY.register(Box::new(ROLLBACK_FAILURES.clone()));
    let _ = REGISTRY.register(Box::new(PERSIST_FAILURES.clone()));
    let _ = REGISTRY.register(Box::new(SYNC_MESSAGES.clone()));
    let _ = REGISTRY.register(Box::new(SYNC_FAILURES.clone()));
}

/// Export metrics in the Prometheus text format for an external scraper.
pub fn get_metrics_body() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        eprintln!("could not encode custom metrics: {}", e);
    };
    String::from_utf8(buffer).unwrap_or_default()
}
