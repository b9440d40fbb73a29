use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("banter.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("banter.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("banter.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("banter.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("banter.stream.errors");

pub(crate) static STORE_APPENDS: Counter = Counter::new("banter.store.appends");
pub(crate) static STORE_APPEND_ERRORS: Counter = Counter::new("banter.store.append_errors");
pub(crate) static STORE_READS: Counter = Counter::new("banter.store.reads");

pub(crate) static RECORDS_SKIPPED: Counter = Counter::new("banter.recorder.skipped");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);

    collector.register_counter(&STORE_APPENDS);
    collector.register_counter(&STORE_APPEND_ERRORS);
    collector.register_counter(&STORE_READS);

    collector.register_counter(&RECORDS_SKIPPED);
}
