use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("veritly.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("veritly.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("veritly.client.request_duration_seconds");

pub(crate) static BOOTSTRAP_SKIPPED: Counter = Counter::new("veritly.bootstrap.skipped");
pub(crate) static BOOTSTRAP_ACQUIRED: Counter = Counter::new("veritly.bootstrap.acquired");
pub(crate) static BOOTSTRAP_FAILURES: Counter = Counter::new("veritly.bootstrap.failures");

pub(crate) static DISPATCH_SENT: Counter = Counter::new("veritly.dispatch.sent");
pub(crate) static DISPATCH_IGNORED_EMPTY: Counter = Counter::new("veritly.dispatch.ignored_empty");
pub(crate) static DISPATCH_REPLIES: Counter = Counter::new("veritly.dispatch.replies");
pub(crate) static DISPATCH_EMPTY_RESPONSES: Counter =
    Counter::new("veritly.dispatch.empty_responses");
pub(crate) static DISPATCH_FAILURES: Counter = Counter::new("veritly.dispatch.failures");
pub(crate) static DISPATCH_STALE: Counter = Counter::new("veritly.dispatch.stale_completions");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&BOOTSTRAP_SKIPPED);
    collector.register_counter(&BOOTSTRAP_ACQUIRED);
    collector.register_counter(&BOOTSTRAP_FAILURES);

    collector.register_counter(&DISPATCH_SENT);
    collector.register_counter(&DISPATCH_IGNORED_EMPTY);
    collector.register_counter(&DISPATCH_REPLIES);
    collector.register_counter(&DISPATCH_EMPTY_RESPONSES);
    collector.register_counter(&DISPATCH_FAILURES);
    collector.register_counter(&DISPATCH_STALE);
}
