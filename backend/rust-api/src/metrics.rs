use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // HTTP
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Learning
    pub static ref QUIZZES_GENERATED_TOTAL: IntCounter = register_int_counter!(
        "quizzes_generated_total",
        "Total number of quizzes generated for learners"
    )
    .unwrap();

    pub static ref QUIZ_SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_submissions_total",
        "Total number of graded quiz submissions",
        &["passed"]
    )
    .unwrap();

    pub static ref MODULES_COMPLETED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "modules_completed_total",
        "Module completion requests by outcome",
        &["result"]
    )
    .unwrap();

    // Mentorship
    pub static ref OPPORTUNITY_RESPONSES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "opportunity_responses_total",
        "Learner responses to opportunities",
        &["decision", "outcome"]
    )
    .unwrap();

    pub static ref MATCHES_CREATED_TOTAL: IntCounter = register_int_counter!(
        "matches_created_total",
        "Total number of mentor/learner matches created"
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

pub fn record_quiz_generated() {
    QUIZZES_GENERATED_TOTAL.inc();
}

pub fn record_quiz_submission(passed: bool) {
    let label = if passed { "true" } else { "false" };
    QUIZ_SUBMISSIONS_TOTAL.with_label_values(&[label]).inc();
}

pub fn record_module_completion(newly_completed: bool) {
    let label = if newly_completed {
        "new"
    } else {
        "already_completed"
    };
    MODULES_COMPLETED_TOTAL.with_label_values(&[label]).inc();
}

/// `outcome` is `ok`, `conflict`, `forbidden` or `not_found`.
pub fn record_opportunity_response(decision: &str, outcome: &str) {
    OPPORTUNITY_RESPONSES_TOTAL
        .with_label_values(&[decision, outcome])
        .inc();
}

pub fn record_match_created() {
    MATCHES_CREATED_TOTAL.inc();
}
