use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};

/// Path segments followed by a resource id in the API.
const ID_PARENTS: [&str; 4] = ["modules", "opportunities", "users", "requests"];

/// Records request count and latency per method and normalized path.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(duration);

    response
}

/// Replaces resource ids with `{id}` to keep label cardinality bounded.
/// Module ids can be arbitrary slugs, so position matters as well as shape.
fn normalize_path(path: &str) -> String {
    let mut normalized = Vec::new();
    let mut previous = "";

    for segment in path.split('/') {
        let is_id = !segment.is_empty()
            && (is_uuid_like(segment)
                || is_numeric_id(segment)
                || (ID_PARENTS.contains(&previous) && !is_reserved(segment)));
        normalized.push(if is_id { "{id}" } else { segment });
        previous = segment;
    }

    normalized.join("/")
}

/// Literal sub-routes that sit where an id could be.
fn is_reserved(segment: &str) -> bool {
    matches!(segment, "top-learners")
}

fn is_uuid_like(s: &str) -> bool {
    s.len() == 36 && s.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

fn is_numeric_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
