//! Outbound HTTP helpers shared by probes and alert channels

use std::time::Duration;

/// Longest response body kept in an error, in characters
pub const ERROR_BODY_LIMIT: usize = 200;

pub(crate) fn client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client")
}

/// Cut `body` to [`ERROR_BODY_LIMIT`] characters, never splitting a character
pub fn clip_body(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}

/// Status code and clipped body of a failed response
pub(crate) async fn failure(response: reqwest::Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    (status, clip_body(&body))
}
