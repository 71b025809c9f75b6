/// Classification for retry policy.
///
/// Used to determine how the crawler should respond to a failed fetch
/// attempt for a key.
///
/// # Behavior Summary
///
/// | Class | Retry Same Key? | Backoff Applied? |
/// |-------|-----------------|------------------|
/// | `Never` | No | No |
/// | `WithBackoff` | Yes, until `max_retries` | Yes (exponential + jitter) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - the error is terminal for this crawl call.
    ///
    /// Covers client-side rejections (4xx other than 429), malformed
    /// documents, and schema errors. Repeating the same request cannot
    /// produce a different answer.
    Never,

    /// Retry with exponential backoff plus jitter.
    ///
    /// Covers connection-level failures, 5xx responses, and 429 rate
    /// limiting. When the upstream supplied a `Retry-After` hint, the
    /// crawler waits at least that long before the next attempt.
    WithBackoff,
}
