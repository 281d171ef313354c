mod error_handler;
mod metrics;
mod rate_limit;
mod response_cache;

pub use error_handler::log_errors;
pub use metrics::track_requests;
pub use rate_limit::{RateLimiter, rate_limit};
pub use response_cache::{CachePolicy, response_cache};
