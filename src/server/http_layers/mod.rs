mod rate_limit;
mod requests_logging;

pub use rate_limit::{
    throttled, ClientIpKeyExtractor, SessionTokenKeyExtractor, LOGIN_PER_MINUTE,
    REQUESTS_PER_MINUTE,
};
pub use requests_logging::{log_requests, RequestsLoggingLevel};
