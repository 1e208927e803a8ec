// Fetch infrastructure: the page fetcher abstraction, the scoped session
// guard, politeness throttling, HTML table parsing, and the HTTP session.

pub mod fetch;
pub mod http;
pub mod table;
pub mod throttle;

pub use fetch::{FetchError, PageFetcher, ScopedSession, Session};
pub use table::{Cell, Row, Table};
pub use throttle::{RateLimiter, Throttled};
