//! Async client for the Dosewise API: typed HTTP calls, the auth state
//! machine used by the app shell, and periodic dashboard refresh.

pub mod backend;
pub mod error;
pub mod http;
pub mod poll;
pub mod session;

pub use backend::AuthBackend;
pub use error::{ClientError, Result};
pub use http::HttpBackend;
pub use poll::Refresh;
pub use session::{AuthContext, RetryPolicy};
