//! axum middleware that records every HTTP exchange (request line, ad-hoc
//! `log()` calls, SQL, response, status and timing) and renders it once the
//! exchange ends, to the terminal or to connected browser consoles.

pub mod exchange;
pub mod layer;
pub mod request;
pub mod response;
pub mod sink;

pub use exchange::{Exchange, ExchangeLogger};
pub use hark_core::{LogArg, function_path};
pub use layer::HarkLayer;
pub use response::{LogTransform, ResponseFile, SentFile};
pub use sink::Sink;
