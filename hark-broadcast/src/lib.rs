pub mod broadcaster;
pub mod client;
pub mod server;

pub use broadcaster::{Broadcaster, SubscriberId, Subscription, WirePayload};
pub use client::{ConsoleCall, client_script, render_console};
pub use server::{serve, ws_router};
