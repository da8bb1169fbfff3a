use hark_broadcast::Broadcaster;
use hark_core::Rendered;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a rendered exchange goes.
#[derive(Clone, Default)]
pub enum Sink {
    /// Colorized text on stdout.
    #[default]
    Stdout,
    /// Plain text as an `info` event on the `hark::exchange` target.
    Tracing,
    /// Hand the rendered exchange to a closure.
    Callback(Arc<dyn Fn(&Rendered) + Send + Sync>),
    /// Push to every connected browser client.
    Broadcast(Broadcaster),
}

impl Sink {
    pub fn callback(f: impl Fn(&Rendered) + Send + Sync + 'static) -> Self {
        Self::Callback(Arc::new(f))
    }

    pub fn emit(&self, rendered: &Rendered) {
        match self {
            Sink::Stdout => {
                if let Err(e) = write_exchange(&mut std::io::stdout().lock(), &rendered.text) {
                    debug!(error = %e, "Failed to write exchange to stdout");
                }
            }
            Sink::Tracing => {
                info!(target: "hark::exchange", "{}", plain_text(rendered));
            }
            Sink::Callback(f) => f(rendered),
            Sink::Broadcast(broadcaster) => match broadcaster.publish_rendered(rendered) {
                Ok(delivered) => debug!(subscribers = delivered, "Exchange broadcast"),
                Err(e) => warn!(error = %e, "Failed to broadcast exchange"),
            },
        }
    }
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sink::Stdout => f.write_str("Stdout"),
            Sink::Tracing => f.write_str("Tracing"),
            Sink::Callback(_) => f.write_str("Callback"),
            Sink::Broadcast(b) => f.debug_tuple("Broadcast").field(&b.len()).finish(),
        }
    }
}

/// Multiline renders already end with a newline.
fn write_exchange(out: &mut impl Write, text: &str) -> std::io::Result<()> {
    if text.ends_with('\n') {
        write!(out, "{text}")
    } else {
        writeln!(out, "{text}")
    }
}

/// Token values without styling.
pub fn plain_text(rendered: &Rendered) -> String {
    rendered.tokens.iter().map(|t| t.value()).collect()
}
