use axum::extract::FromRequestParts;
use http::request::Parts;
use hark_core::{CallSite, CallerResolver, Frame, HarkError, LogArg, LogRecordBuffer};
use std::convert::Infallible;
use std::panic::Location;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;
use uuid::Uuid;

/// Per-exchange state shared between the middleware and the handler.
///
/// The buffer lives in a slot that is emptied by the single terminal render;
/// anything arriving after that finds the slot empty and is dropped.
#[derive(Clone)]
pub struct Exchange {
    id: Uuid,
    slot: Arc<Mutex<Option<LogRecordBuffer>>>,
    resolver: Arc<dyn CallerResolver>,
}

impl Exchange {
    pub fn new(buffer: LogRecordBuffer, resolver: Arc<dyn CallerResolver>) -> Self {
        Self {
            id: Uuid::new_v4(),
            slot: Arc::new(Mutex::new(Some(buffer))),
            resolver,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn resolve(&self, frame: Frame<'_>) -> Option<CallSite> {
        self.resolver.resolve_caller(&[frame])
    }

    /// Run `f` against the buffer, or return `None` once the exchange is finished.
    pub fn with_buffer<R>(&self, f: impl FnOnce(&mut LogRecordBuffer) -> R) -> Option<R> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_mut().map(f)
    }

    /// Take the buffer for the terminal render. Only the first caller gets it.
    pub fn finish(&self) -> Option<LogRecordBuffer> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub fn is_finished(&self) -> bool {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("id", &self.id)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Handler-side logging handle, extracted from the request.
///
/// Outside a logged exchange (filtered path, middleware not installed) every
/// call is a no-op.
#[derive(Clone, Debug, Default)]
pub struct ExchangeLogger {
    exchange: Option<Exchange>,
}

impl ExchangeLogger {
    pub fn attached(exchange: Exchange) -> Self {
        Self {
            exchange: Some(exchange),
        }
    }

    pub fn detached() -> Self {
        Self::default()
    }

    pub fn is_attached(&self) -> bool {
        self.exchange.is_some()
    }

    /// Append one composite `log` entry with `args` as its parts.
    ///
    /// Serialization failures are returned to the caller.
    #[track_caller]
    pub fn log<I, A>(&self, args: I) -> Result<(), HarkError>
    where
        I: IntoIterator<Item = A>,
        A: Into<LogArg>,
    {
        self.log_from(Location::caller(), None, args.into_iter().map(Into::into).collect())
    }

    #[doc(hidden)]
    pub fn log_from(
        &self,
        location: &'static Location<'static>,
        function: Option<&'static str>,
        args: Vec<LogArg>,
    ) -> Result<(), HarkError> {
        let Some(exchange) = &self.exchange else {
            return Ok(());
        };
        let site = exchange.resolve(Frame::from_location(location, function));
        match exchange.with_buffer(|buffer| buffer.append_log(args, site)) {
            Some(result) => result,
            None => {
                debug!(exchange = %exchange.id, "Exchange already rendered, dropping log call");
                Ok(())
            }
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ExchangeLogger {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<ExchangeLogger>().cloned().unwrap_or_default())
    }
}

/// Log through an [`ExchangeLogger`], recording the enclosing function name.
///
/// ```ignore
/// hark_log!(logger, "loading user", json!({"id": id}))?;
/// ```
#[macro_export]
macro_rules! hark_log {
    ($logger:expr $(, $arg:expr)* $(,)?) => {{
        let args: ::std::vec::Vec<$crate::LogArg> = ::std::vec![$($crate::LogArg::from($arg)),*];
        $logger.log_from(
            ::std::panic::Location::caller(),
            ::std::option::Option::Some($crate::function_path!()),
            args,
        )
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use hark_core::{FrameResolver, Kind, Options, RequestLine};
    use serde_json::json;

    fn exchange_with(resolver: FrameResolver) -> Exchange {
        let request = RequestLine {
            method: "GET".into(),
            path: "/".into(),
            payload: json!({}),
        };
        let buffer = LogRecordBuffer::start(&request, Arc::new(Options::default())).unwrap();
        Exchange::new(buffer, Arc::new(resolver))
    }

    fn exchange() -> Exchange {
        exchange_with(FrameResolver::default())
    }

    #[test]
    fn log_attaches_caller_location() {
        let exchange = exchange();
        let logger = ExchangeLogger::attached(exchange.clone());
        let line = line!() + 1;
        logger.log(["hello"]).unwrap();

        let buffer = exchange.finish().unwrap();
        let debug = &buffer.entries()[1];
        assert_eq!(debug.kind, Kind::Debug);
        let text = debug.as_text().unwrap();
        assert!(text.contains(&format!("exchange.rs:{line}")), "{text}");
    }

    #[test]
    fn macro_records_function_name() {
        // These tests live inside the internal prefix, so widen the resolver.
        let exchange = exchange_with(FrameResolver::new(""));
        let logger = ExchangeLogger::attached(exchange.clone());
        crate::hark_log!(logger, "a", json!({"b": 1})).unwrap();

        let buffer = exchange.finish().unwrap();
        let debug = buffer.entries()[1].as_text().unwrap();
        assert!(debug.ends_with("(macro_records_function_name)"), "{debug}");
        assert_eq!(buffer.entries()[2].parts().unwrap().len(), 2);
    }

    #[test]
    fn internal_callers_get_no_debug_entry() {
        let exchange = exchange();
        let logger = ExchangeLogger::attached(exchange.clone());
        crate::hark_log!(logger, "from inside the middleware crate").unwrap();

        let buffer = exchange.finish().unwrap();
        let kinds: Vec<Kind> = buffer.entries().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![Kind::Request, Kind::Log]);
        assert!(buffer.start_time().is_none());
    }

    #[test]
    fn finish_is_exactly_once() {
        let exchange = exchange();
        assert!(exchange.finish().is_some());
        assert!(exchange.finish().is_none());
        assert!(exchange.is_finished());
    }

    #[test]
    fn log_after_finish_is_dropped() {
        let exchange = exchange();
        let logger = ExchangeLogger::attached(exchange.clone());
        exchange.finish();
        assert!(logger.log(["late"]).is_ok());
        assert!(exchange.with_buffer(|b| b.entries().len()).is_none());
    }

    #[test]
    fn detached_logger_is_noop() {
        let logger = ExchangeLogger::detached();
        assert!(!logger.is_attached());
        assert!(logger.log(["ignored"]).is_ok());
    }
}
