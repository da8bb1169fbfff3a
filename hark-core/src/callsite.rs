//! Call-site provenance for log entries.
//!
//! Rust has no cheap symbolized stack walk, so callers hand the resolver the
//! frames they can see: the `#[track_caller]` location of the logging call
//! and, when logged through `hark_log!`, the enclosing function path.

use serde::{Deserialize, Serialize};
use std::panic::Location;

/// Default prefix of frames that belong to the logging machinery itself.
pub const DEFAULT_INTERNAL_PREFIX: &str = "hark_middleware::";

/// Where a log call came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub file: String,
    pub function: Option<String>,
    pub line: u32,
}

impl std::fmt::Display for CallSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)?;
        if let Some(function) = &self.function {
            write!(f, " ({function})")?;
        }
        Ok(())
    }
}

/// One candidate stack frame, innermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub file: &'a str,
    pub line: u32,
    /// Full function path, e.g. `my_app::handlers::sum::{{closure}}`.
    pub function: Option<&'a str>,
}

impl Frame<'static> {
    pub fn from_location(location: &'static Location<'static>, function: Option<&'static str>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
            function,
        }
    }
}

/// Capability that turns visible frames into the caller's call site.
pub trait CallerResolver: Send + Sync + std::fmt::Debug {
    fn resolve_caller(&self, frames: &[Frame<'_>]) -> Option<CallSite>;
}

/// Picks the first frame that is not part of the logging internals.
#[derive(Debug, Clone)]
pub struct FrameResolver {
    internal_prefix: String,
}

impl FrameResolver {
    pub fn new(internal_prefix: impl Into<String>) -> Self {
        Self {
            internal_prefix: internal_prefix.into(),
        }
    }

    fn is_internal(&self, frame: &Frame<'_>) -> bool {
        !self.internal_prefix.is_empty()
            && frame
                .function
                .is_some_and(|name| name.starts_with(&self.internal_prefix))
    }
}

impl Default for FrameResolver {
    fn default() -> Self {
        Self::new(DEFAULT_INTERNAL_PREFIX)
    }
}

impl CallerResolver for FrameResolver {
    fn resolve_caller(&self, frames: &[Frame<'_>]) -> Option<CallSite> {
        let frame = frames.iter().find(|f| !self.is_internal(f))?;
        Some(CallSite {
            file: frame.file.to_string(),
            function: frame.function.and_then(display_name),
            line: frame.line,
        })
    }
}

/// Last named path segment of a function path. Closure and async-body
/// segments are skipped; names with a leading underscore are internal
/// by convention and reported as anonymous.
pub fn display_name(path: &str) -> Option<String> {
    let name = path
        .rsplit("::")
        .find(|segment| !segment.is_empty() && !segment.starts_with('{'))?;
    if name.starts_with('_') {
        return None;
    }
    Some(name.to_string())
}

/// Expands to the path of the enclosing function.
#[macro_export]
macro_rules! function_path {
    () => {{
        fn __here() {}
        fn __name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = __name_of(__here);
        name.strip_suffix("::__here").unwrap_or(name)
    }};
}
