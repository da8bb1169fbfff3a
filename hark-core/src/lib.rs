pub mod buffer;
pub mod callsite;
pub mod color;
pub mod config;
pub mod entry;
pub mod error;
pub mod render;
pub mod sql;
pub mod tokenizer;

pub use buffer::{LogRecordBuffer, RequestLine};
pub use callsite::{CallSite, CallerResolver, Frame, FrameResolver};
pub use config::{HarkConfig, Options};
pub use entry::{EntryValue, Kind, LogArg, LogEntry};
pub use error::HarkError;
pub use render::{Rendered, render};
pub use tokenizer::{Token, tokenize};
