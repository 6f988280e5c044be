// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`host`] spawns one child, pumps its output, and answers prompts.
//! - [`protocol`] decodes `@@REMAKE@@` control lines.
//! - [`allow_list`] decides which executables may run at all.
//! - [`sink`] / [`responder`] are the caller-facing seams.
//! - [`backend`] provides the `ProcessBackend` trait the dispatcher uses,
//!   which tests replace with a fake.
//! - [`tree_kill`] stops a child together with its descendants.

pub mod allow_list;
pub mod backend;
pub mod host;
pub mod protocol;
pub mod responder;
pub mod sink;
pub mod tree_kill;

pub use allow_list::{ExecutableAllowList, Rejection};
pub use backend::ProcessBackend;
pub use host::{
    CANCELLED_EXIT_CODE, ExecutionIo, HostOptions, ProcessHost, ProcessRequest,
};
pub use protocol::{CONTROL_PREFIX, ControlEvent, DecodedLine, decode_line, encode_event};
pub use responder::{FnResponder, PromptResponder, QueuedResponder};
pub use sink::{ChannelSink, EventSink, OutputLine, SinkMessage, TracingSink};
