pub mod job_runner;
pub mod line_parser;
pub mod status;
pub mod worker;

pub use job_runner::JobRunner;
pub use status::{ChannelSink, LogSink, StatusSink};
pub use worker::{spawn_run, RunHandle};
