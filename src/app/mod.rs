pub mod forward;
pub mod logging_system;

pub use forward::{
    ForwardError, ForwardStats, InputLine, forward_lines, metrics_summary, parse_line,
};
pub use logging_system::{LoggingError, LoggingSystem, setup_logging};

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
