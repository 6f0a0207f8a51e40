use crate::client::Client;
use crate::domain::{Event, IngestError};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ForwardError {
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum InputLine {
    /// A complete ingestion event, forwarded unchanged.
    Event(Event),
    /// Anything else, shipped as the payload of an `sdk-log` event.
    Log(Value),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ForwardStats {
    pub lines: u64,
    pub forwarded: u64,
    pub wrapped: u64,
    pub rejected: u64,
}

/// Blank lines yield `None`. Text that is not JSON is logged as a string.
pub fn parse_line(line: &str) -> Option<InputLine> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<Value>(line) else {
        return Some(InputLine::Log(Value::String(line.to_string())));
    };

    if value.is_object()
        && let Ok(event) = serde_json::from_value::<Event>(value.clone())
    {
        return Some(InputLine::Event(event));
    }
    Some(InputLine::Log(value))
}

/// Feeds NDJSON from `reader` into `client` until EOF or `shutdown` fires.
///
/// Events rejected by a full queue are counted and skipped; a closed client
/// ends the loop.
pub async fn forward_lines<R>(
    client: &Client,
    reader: R,
    shutdown: CancellationToken,
) -> Result<ForwardStats, ForwardError>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = ForwardStats::default();
    let mut lines = reader.lines();

    loop {
        let line = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                debug!("Input forwarding interrupted");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            debug!(lines = stats.lines, "End of input");
            break;
        };

        stats.lines += 1;
        let result = match parse_line(&line) {
            None => continue,
            Some(InputLine::Event(event)) => {
                stats.forwarded += 1;
                client.enqueue(event).await
            }
            Some(InputLine::Log(value)) => {
                stats.wrapped += 1;
                client.create_sdk_log(value).await
            }
        };

        match result {
            Ok(()) => {}
            Err(IngestError::QueueFull { max_size }) => {
                stats.rejected += 1;
                warn!(line = stats.lines, max_size, "Queue full, input line dropped");
            }
            Err(IngestError::Closed) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(stats)
}

/// Delivery summary for the end of a run. `None` when the client was not
/// collecting metrics, since every counter would read zero.
pub fn metrics_summary(client: &Client) -> Option<String> {
    client
        .config()
        .metrics_enabled
        .then(|| client.metrics().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventType;
    use serde_json::json;

    #[test]
    fn test_full_event_is_forwarded() {
        let line = r#"{"id":"e1","type":"span-create","timestamp":"2024-05-01T12:00:00.000000000Z","body":{"name":"x"}}"#;
        match parse_line(line) {
            Some(InputLine::Event(event)) => {
                assert_eq!(event.id(), "e1");
                assert_eq!(event.event_type(), EventType::SpanCreate);
                assert_eq!(event.body()["name"], "x");
            }
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn test_other_json_is_wrapped() {
        assert_eq!(
            parse_line(r#"{"level":"info","msg":"hello"}"#),
            Some(InputLine::Log(json!({"level": "info", "msg": "hello"})))
        );
        assert_eq!(parse_line("42"), Some(InputLine::Log(json!(42))));
    }

    #[test]
    fn test_plain_text_becomes_string_log() {
        assert_eq!(
            parse_line("  service started  "),
            Some(InputLine::Log(json!("service started")))
        );
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   \t"), None);
    }

    #[test]
    fn test_unknown_event_type_is_wrapped() {
        let line = r#"{"id":"e1","type":"nope","timestamp":"2024-05-01T12:00:00Z","body":{}}"#;
        assert!(matches!(parse_line(line), Some(InputLine::Log(_))));
    }
}
