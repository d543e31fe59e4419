//! Line-level SSE parsing.

use super::events::{SseLine, StreamEvent};

/// Parse a single SSE line into its component type
pub fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() {
        return SseLine::Empty;
    }

    if let Some(rest) = line.strip_prefix("event:") {
        return SseLine::Event(rest.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("data:") {
        return SseLine::Data(rest.trim().to_string());
    }

    SseLine::Other(line.to_string())
}

/// Stateful SSE parser that accumulates lines and emits complete events
#[derive(Debug, Default)]
pub struct SseParser {
    /// Pending event type
    current_event_type: Option<String>,
    /// Pending data lines (SSE allows multiple data: lines)
    data_buffer: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its terminator), returning an event when the
    /// line completes a record.
    ///
    /// A blank line emits only if both an event type and at least one data
    /// line are pending; the pending state is cleared either way.
    pub fn feed_line(&mut self, line: &str) -> Option<StreamEvent> {
        match parse_sse_line(line) {
            SseLine::Event(event_type) => {
                self.current_event_type = (!event_type.is_empty()).then_some(event_type);
                None
            }
            SseLine::Data(data) => {
                self.data_buffer.push(data);
                None
            }
            SseLine::Empty => self.take_event(),
            SseLine::Other(_) => None,
        }
    }

    fn take_event(&mut self) -> Option<StreamEvent> {
        let event_type = self.current_event_type.take();
        let data_lines = std::mem::take(&mut self.data_buffer);

        match event_type {
            Some(event_type) if !data_lines.is_empty() => {
                Some(StreamEvent::new(event_type, data_lines.join("\n")))
            }
            _ => None,
        }
    }

    /// Reset parser state, dropping any partial record
    pub fn reset(&mut self) {
        self.current_event_type = None;
        self.data_buffer.clear();
    }

    /// True when a record has been started but not terminated.
    pub fn has_pending(&self) -> bool {
        self.current_event_type.is_some() || !self.data_buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feed_all(parser: &mut SseParser, text: &str) -> Vec<StreamEvent> {
        text.split('\n').filter_map(|l| parser.feed_line(l)).collect()
    }

    #[test]
    fn test_parse_sse_line() {
        assert_eq!(parse_sse_line(""), SseLine::Empty);
        assert_eq!(
            parse_sse_line("event:  message"),
            SseLine::Event("message".to_string())
        );
        assert_eq!(
            parse_sse_line("data: {\"a\":1}"),
            SseLine::Data("{\"a\":1}".to_string())
        );
        assert_eq!(
            parse_sse_line(": keep-alive"),
            SseLine::Other(": keep-alive".to_string())
        );
        assert_eq!(parse_sse_line("id: 7"), SseLine::Other("id: 7".to_string()));
    }

    #[test]
    fn test_single_event() {
        let mut parser = SseParser::new();
        let events = feed_all(&mut parser, "event: message\ndata: {\"seq\":1}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "message");
        assert_eq!(events[0].data, json!({"seq": 1}));
    }

    #[test]
    fn test_multi_line_data_joined_in_order() {
        let mut parser = SseParser::new();
        let events = feed_all(
            &mut parser,
            "event: note\ndata: first\ndata: second\ndata: third\n\n",
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].raw, "first\nsecond\nthird");
        assert_eq!(
            events[0].data,
            serde_json::Value::String("first\nsecond\nthird".to_string())
        );
    }

    #[test]
    fn test_multi_line_json_payload() {
        let mut parser = SseParser::new();
        let events = feed_all(&mut parser, "event: message\ndata: {\"seq\":\ndata: 4}\n\n");
        assert_eq!(events[0].data, json!({"seq": 4}));
        assert_eq!(events[0].seq(), Some(4));
    }

    #[test]
    fn test_sequence_preserves_order() {
        let mut parser = SseParser::new();
        let text = "event: message\ndata: a\n\nevent: typing\ndata: b\n\nevent: message_deleted\ndata: c\n\n";
        let events = feed_all(&mut parser, text);
        let pairs: Vec<_> = events
            .iter()
            .map(|e| (e.event_type.as_str(), e.raw.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("message", "a"), ("typing", "b"), ("message_deleted", "c")]
        );
    }

    #[test]
    fn test_record_without_type_or_data_is_dropped() {
        let mut parser = SseParser::new();
        assert!(feed_all(&mut parser, "data: orphan\n\n").is_empty());
        assert!(feed_all(&mut parser, "event: lonely\n\n").is_empty());
        assert!(feed_all(&mut parser, "event:\ndata: x\n\n").is_empty());
        // State is cleared after each terminator
        let events = feed_all(&mut parser, "data: y\n\n");
        assert!(events.is_empty());
        assert!(!parser.has_pending());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let mut parser = SseParser::new();
        let events = feed_all(
            &mut parser,
            ": comment\nid: 9\nretry: 1000\nevent: message\ndata: {}\n\n",
        );
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_reset_drops_partial_record() {
        let mut parser = SseParser::new();
        parser.feed_line("event: message");
        parser.feed_line("data: partial");
        assert!(parser.has_pending());
        parser.reset();
        assert!(parser.feed_line("").is_none());
    }
}
