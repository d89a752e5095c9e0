//! Line framing and event normalization for the prediction event stream
//!
//! The backend frames each output token as its own `event: output`
//! block. A newline token arrives as a run of empty `data:` lines;
//! a run of N blanks stands for N-1 newlines and is emitted as one
//! delta when the run ends: at the next real payload, at the end of
//! its event, or at termination. Runs never span events.

use log::trace;

const EVENT_PREFIX: &str = "event:";
const DATA_PREFIX: &str = "data:";
const OUTPUT_EVENT: &str = "output";
const DONE_EVENT: &str = "done";

// ===== Line Splitter =====

/// Splits raw transport bytes into lines, across chunk boundaries
#[derive(Debug, Default)]
pub struct LineSplitter
{   buffer: Vec<u8>
}

impl LineSplitter
{   pub fn new() -> Self
    {   LineSplitter::default()
    }

    /// Complete lines contained in `bytes` plus anything buffered
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String>
    {   self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n')
        {   let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r')
            {   line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }

        lines
    }

    /// Trailing line without a terminator, at end of input
    pub fn finish(&mut self) -> Option<String>
    {   if self.buffer.is_empty()
        {   return None;
        }
        let mut line = std::mem::take(&mut self.buffer);
        if line.last() == Some(&b'\r')
        {   line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

// ===== Stream Normalizer =====

/// What the normalizer asks its driver to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamAction
{   /// Emit a text delta
    Text(String)
  , /// Fetch final usage, emit the stop chunk, end the stream
    Finish
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamState
{   Idle
  , InEvent(String)
  , Closed
}

#[derive(Debug)]
pub struct StreamNormalizer
{   state: StreamState
  , pending_blanks: usize
}

impl Default for StreamNormalizer
{   fn default() -> Self
    {   StreamNormalizer::new()
    }
}

impl StreamNormalizer
{   pub fn new() -> Self
    {   StreamNormalizer
        {   state: StreamState::Idle
          , pending_blanks: 0
        }
    }

    pub fn state(&self) -> &StreamState
    {   &self.state
    }

    pub fn is_closed(&self) -> bool
    {   self.state == StreamState::Closed
    }

    /// Advance by one line; yields zero or more actions in order
    pub fn process_line(&mut self, line: &str) -> Vec<StreamAction>
    {   if self.is_closed()
        {   return vec![];
        }

        if let Some(tag) = line.strip_prefix(EVENT_PREFIX)
        {   let tag = strip_space(tag).trim_end();
            if tag == DONE_EVENT
            {   return self.finish();
            }
            trace!("Stream event: {}", tag);
            let actions = self.flush_blanks().into_iter().collect();
            self.state = StreamState::InEvent(tag.to_string());
            return actions;
        }

        if line.is_empty()
        {   if let StreamState::InEvent(_) = self.state
            {   self.state = StreamState::Idle;
                return self.flush_blanks().into_iter().collect();
            }
            return vec![];
        }

        if let Some(payload) = line.strip_prefix(DATA_PREFIX)
        {   let in_output = matches!(
              &self.state,
              StreamState::InEvent(tag) if tag == OUTPUT_EVENT
            );
            if !in_output
            {   return vec![];
            }

            let payload = strip_space(payload);
            if payload.trim().is_empty()
            {   self.pending_blanks += 1;
                return vec![];
            }

            let mut actions = Vec::with_capacity(2);
            actions.extend(self.flush_blanks());
            actions.push(StreamAction::Text(payload.to_string()));
            return actions;
        }

        trace!("Ignoring stream line: {:?}", line);
        vec![]
    }

    /// Terminate: flush pending breaks, then `Finish`. Also used at EOF.
    pub fn finish(&mut self) -> Vec<StreamAction>
    {   if self.is_closed()
        {   return vec![];
        }
        let mut actions = Vec::with_capacity(2);
        actions.extend(self.flush_blanks());
        actions.push(StreamAction::Finish);
        self.state = StreamState::Closed;
        actions
    }

    fn flush_blanks(&mut self) -> Option<StreamAction>
    {   let blanks = std::mem::take(&mut self.pending_blanks);
        if blanks < 2
        {   return None;
        }
        Some(StreamAction::Text("\n".repeat(blanks - 1)))
    }
}

/// SSE allows one optional space after the field colon
fn strip_space(value: &str) -> &str
{   value.strip_prefix(' ').unwrap_or(value)
}

#[cfg(test)]
mod tests
{   use super::*;

    fn run(lines: &[&str]) -> Vec<StreamAction>
    {   let mut normalizer = StreamNormalizer::new();
        lines.iter()
          .flat_map(|l| normalizer.process_line(l))
          .collect()
    }

    fn text(s: &str) -> StreamAction
    {   StreamAction::Text(s.to_string())
    }

    #[test]
    fn blank_run_collapses_before_next_payload()
    {   let actions = run(&[
          "event: output"
        , "data: "
        , "data: "
        , "data: "
        , "data: hello"
        ]);
        assert_eq!(actions, vec![text("\n\n"), text("hello")]);
    }

    #[test]
    fn single_blank_emits_nothing()
    {   let actions = run(&[
          "event: output", "data: a", ""
        , "event: output", "data: ", ""
        , "event: output", "data: b", ""
        ]);
        assert_eq!(actions, vec![text("a"), text("b")]);
    }

    #[test]
    fn blank_run_ends_with_its_event()
    {   let actions = run(&[
          "event: output", "data: a", ""
        , "event: output", "data: ", "data: ", ""
        , "event: output", "data: ", "data: ", ""
        , "event: output", "data: b", ""
        ]);
        assert_eq!(
          actions,
          vec![text("a"), text("\n"), text("\n"), text("b")]
        );
        let joined: String = actions.iter()
          .filter_map(|a| match a
          {   StreamAction::Text(t) => Some(t.as_str())
            , StreamAction::Finish => None
          })
          .collect();
        assert_eq!(joined, "a\n\nb");
    }

    #[test]
    fn new_event_line_flushes_unterminated_run()
    {   let actions = run(&[
          "event: output", "data: ", "data: ", "data: "
        , "event: output", "data: next"
        ]);
        assert_eq!(actions, vec![text("\n\n"), text("next")]);
    }

    #[test]
    fn done_flushes_pending_blanks_then_finishes()
    {   let actions = run(&[
          "event: output", "data: end", "data: ", "data: ", "data: "
        , "event: done"
        , "data: {}"
        , "event: output", "data: late"
        ]);
        assert_eq!(
          actions,
          vec![text("end"), text("\n\n"), StreamAction::Finish]
        );
    }

    #[test]
    fn done_terminates_from_idle()
    {   let mut normalizer = StreamNormalizer::new();
        assert_eq!(
          normalizer.process_line("event: done"),
          vec![StreamAction::Finish]
        );
        assert!(normalizer.is_closed());
        assert!(normalizer.process_line("event: output").is_empty());
        assert!(normalizer.finish().is_empty());
    }

    #[test]
    fn data_outside_output_events_is_ignored()
    {   let actions = run(&[
          "data: orphan"
        , "event: logs", "data: loading weights", ""
        , "event: output", "data: kept", ""
        , "data: after-close"
        ]);
        assert_eq!(actions, vec![text("kept")]);
    }

    #[test]
    fn blank_line_ends_event()
    {   let mut normalizer = StreamNormalizer::new();
        normalizer.process_line("event: output");
        assert_eq!(
          normalizer.state(),
          &StreamState::InEvent("output".to_string())
        );
        normalizer.process_line("");
        assert_eq!(normalizer.state(), &StreamState::Idle);
    }

    #[test]
    fn unrecognized_lines_are_dropped()
    {   let actions = run(&[
          ": keepalive", "id: 42", "retry: 1000"
        , "event: output", "garbage", "data: ok"
        ]);
        assert_eq!(actions, vec![text("ok")]);
    }

    #[test]
    fn payload_whitespace_is_preserved()
    {   let actions = run(&["event: output", "data:  world", "data:x"]);
        assert_eq!(actions, vec![text(" world"), text("x")]);
    }

    #[test]
    fn splitter_handles_split_lines_and_crlf()
    {   let mut splitter = LineSplitter::new();
        assert!(splitter.push(b"event: out").is_empty());
        assert_eq!(
          splitter.push(b"put\r\ndata: hi\n\nda"),
          vec!["event: output", "data: hi", ""]
        );
        assert_eq!(splitter.push(b"ta: x\n"), vec!["data: x"]);
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn splitter_keeps_multibyte_chars_across_chunks()
    {   let bytes = "data: héllo\n".as_bytes();
        let mut splitter = LineSplitter::new();
        assert!(splitter.push(&bytes[..8]).is_empty());
        assert_eq!(splitter.push(&bytes[8..]), vec!["data: héllo"]);
    }

    #[test]
    fn splitter_returns_unterminated_tail()
    {   let mut splitter = LineSplitter::new();
        splitter.push(b"event: done");
        assert_eq!(splitter.finish(), Some("event: done".to_string()));
        assert_eq!(splitter.finish(), None);
    }
}
