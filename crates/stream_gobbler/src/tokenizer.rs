use crate::{ListenerError, TextListeners};

/// Splits decoded text into character and line events.
///
/// Lines end at LF or CRLF; the terminator is stripped from the line but each terminator
/// character is still reported through `on_char`. A lone CR is ordinary line content. The
/// tokenizer keeps its state across calls to [`LineTokenizer::feed`], so a CRLF split between
/// two chunks is still recognised.
#[derive(Debug, Default)]
pub struct LineTokenizer {
    pending: String,
    last_was_cr: bool,
    chars: u64,
    lines: u64,
}

impl LineTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Characters accumulated since the last emitted line.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn chars_seen(&self) -> u64 {
        self.chars
    }

    pub fn lines_emitted(&self) -> u64 {
        self.lines
    }

    pub fn feed(&mut self, text: &str, listeners: &mut TextListeners) -> Result<(), ListenerError> {
        for ch in text.chars() {
            listeners.char(ch)?;
            self.chars += 1;
            if ch == '\n' {
                if self.last_was_cr {
                    self.pending.pop();
                }
                self.emit_line(listeners)?;
            } else {
                self.pending.push(ch);
            }
            self.last_was_cr = ch == '\r';
        }
        Ok(())
    }

    /// Flushes an unterminated final line, then dispatches end-of-stream.
    pub fn finish(&mut self, listeners: &mut TextListeners) -> Result<(), ListenerError> {
        if !self.pending.is_empty() {
            self.emit_line(listeners)?;
        }
        self.last_was_cr = false;
        listeners.end_of_stream()
    }

    fn emit_line(&mut self, listeners: &mut TextListeners) -> Result<(), ListenerError> {
        self.lines += 1;
        let dispatched = listeners.line(&self.pending);
        self.pending.clear();
        dispatched
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::TextListener;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl TextListener for Recorder {
        fn on_char(&mut self, ch: char) -> Result<(), ListenerError> {
            self.0.lock().unwrap().push(format!("char:{ch:?}"));
            Ok(())
        }

        fn on_line(&mut self, line: &str) -> Result<(), ListenerError> {
            self.0.lock().unwrap().push(format!("line:{line}"));
            Ok(())
        }

        fn on_end_of_stream(&mut self) -> Result<(), ListenerError> {
            self.0.lock().unwrap().push("eos".to_string());
            Ok(())
        }
    }

    fn run(chunks: &[&str]) -> Vec<String> {
        let recorder = Recorder::default();
        let mut listeners = TextListeners::new();
        listeners.push(recorder.clone());
        let mut tokenizer = LineTokenizer::new();
        for chunk in chunks {
            tokenizer.feed(chunk, &mut listeners).unwrap();
        }
        tokenizer.finish(&mut listeners).unwrap();
        recorder.calls()
    }

    #[test]
    fn crlf_split_across_feeds_is_one_terminator() {
        let calls = run(&["ab\r", "\ncd"]);
        assert_eq!(
            calls,
            vec![
                "char:'a'",
                "char:'b'",
                "char:'\\r'",
                "char:'\\n'",
                "line:ab",
                "char:'c'",
                "char:'d'",
                "line:cd",
                "eos",
            ]
        );
    }

    #[test]
    fn lone_carriage_return_stays_in_line() {
        let lines: Vec<String> = run(&["50%\r100%\n"])
            .into_iter()
            .filter(|c| c.starts_with("line:"))
            .collect();
        assert_eq!(lines, vec!["line:50%\r100%"]);
    }

    #[test]
    fn pending_buffer_never_holds_a_terminator() {
        let mut listeners = TextListeners::new();
        let mut tokenizer = LineTokenizer::new();
        tokenizer.feed("x\r\n", &mut listeners).unwrap();
        assert_eq!(tokenizer.pending(), "");
        tokenizer.feed("y\n\n", &mut listeners).unwrap();
        assert_eq!(tokenizer.pending(), "");
        assert_eq!(tokenizer.lines_emitted(), 3);
        assert_eq!(tokenizer.chars_seen(), 6);
    }

    #[test]
    fn failing_line_listener_still_clears_the_buffer() {
        let mut listeners = TextListeners::new();
        listeners.push(crate::line_listener(|_| Err(ListenerError::new("nope"))));
        let mut tokenizer = LineTokenizer::new();
        assert!(tokenizer.feed("abc\n", &mut listeners).is_err());
        assert_eq!(tokenizer.pending(), "");
    }
}
