#![allow(dead_code)]

use std::{
    collections::VecDeque,
    io,
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll},
};

use stream_gobbler::{ListenerError, TextListener};
use tokio::io::{AsyncRead, ReadBuf};

/// Reader that hands out exactly the scripted chunks, then end-of-stream.
pub struct ScriptedReader {
    steps: VecDeque<Step>,
}

enum Step {
    Data(Vec<u8>),
    Fail(io::ErrorKind),
}

impl ScriptedReader {
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
        }
    }

    pub fn chunk(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.steps.push_back(Step::Data(bytes.as_ref().to_vec()));
        self
    }

    pub fn fail(mut self, kind: io::ErrorKind) -> Self {
        self.steps.push_back(Step::Fail(kind));
        self
    }
}

impl AsyncRead for ScriptedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.steps.pop_front() {
            None => Poll::Ready(Ok(())),
            Some(Step::Data(bytes)) => {
                let n = bytes.len().min(buf.remaining());
                buf.put_slice(&bytes[..n]);
                if n < bytes.len() {
                    self.steps.push_front(Step::Data(bytes[n..].to_vec()));
                }
                Poll::Ready(Ok(()))
            }
            Some(Step::Fail(kind)) => {
                Poll::Ready(Err(io::Error::new(kind, "scripted read failure")))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Char(char),
    Line(String),
    EndOfStream,
}

/// Text listener that records every callback in order.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Event>>>);

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn chars(&self) -> String {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Char(ch) => Some(ch),
                _ => None,
            })
            .collect()
    }

    pub fn lines(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Line(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    pub fn end_of_stream_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| **e == Event::EndOfStream)
            .count()
    }
}

impl TextListener for Recorder {
    fn on_char(&mut self, ch: char) -> Result<(), ListenerError> {
        self.0.lock().unwrap().push(Event::Char(ch));
        Ok(())
    }

    fn on_line(&mut self, line: &str) -> Result<(), ListenerError> {
        self.0.lock().unwrap().push(Event::Line(line.to_string()));
        Ok(())
    }

    fn on_end_of_stream(&mut self) -> Result<(), ListenerError> {
        self.0.lock().unwrap().push(Event::EndOfStream);
        Ok(())
    }
}

pub fn c(ch: char) -> Event {
    Event::Char(ch)
}

pub fn line(text: &str) -> Event {
    Event::Line(text.to_string())
}
