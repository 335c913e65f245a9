use crate::ListenerError;

/// Receives decoded output of one channel.
///
/// Every method has a no-op default, so a listener only interested in whole lines implements
/// [`TextListener::on_line`] and nothing else. Callbacks run synchronously on the worker draining
/// the channel; a slow listener slows that channel only. Returning an error aborts the channel:
/// later listeners do not see the failing event and no end-of-stream is dispatched.
pub trait TextListener: Send {
    /// Called for every decoded character, line terminators included.
    fn on_char(&mut self, _ch: char) -> Result<(), ListenerError> {
        Ok(())
    }

    /// Called for every complete line, with the LF or CRLF terminator stripped.
    fn on_line(&mut self, _line: &str) -> Result<(), ListenerError> {
        Ok(())
    }

    /// Called exactly once after the last character and line of a cleanly drained channel.
    fn on_end_of_stream(&mut self) -> Result<(), ListenerError> {
        Ok(())
    }
}

/// Receives raw chunks of one channel without any decoding.
pub trait ByteListener: Send {
    /// `bytes` borrows the worker's read buffer and is only valid for this call; copy what you
    /// need to keep.
    fn on_bytes(&mut self, bytes: &[u8]) -> Result<(), ListenerError>;

    fn on_end_of_stream(&mut self) -> Result<(), ListenerError> {
        Ok(())
    }
}

impl<T: TextListener + ?Sized> TextListener for Box<T> {
    fn on_char(&mut self, ch: char) -> Result<(), ListenerError> {
        (**self).on_char(ch)
    }

    fn on_line(&mut self, line: &str) -> Result<(), ListenerError> {
        (**self).on_line(line)
    }

    fn on_end_of_stream(&mut self) -> Result<(), ListenerError> {
        (**self).on_end_of_stream()
    }
}

impl<T: ByteListener + ?Sized> ByteListener for Box<T> {
    fn on_bytes(&mut self, bytes: &[u8]) -> Result<(), ListenerError> {
        (**self).on_bytes(bytes)
    }

    fn on_end_of_stream(&mut self) -> Result<(), ListenerError> {
        (**self).on_end_of_stream()
    }
}

/// Insertion-ordered text listeners of one channel.
#[derive(Default)]
pub struct TextListeners(Vec<Box<dyn TextListener>>);

impl TextListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, listener: impl TextListener + 'static) {
        self.0.push(Box::new(listener));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn char(&mut self, ch: char) -> Result<(), ListenerError> {
        self.0.iter_mut().try_for_each(|l| l.on_char(ch))
    }

    pub(crate) fn line(&mut self, line: &str) -> Result<(), ListenerError> {
        self.0.iter_mut().try_for_each(|l| l.on_line(line))
    }

    pub(crate) fn end_of_stream(&mut self) -> Result<(), ListenerError> {
        self.0.iter_mut().try_for_each(|l| l.on_end_of_stream())
    }
}

/// Insertion-ordered byte listeners of one channel.
#[derive(Default)]
pub struct ByteListeners(Vec<Box<dyn ByteListener>>);

impl ByteListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, listener: impl ByteListener + 'static) {
        self.0.push(Box::new(listener));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn bytes(&mut self, bytes: &[u8]) -> Result<(), ListenerError> {
        self.0.iter_mut().try_for_each(|l| l.on_bytes(bytes))
    }

    pub(crate) fn end_of_stream(&mut self) -> Result<(), ListenerError> {
        self.0.iter_mut().try_for_each(|l| l.on_end_of_stream())
    }
}

pub struct LineFn<F>(F);
pub struct CharFn<F>(F);
pub struct BytesFn<F>(F);

/// Wraps a closure as a line-only [`TextListener`].
pub fn line_listener<F>(f: F) -> LineFn<F>
where
    F: FnMut(&str) -> Result<(), ListenerError> + Send,
{
    LineFn(f)
}

/// Wraps a closure as a character-only [`TextListener`].
pub fn char_listener<F>(f: F) -> CharFn<F>
where
    F: FnMut(char) -> Result<(), ListenerError> + Send,
{
    CharFn(f)
}

/// Wraps a closure as a [`ByteListener`].
pub fn byte_listener<F>(f: F) -> BytesFn<F>
where
    F: FnMut(&[u8]) -> Result<(), ListenerError> + Send,
{
    BytesFn(f)
}

impl<F> TextListener for LineFn<F>
where
    F: FnMut(&str) -> Result<(), ListenerError> + Send,
{
    fn on_line(&mut self, line: &str) -> Result<(), ListenerError> {
        (self.0)(line)
    }
}

impl<F> TextListener for CharFn<F>
where
    F: FnMut(char) -> Result<(), ListenerError> + Send,
{
    fn on_char(&mut self, ch: char) -> Result<(), ListenerError> {
        (self.0)(ch)
    }
}

impl<F> ByteListener for BytesFn<F>
where
    F: FnMut(&[u8]) -> Result<(), ListenerError> + Send,
{
    fn on_bytes(&mut self, bytes: &[u8]) -> Result<(), ListenerError> {
        (self.0)(bytes)
    }
}
