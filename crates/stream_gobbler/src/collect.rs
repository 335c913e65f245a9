use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{sync::watch, time};

use crate::{ByteListener, ListenerError, TextListener};

/// One-shot flag set when a channel reaches end-of-stream.
///
/// Clones share the same flag. Everything written before [`CompletionSignal::fire`] is visible
/// to a task that observed the signal.
#[derive(Clone)]
pub struct CompletionSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSignal")
            .field("fired", &self.is_fired())
            .finish()
    }
}

impl CompletionSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Sets the flag. Returns `false` if it had already fired.
    pub fn fire(&self) -> bool {
        self.tx.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        })
    }

    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    /// Waits up to `timeout` for the flag. Returns whether it fired in time.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let mut rx = self.tx.subscribe();
        let fired = matches!(
            time::timeout(timeout, rx.wait_for(|fired| *fired)).await,
            Ok(Ok(_))
        );
        fired
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Line listener that keeps every line it receives.
///
/// Cheap to clone: register one clone with a drain and keep another to read the result.
#[derive(Clone, Default)]
pub struct TextOutputCollector {
    lines: Arc<Mutex<Vec<String>>>,
    done: CompletionSignal,
}

impl fmt::Debug for TextOutputCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextOutputCollector")
            .field("lines", &lock(&self.lines).len())
            .field("done", &self.done.is_fired())
            .finish()
    }
}

impl TextOutputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines collected so far, in arrival order.
    pub fn text_output(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    pub fn is_complete(&self) -> bool {
        self.done.is_fired()
    }

    pub fn completion(&self) -> &CompletionSignal {
        &self.done
    }

    /// Waits up to `timeout` for end-of-stream. Returns whether collection finished.
    pub async fn await_output_collection(&self, timeout: Duration) -> bool {
        self.done.wait(timeout).await
    }
}

impl TextListener for TextOutputCollector {
    fn on_line(&mut self, line: &str) -> Result<(), ListenerError> {
        lock(&self.lines).push(line.to_string());
        Ok(())
    }

    fn on_end_of_stream(&mut self) -> Result<(), ListenerError> {
        self.done.fire();
        Ok(())
    }
}

/// Byte listener that accumulates the whole channel.
#[derive(Clone, Default)]
pub struct BinaryOutputCollector {
    bytes: Arc<Mutex<Vec<u8>>>,
    done: CompletionSignal,
}

impl fmt::Debug for BinaryOutputCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryOutputCollector")
            .field("bytes", &lock(&self.bytes).len())
            .field("done", &self.done.is_fired())
            .finish()
    }
}

impl BinaryOutputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binary_output(&self) -> Vec<u8> {
        lock(&self.bytes).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.bytes).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_complete(&self) -> bool {
        self.done.is_fired()
    }

    pub fn completion(&self) -> &CompletionSignal {
        &self.done
    }

    pub async fn await_output_collection(&self, timeout: Duration) -> bool {
        self.done.wait(timeout).await
    }
}

impl ByteListener for BinaryOutputCollector {
    fn on_bytes(&mut self, bytes: &[u8]) -> Result<(), ListenerError> {
        lock(&self.bytes).extend_from_slice(bytes);
        Ok(())
    }

    fn on_end_of_stream(&mut self) -> Result<(), ListenerError> {
        self.done.fire();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signal_fires_once_and_times_out_when_unset() {
        let signal = CompletionSignal::new();
        assert!(!signal.wait(Duration::from_millis(20)).await);

        assert!(signal.fire());
        assert!(!signal.fire());
        assert!(signal.wait(Duration::from_millis(20)).await);
        assert!(signal.clone().is_fired());
    }

    #[tokio::test]
    async fn waiter_is_released_when_another_task_fires() {
        let signal = CompletionSignal::new();
        let remote = signal.clone();
        let waiter = tokio::spawn(async move { remote.wait(Duration::from_secs(5)).await });
        tokio::task::yield_now().await;
        signal.fire();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn text_collector_publishes_lines_on_end_of_stream() {
        let collector = TextOutputCollector::new();
        let mut registered = collector.clone();
        registered.on_line("hello").unwrap();
        registered.on_line("world").unwrap();
        assert!(!collector.is_complete());

        registered.on_end_of_stream().unwrap();
        assert!(
            collector
                .await_output_collection(Duration::from_millis(50))
                .await
        );
        assert_eq!(collector.text_output(), vec!["hello", "world"]);
        assert!(collector.completion().is_fired());
    }

    #[tokio::test]
    async fn binary_collector_copies_each_chunk() {
        let collector = BinaryOutputCollector::new();
        let mut registered = collector.clone();
        let mut buffer = [1u8, 2, 3];
        registered.on_bytes(&buffer).unwrap();
        buffer.copy_from_slice(&[9, 9, 9]);
        registered.on_bytes(&buffer[..1]).unwrap();
        registered.on_end_of_stream().unwrap();

        assert!(
            collector
                .await_output_collection(Duration::from_millis(10))
                .await
        );
        assert_eq!(collector.binary_output(), vec![1, 2, 3, 9]);
        assert_eq!(collector.len(), 4);
    }
}
