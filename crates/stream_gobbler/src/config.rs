use std::time::Duration;

use serde::Deserialize;

use crate::{
    BinaryOutputCollector, ByteListener, ByteListeners, TextEncoding, TextListener,
    TextListeners, TextOutputCollector,
};

pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// What to do with an incomplete character left undecoded when a channel closes.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResiduePolicy {
    /// Abort the channel with [`crate::DecodeError::TruncatedSequence`].
    #[default]
    Fail,
    /// Drop the bytes and complete the channel normally.
    Discard,
}

/// Tunables for a drain, loadable from a host application's config file.
///
/// ```toml
/// buffer_size = 4096
/// encoding = "utf-16le"
/// trailing_residue = "discard"
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DrainSettings {
    pub buffer_size: usize,
    pub encoding: TextEncoding,
    pub trailing_residue: ResiduePolicy,
}

impl Default for DrainSettings {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            encoding: TextEncoding::Utf8,
            trailing_residue: ResiduePolicy::Fail,
        }
    }
}

/// How one output channel is consumed. Every strategy reads the channel to end-of-stream.
pub enum DrainStrategy {
    Discard { buffer_size: usize },
    Binary(BinaryDrain),
    Text(TextDrain),
}

impl Default for DrainStrategy {
    fn default() -> Self {
        Self::discard()
    }
}

impl DrainStrategy {
    /// Consume and drop everything.
    pub fn discard() -> Self {
        Self::Discard {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn discard_with(settings: &DrainSettings) -> Self {
        Self::Discard {
            buffer_size: settings.buffer_size.max(1),
        }
    }

    pub fn text() -> TextDrain {
        TextDrain::default()
    }

    pub fn binary() -> BinaryDrain {
        BinaryDrain::default()
    }

    pub fn buffer_size(&self) -> usize {
        match self {
            DrainStrategy::Discard { buffer_size } => *buffer_size,
            DrainStrategy::Binary(drain) => drain.buffer_size,
            DrainStrategy::Text(drain) => drain.buffer_size,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            DrainStrategy::Discard { .. } => "discard",
            DrainStrategy::Binary(_) => "binary",
            DrainStrategy::Text(_) => "text",
        }
    }

    /// Attaches a collector matching the strategy. A discard strategy becomes UTF-8 text.
    pub fn with_collector(self) -> (Self, Collected) {
        match self {
            DrainStrategy::Binary(drain) => {
                let collector = BinaryOutputCollector::new();
                let drain = drain.listener(collector.clone());
                (drain.into(), Collected::Binary(collector))
            }
            DrainStrategy::Text(drain) => {
                let collector = TextOutputCollector::new();
                let drain = drain.listener(collector.clone());
                (drain.into(), Collected::Text(collector))
            }
            DrainStrategy::Discard { buffer_size } => {
                let collector = TextOutputCollector::new();
                let drain = TextDrain::default()
                    .buffer_size(buffer_size)
                    .listener(collector.clone());
                (drain.into(), Collected::Text(collector))
            }
        }
    }
}

/// Collector attached by [`DrainStrategy::with_collector`].
#[derive(Debug, Clone)]
pub enum Collected {
    Text(TextOutputCollector),
    Binary(BinaryOutputCollector),
}

impl Collected {
    pub fn is_complete(&self) -> bool {
        match self {
            Collected::Text(collector) => collector.is_complete(),
            Collected::Binary(collector) => collector.is_complete(),
        }
    }

    pub async fn await_output_collection(&self, timeout: Duration) -> bool {
        match self {
            Collected::Text(collector) => collector.await_output_collection(timeout).await,
            Collected::Binary(collector) => collector.await_output_collection(timeout).await,
        }
    }
}

/// Decode the channel and report characters and lines.
pub struct TextDrain {
    pub(crate) buffer_size: usize,
    pub(crate) encoding: TextEncoding,
    pub(crate) trailing_residue: ResiduePolicy,
    pub(crate) listeners: TextListeners,
}

impl Default for TextDrain {
    fn default() -> Self {
        Self::from_settings(&DrainSettings::default())
    }
}

impl TextDrain {
    pub fn from_settings(settings: &DrainSettings) -> Self {
        Self {
            buffer_size: settings.buffer_size.max(1),
            encoding: settings.encoding,
            trailing_residue: settings.trailing_residue,
            listeners: TextListeners::new(),
        }
    }

    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Read buffer size in bytes; zero is treated as one.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub fn trailing_residue(mut self, policy: ResiduePolicy) -> Self {
        self.trailing_residue = policy;
        self
    }

    /// Registers a listener; listeners are notified in registration order.
    pub fn listener(mut self, listener: impl TextListener + 'static) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// Forward raw chunks without decoding.
pub struct BinaryDrain {
    pub(crate) buffer_size: usize,
    pub(crate) listeners: ByteListeners,
}

impl Default for BinaryDrain {
    fn default() -> Self {
        Self::from_settings(&DrainSettings::default())
    }
}

impl BinaryDrain {
    pub fn from_settings(settings: &DrainSettings) -> Self {
        Self {
            buffer_size: settings.buffer_size.max(1),
            listeners: ByteListeners::new(),
        }
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub fn listener(mut self, listener: impl ByteListener + 'static) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl From<TextDrain> for DrainStrategy {
    fn from(drain: TextDrain) -> Self {
        DrainStrategy::Text(drain)
    }
}

impl From<BinaryDrain> for DrainStrategy {
    fn from(drain: BinaryDrain) -> Self {
        DrainStrategy::Binary(drain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_missing_fields() {
        let settings: DrainSettings = toml::from_str("encoding = \"latin1\"").unwrap();
        assert_eq!(settings.encoding, TextEncoding::Latin1);
        assert_eq!(settings.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(settings.trailing_residue, ResiduePolicy::Fail);
    }

    #[test]
    fn settings_parse_from_json() {
        let settings: DrainSettings = serde_json::from_str(
            r#"{"buffer_size": 16, "encoding": "UTF-16BE", "trailing_residue": "discard"}"#,
        )
        .unwrap();
        let drain = TextDrain::from_settings(&settings);
        assert_eq!(drain.buffer_size, 16);
        assert_eq!(drain.encoding, TextEncoding::Utf16Be);
        assert_eq!(drain.trailing_residue, ResiduePolicy::Discard);
    }

    #[test]
    fn settings_reject_unknown_encoding() {
        assert!(toml::from_str::<DrainSettings>("encoding = \"ebcdic\"").is_err());
    }

    #[test]
    fn zero_buffer_size_is_clamped() {
        let strategy: DrainStrategy = DrainStrategy::binary().buffer_size(0).into();
        assert_eq!(strategy.buffer_size(), 1);
    }

    #[test]
    fn listeners_accumulate_in_builders() {
        let text = DrainStrategy::text()
            .listener(TextOutputCollector::new())
            .listener(TextOutputCollector::new());
        assert_eq!(text.listener_count(), 2);

        let binary = DrainStrategy::binary();
        assert_eq!(binary.listener_count(), 0);
        assert_eq!(binary.listener(BinaryOutputCollector::new()).listener_count(), 1);
    }

    #[test]
    fn discard_is_upgraded_to_text_when_collecting() {
        let (strategy, collected) = DrainStrategy::discard().with_collector();
        assert_eq!(strategy.mode(), "text");
        assert!(matches!(collected, Collected::Text(_)));

        let (strategy, collected) = DrainStrategy::Binary(DrainStrategy::binary()).with_collector();
        assert_eq!(strategy.mode(), "binary");
        assert!(matches!(collected, Collected::Binary(_)));
    }
}
