use tokio::io::AsyncRead;
use tracing::warn;

use crate::{
    BinaryDrain, Channel, ChunkReader, DecodeError, DrainStrategy, GobbleError, IncrementalDecoder,
    LineTokenizer, ListenerError, TextDrain,
};

/// Counters for a channel that drained to end-of-stream.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct DrainSummary {
    pub channel: Channel,
    pub bytes: u64,
    pub chunks: u64,
    pub chars: u64,
    pub lines: u64,
}

impl DrainSummary {
    fn from_reader<R: AsyncRead + Unpin>(channel: Channel, reader: &ChunkReader<R>) -> Self {
        Self {
            channel,
            bytes: reader.bytes_read(),
            chunks: reader.chunks_read(),
            chars: 0,
            lines: 0,
        }
    }
}

/// Drains `reader` to end-of-stream according to `strategy`.
///
/// This is the body of one channel worker; it runs strictly sequentially and calls listeners
/// inline. [`crate::DrainPlan::start`] runs it on a dedicated blocking thread. On any error the
/// drain stops immediately and no end-of-stream event is dispatched.
pub async fn gobble<R>(
    channel: Channel,
    reader: R,
    strategy: DrainStrategy,
) -> Result<DrainSummary, GobbleError>
where
    R: AsyncRead + Unpin,
{
    match strategy {
        DrainStrategy::Discard { buffer_size } => discard(channel, reader, buffer_size).await,
        DrainStrategy::Binary(drain) => pump_bytes(channel, reader, drain).await,
        DrainStrategy::Text(drain) => gobble_text(channel, reader, drain).await,
    }
}

/// Reads and drops everything so the producer never blocks on a full pipe.
pub async fn discard<R>(
    channel: Channel,
    reader: R,
    buffer_size: usize,
) -> Result<DrainSummary, GobbleError>
where
    R: AsyncRead + Unpin,
{
    let mut source = ChunkReader::new(reader, buffer_size);
    while source
        .next_chunk()
        .await
        .map_err(|source| GobbleError::Read { channel, source })?
        .is_some()
    {}
    Ok(DrainSummary::from_reader(channel, &source))
}

/// Forwards every chunk to the byte listeners, then signals end-of-stream once.
pub async fn pump_bytes<R>(
    channel: Channel,
    reader: R,
    drain: BinaryDrain,
) -> Result<DrainSummary, GobbleError>
where
    R: AsyncRead + Unpin,
{
    let BinaryDrain {
        buffer_size,
        mut listeners,
    } = drain;
    let listener_err = |source: ListenerError| GobbleError::Listener { channel, source };

    let mut source = ChunkReader::new(reader, buffer_size);
    while let Some(chunk) = source
        .next_chunk()
        .await
        .map_err(|source| GobbleError::Read { channel, source })?
    {
        if !listeners.is_empty() {
            listeners.bytes(chunk).map_err(listener_err)?;
        }
    }
    listeners.end_of_stream().map_err(listener_err)?;

    Ok(DrainSummary::from_reader(channel, &source))
}

/// Decodes the channel and feeds the line tokenizer.
pub async fn gobble_text<R>(
    channel: Channel,
    reader: R,
    drain: TextDrain,
) -> Result<DrainSummary, GobbleError>
where
    R: AsyncRead + Unpin,
{
    let TextDrain {
        buffer_size,
        encoding,
        trailing_residue,
        mut listeners,
    } = drain;
    let listener_err = |source: ListenerError| GobbleError::Listener { channel, source };
    let decode_err = |source: DecodeError| GobbleError::Decode { channel, source };

    let mut source = ChunkReader::new(reader, buffer_size);
    let mut decoder = IncrementalDecoder::new(encoding);
    let mut tokenizer = LineTokenizer::new();
    let mut text = String::with_capacity(buffer_size);

    while let Some(chunk) = source
        .next_chunk()
        .await
        .map_err(|source| GobbleError::Read { channel, source })?
    {
        text.clear();
        let decoded = decoder.decode(chunk, &mut text);
        if !text.is_empty() {
            tokenizer.feed(&text, &mut listeners).map_err(listener_err)?;
        }
        decoded.map_err(decode_err)?;
    }

    let dropped = decoder.finish(trailing_residue).map_err(decode_err)?;
    if dropped > 0 {
        warn!(%channel, %encoding, dropped, "discarding incomplete character at end of stream");
    }
    tokenizer.finish(&mut listeners).map_err(listener_err)?;

    Ok(DrainSummary {
        chars: tokenizer.chars_seen(),
        lines: tokenizer.lines_emitted(),
        ..DrainSummary::from_reader(channel, &source)
    })
}
