use crate::{DecodeError, ResiduePolicy, TextEncoding};

/// Decodes a byte stream chunk by chunk.
///
/// A character whose encoded bytes straddle two chunks is held back as residue and completed
/// by the next call, so callers never observe half a character. The residue is always shorter
/// than [`TextEncoding::max_char_width`].
#[derive(Debug, Clone)]
pub struct IncrementalDecoder {
    encoding: TextEncoding,
    residue: Vec<u8>,
    // Stream offset of the first byte not yet decoded (the start of the residue).
    offset: u64,
}

impl IncrementalDecoder {
    pub fn new(encoding: TextEncoding) -> Self {
        Self {
            encoding,
            residue: Vec::with_capacity(encoding.max_char_width()),
            offset: 0,
        }
    }

    pub fn residue(&self) -> &[u8] {
        &self.residue
    }

    /// Appends every character decodable from `residue + chunk` to `out`.
    ///
    /// On malformed input the characters preceding the bad sequence are still appended before
    /// the error is returned.
    pub fn decode(&mut self, chunk: &[u8], out: &mut String) -> Result<(), DecodeError> {
        if self.residue.is_empty() {
            self.decode_joined(chunk, out)
        } else {
            let mut joined = std::mem::take(&mut self.residue);
            joined.extend_from_slice(chunk);
            self.decode_joined(&joined, out)
        }
    }

    /// Settles any residue left at end-of-stream and returns how many bytes were dropped.
    pub fn finish(&mut self, policy: ResiduePolicy) -> Result<usize, DecodeError> {
        let pending = self.residue.len();
        if pending == 0 {
            return Ok(0);
        }
        self.residue.clear();
        self.offset += pending as u64;
        match policy {
            ResiduePolicy::Fail => Err(DecodeError::TruncatedSequence {
                encoding: self.encoding,
                pending,
            }),
            ResiduePolicy::Discard => Ok(pending),
        }
    }

    fn decode_joined(&mut self, bytes: &[u8], out: &mut String) -> Result<(), DecodeError> {
        let decoded = match self.encoding {
            TextEncoding::Utf8 => decode_utf8(bytes, out),
            TextEncoding::Utf16Le => decode_utf16(bytes, out, u16::from_le_bytes),
            TextEncoding::Utf16Be => decode_utf16(bytes, out, u16::from_be_bytes),
            TextEncoding::Latin1 => {
                out.extend(bytes.iter().map(|&b| char::from(b)));
                Ok(bytes.len())
            }
            TextEncoding::Ascii => decode_ascii(bytes, out),
        };

        match decoded {
            Ok(consumed) => {
                self.offset += consumed as u64;
                self.residue.clear();
                self.residue.extend_from_slice(&bytes[consumed..]);
                Ok(())
            }
            Err(bad_at) => Err(DecodeError::Malformed {
                encoding: self.encoding,
                offset: self.offset + bad_at as u64,
            }),
        }
    }
}

// Each helper returns Ok(bytes consumed) or Err(offset of the first malformed byte).

fn decode_utf8(bytes: &[u8], out: &mut String) -> Result<usize, usize> {
    match std::str::from_utf8(bytes) {
        Ok(text) => {
            out.push_str(text);
            Ok(bytes.len())
        }
        Err(err) => {
            let valid = err.valid_up_to();
            if let Ok(prefix) = std::str::from_utf8(&bytes[..valid]) {
                out.push_str(prefix);
            }
            match err.error_len() {
                Some(_) => Err(valid),
                // Incomplete sequence at the end of the input: keep it as residue.
                None => Ok(valid),
            }
        }
    }
}

fn decode_utf16(
    bytes: &[u8],
    out: &mut String,
    unit_from: fn([u8; 2]) -> u16,
) -> Result<usize, usize> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit_from([pair[0], pair[1]]))
        .collect();

    let mut complete = units.len();
    if matches!(units.last(), Some(unit) if (0xD800..=0xDBFF).contains(unit)) {
        complete -= 1;
    }

    let mut position = 0usize;
    for decoded in char::decode_utf16(units[..complete].iter().copied()) {
        match decoded {
            Ok(ch) => {
                out.push(ch);
                position += ch.len_utf16();
            }
            Err(_) => return Err(position * 2),
        }
    }
    Ok(complete * 2)
}

fn decode_ascii(bytes: &[u8], out: &mut String) -> Result<usize, usize> {
    let valid = bytes
        .iter()
        .position(|b| !b.is_ascii())
        .unwrap_or(bytes.len());
    out.extend(bytes[..valid].iter().map(|&b| char::from(b)));
    if valid < bytes.len() {
        Err(valid)
    } else {
        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(decoder: &mut IncrementalDecoder, chunks: &[&[u8]]) -> String {
        let mut out = String::new();
        for chunk in chunks {
            decoder.decode(chunk, &mut out).expect("decode");
        }
        out
    }

    #[test]
    fn utf8_codepoint_split_across_chunks_is_reassembled() {
        let bytes = "あ".as_bytes();
        let mut decoder = IncrementalDecoder::new(TextEncoding::Utf8);

        let mut out = String::new();
        decoder.decode(&bytes[..1], &mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(decoder.residue(), &bytes[..1]);

        decoder.decode(&bytes[1..], &mut out).unwrap();
        assert_eq!(out, "あ");
        assert!(decoder.residue().is_empty());
    }

    #[test]
    fn utf8_four_byte_codepoint_fed_one_byte_at_a_time() {
        let bytes = "x🦀y".as_bytes();
        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        let mut decoder = IncrementalDecoder::new(TextEncoding::Utf8);
        assert_eq!(decode_all(&mut decoder, &chunks), "x🦀y");
    }

    #[test]
    fn malformed_utf8_reports_stream_offset_and_keeps_prefix() {
        let mut decoder = IncrementalDecoder::new(TextEncoding::Utf8);
        let mut out = String::new();
        decoder.decode(b"abc", &mut out).unwrap();

        let err = decoder.decode(b"de\xFFf", &mut out).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Malformed {
                encoding: TextEncoding::Utf8,
                offset: 5,
            }
        );
        assert_eq!(out, "abcde");
    }

    #[test]
    fn utf16le_surrogate_pair_split_mid_pair() {
        let text = "a😀";
        let bytes: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
        assert_eq!(bytes.len(), 6);

        let mut decoder = IncrementalDecoder::new(TextEncoding::Utf16Le);
        let mut out = String::new();
        decoder.decode(&bytes[..3], &mut out).unwrap();
        assert_eq!(out, "a");
        assert_eq!(decoder.residue().len(), 1);

        decoder.decode(&bytes[3..5], &mut out).unwrap();
        assert_eq!(out, "a");
        assert_eq!(decoder.residue().len(), 3);

        decoder.decode(&bytes[5..], &mut out).unwrap();
        assert_eq!(out, text);
        assert!(decoder.residue().is_empty());
    }

    #[test]
    fn utf16be_decodes_plain_text() {
        let bytes: Vec<u8> = "hi\n".encode_utf16().flat_map(u16::to_be_bytes).collect();
        let mut decoder = IncrementalDecoder::new(TextEncoding::Utf16Be);
        assert_eq!(decode_all(&mut decoder, &[&bytes]), "hi\n");
    }

    #[test]
    fn unpaired_low_surrogate_is_malformed() {
        let bytes = [b'a', 0, 0x00, 0xDC];
        let mut decoder = IncrementalDecoder::new(TextEncoding::Utf16Le);
        let mut out = String::new();
        let err = decoder.decode(&bytes, &mut out).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Malformed {
                encoding: TextEncoding::Utf16Le,
                offset: 2,
            }
        );
        assert_eq!(out, "a");
    }

    #[test]
    fn latin1_maps_every_byte() {
        let mut decoder = IncrementalDecoder::new(TextEncoding::Latin1);
        assert_eq!(decode_all(&mut decoder, &[b"caf\xE9"]), "café");
    }

    #[test]
    fn ascii_rejects_high_bytes() {
        let mut decoder = IncrementalDecoder::new(TextEncoding::Ascii);
        let mut out = String::new();
        assert!(decoder.decode(b"ok\x80", &mut out).is_err());
        assert_eq!(out, "ok");
    }

    #[test]
    fn finish_applies_residue_policy() {
        let mut strict = IncrementalDecoder::new(TextEncoding::Utf8);
        let mut out = String::new();
        strict.decode(&"é".as_bytes()[..1], &mut out).unwrap();
        assert_eq!(
            strict.finish(ResiduePolicy::Fail),
            Err(DecodeError::TruncatedSequence {
                encoding: TextEncoding::Utf8,
                pending: 1,
            })
        );

        let mut lenient = IncrementalDecoder::new(TextEncoding::Utf8);
        lenient.decode(&"é".as_bytes()[..1], &mut out).unwrap();
        assert_eq!(lenient.finish(ResiduePolicy::Discard), Ok(1));
        assert!(lenient.residue().is_empty());

        let mut clean = IncrementalDecoder::new(TextEncoding::Utf8);
        assert_eq!(clean.finish(ResiduePolicy::Fail), Ok(0));
    }
}
