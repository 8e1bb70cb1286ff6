//! Framing of cue records on a subtitle conduit.
//!
//! [`CueCodec`] is a [`Decoder`] meant to sit inside a
//! [`FramedRead`](tokio_util::codec::FramedRead): records are separated by
//! blank lines, so a record is only decoded once its terminating blank line
//! (or the end of the conduit) has arrived. Partial records stay in the read
//! buffer, which makes polling the framed stream under a timeout lossless.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use fi_core::SubtitleDialect;

use crate::cue::{Cue, TIMING_ARROW};

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// WebVTT blocks that carry no cue.
const NON_CUE_BLOCKS: &[&str] = &["NOTE", "STYLE", "REGION"];

/// Decodes [`Cue`]s of one dialect from a byte stream.
#[derive(Debug, Clone)]
pub struct CueCodec {
    stream_index: u32,
    dialect: SubtitleDialect,
    header_done: bool,
}

impl CueCodec {
    /// A codec for the conduit of probed stream `stream_index`.
    pub fn new(stream_index: u32, dialect: SubtitleDialect) -> Self {
        Self {
            stream_index,
            dialect,
            header_done: false,
        }
    }

    pub fn dialect(&self) -> SubtitleDialect {
        self.dialect
    }

    fn decode_record(&mut self, src: &mut BytesMut, eof: bool) -> fi_core::Result<Option<Cue>> {
        loop {
            skip_blank_lines(src, eof);

            if !self.header_done {
                if let Some(signature) = self.dialect.signature() {
                    let first_line = match line_end(src) {
                        Some(end) => &src[..end],
                        None if eof && !src.is_empty() => &src[..],
                        None => return Ok(None),
                    };
                    let first_line = first_line.strip_prefix(BOM).unwrap_or(first_line);
                    if !contains(first_line, signature.as_bytes()) {
                        return Err(fi_core::Error::malformed_subtitle(
                            self.stream_index,
                            self.dialect,
                            format!(
                                "expected {signature} header, found {:?}",
                                String::from_utf8_lossy(first_line)
                            ),
                        ));
                    }
                    // The header block runs up to the first blank line.
                    if take_block(src, eof).is_none() {
                        return Ok(None);
                    }
                    tracing::trace!(stream = self.stream_index, "subtitle header accepted");
                }
                self.header_done = true;
                continue;
            }

            let Some(block) = take_block(src, eof) else {
                return Ok(None);
            };

            if let Some(cue) = self.parse_block(&block) {
                return Ok(Some(cue));
            }
        }
    }

    /// Parse one blank-line delimited block, or `None` if it is not a cue.
    fn parse_block(&self, block: &[u8]) -> Option<Cue> {
        let text = String::from_utf8_lossy(block);
        let lines: Vec<&str> = text.lines().map(|l| l.trim_end_matches('\r')).collect();

        let Some(timing) = lines.iter().position(|l| l.contains(TIMING_ARROW)) else {
            let first = lines.first().copied().unwrap_or_default();
            if !NON_CUE_BLOCKS.iter().any(|kw| first.starts_with(kw)) {
                tracing::warn!(
                    stream = self.stream_index,
                    dialect = %self.dialect,
                    block = first,
                    "skipping record without timing line"
                );
            }
            return None;
        };

        // Lines before the timing line are cue identifiers or counters.
        let Some((begin, end)) = Cue::parse_timing(lines[timing]) else {
            tracing::warn!(
                stream = self.stream_index,
                dialect = %self.dialect,
                line = lines[timing],
                "skipping record with malformed timing line"
            );
            return None;
        };

        Some(Cue::new(begin, end, lines[timing + 1..].join("\n")))
    }
}

impl Decoder for CueCodec {
    type Item = Cue;
    type Error = fi_core::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Cue>, Self::Error> {
        self.decode_record(src, false)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Cue>, Self::Error> {
        let cue = self.decode_record(src, true)?;
        if cue.is_none() {
            src.clear();
        }
        Ok(cue)
    }
}

/// Index of the first `\n` in `buf`.
fn line_end(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|b| b.is_ascii_whitespace())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Drop leading blank lines; at end of input, a blank remainder too.
fn skip_blank_lines(src: &mut BytesMut, eof: bool) {
    while let Some(end) = line_end(src) {
        if !is_blank(&src[..end]) {
            return;
        }
        src.advance(end + 1);
    }
    if eof && is_blank(src) {
        src.clear();
    }
}

/// Split off the next block, without its terminating blank line.
///
/// Without a blank line the block is only complete at end of input.
fn take_block(src: &mut BytesMut, eof: bool) -> Option<BytesMut> {
    let mut pos = 0;
    while let Some(len) = line_end(&src[pos..]) {
        let end = pos + len;
        if is_blank(&src[pos..end]) {
            let mut block = src.split_to(end + 1);
            block.truncate(pos);
            return Some(block);
        }
        pos = end + 1;
    }

    if eof && !src.is_empty() {
        return Some(src.split());
    }
    None
}
