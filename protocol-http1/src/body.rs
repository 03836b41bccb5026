//! Response body framing.

use bytes::{Buf, BytesMut};

use crate::error::ParseError;

/// Chunk-size lines longer than this are rejected rather than buffered.
const MAX_CHUNK_LINE: usize = 1024;

/// Progress reported by [`BodyDecoder::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// The body is complete. Bytes left in the input belong to whatever
    /// follows on the connection.
    Done,
    /// Feed more input and call again.
    NeedMore,
}

/// Incremental decoder for one response body.
///
/// Created by [`ResponseHead::body_decoder`](crate::ResponseHead::body_decoder).
#[derive(Debug, Clone)]
pub struct BodyDecoder {
    kind: Kind,
}

#[derive(Debug, Clone)]
enum Kind {
    Empty,
    Length { remaining: u64 },
    Chunked(Chunk),
    CloseDelimited,
    Done { reusable: bool },
}

#[derive(Debug, Clone, Copy)]
enum Chunk {
    Size,
    Data { remaining: u64 },
    DataEnd,
    Trailers,
}

impl BodyDecoder {
    pub(crate) fn empty() -> Self {
        Self { kind: Kind::Empty }
    }

    pub(crate) fn length(len: u64) -> Self {
        Self {
            kind: Kind::Length { remaining: len },
        }
    }

    pub(crate) fn chunked() -> Self {
        Self {
            kind: Kind::Chunked(Chunk::Size),
        }
    }

    pub(crate) fn close_delimited() -> Self {
        Self {
            kind: Kind::CloseDelimited,
        }
    }

    /// True when the response carries no body at all.
    pub fn is_empty(&self) -> bool {
        matches!(self.kind, Kind::Empty)
    }

    /// True for chunked transfer encoding.
    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    /// True once the body has been fully decoded.
    pub fn is_done(&self) -> bool {
        matches!(self.kind, Kind::Done { .. })
    }

    /// Whether the connection can carry another exchange after this body.
    /// Close-delimited bodies consume the connection.
    pub fn reusable(&self) -> bool {
        match self.kind {
            Kind::CloseDelimited => false,
            Kind::Done { reusable } => reusable,
            _ => true,
        }
    }

    /// Move decoded body bytes from `input` to `output`.
    ///
    /// Consumed framing bytes are removed from `input`. On [`Decoded::Done`]
    /// any remaining input was not part of this body.
    pub fn decode(
        &mut self,
        input: &mut BytesMut,
        output: &mut BytesMut,
    ) -> Result<Decoded, ParseError> {
        match &mut self.kind {
            Kind::Empty => {
                self.kind = Kind::Done { reusable: true };
                Ok(Decoded::Done)
            }
            Kind::Done { .. } => Ok(Decoded::Done),
            Kind::CloseDelimited => {
                output.extend_from_slice(&input.split());
                Ok(Decoded::NeedMore)
            }
            Kind::Length { remaining } => {
                let take = clamp(*remaining, input.len());
                output.extend_from_slice(&input.split_to(take));
                *remaining -= take as u64;
                if *remaining == 0 {
                    self.kind = Kind::Done { reusable: true };
                    Ok(Decoded::Done)
                } else {
                    Ok(Decoded::NeedMore)
                }
            }
            Kind::Chunked(state) => {
                let done = decode_chunked(state, input, output)?;
                if done {
                    self.kind = Kind::Done { reusable: true };
                    Ok(Decoded::Done)
                } else {
                    Ok(Decoded::NeedMore)
                }
            }
        }
    }

    /// Signal that the peer closed the connection.
    ///
    /// Completes a close-delimited body; any other unfinished body is
    /// [`ParseError::UnexpectedEof`].
    pub fn finish_on_eof(&mut self) -> Result<(), ParseError> {
        match self.kind {
            Kind::CloseDelimited => {
                self.kind = Kind::Done { reusable: false };
                Ok(())
            }
            Kind::Empty | Kind::Done { .. } => Ok(()),
            Kind::Length { .. } | Kind::Chunked(_) => Err(ParseError::UnexpectedEof),
        }
    }
}

fn clamp(remaining: u64, available: usize) -> usize {
    usize::try_from(remaining).map_or(available, |r| r.min(available))
}

/// Run the chunked state machine as far as the buffered input allows.
/// Returns true once the terminating chunk and trailers are consumed.
fn decode_chunked(
    state: &mut Chunk,
    input: &mut BytesMut,
    output: &mut BytesMut,
) -> Result<bool, ParseError> {
    loop {
        match *state {
            Chunk::Size => {
                let Some(crlf) = find_crlf(input) else {
                    if input.len() > MAX_CHUNK_LINE {
                        return Err(ParseError::InvalidChunk("size line too long".into()));
                    }
                    return Ok(false);
                };
                let size = parse_chunk_size(&input[..crlf])?;
                input.advance(crlf + 2);
                *state = if size == 0 {
                    Chunk::Trailers
                } else {
                    Chunk::Data { remaining: size }
                };
            }
            Chunk::Data { remaining } => {
                if input.is_empty() {
                    return Ok(false);
                }
                let take = clamp(remaining, input.len());
                output.extend_from_slice(&input.split_to(take));
                let left = remaining - take as u64;
                *state = if left == 0 {
                    Chunk::DataEnd
                } else {
                    Chunk::Data { remaining: left }
                };
            }
            Chunk::DataEnd => {
                if input.len() < 2 {
                    return Ok(false);
                }
                if &input[..2] != b"\r\n" {
                    return Err(ParseError::InvalidChunk("missing CRLF after data".into()));
                }
                input.advance(2);
                *state = Chunk::Size;
            }
            Chunk::Trailers => {
                let Some(crlf) = find_crlf(input) else {
                    if input.len() > MAX_CHUNK_LINE {
                        return Err(ParseError::InvalidChunk("trailer line too long".into()));
                    }
                    return Ok(false);
                };
                input.advance(crlf + 2);
                if crlf == 0 {
                    return Ok(true);
                }
                // Trailer fields are dropped.
            }
        }
    }
}

fn parse_chunk_size(line: &[u8]) -> Result<u64, ParseError> {
    let invalid = || ParseError::InvalidChunk(String::from_utf8_lossy(line).into_owned());

    let text = std::str::from_utf8(line).map_err(|_| invalid())?;
    // Strip chunk extensions (;key=value).
    let size_hex = text.split(';').next().unwrap_or("").trim();
    if size_hex.is_empty() {
        return Err(invalid());
    }
    u64::from_str_radix(size_hex, 16).map_err(|_| invalid())
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}
