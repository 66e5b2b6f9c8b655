//! Line codec for tokio.
//!
//! Frames the stream on `\n`, strips the line terminator, and decodes with
//! the configured character encoding. With the `encoding` feature off, only
//! UTF-8 is available and invalid bytes are replaced rather than rejected,
//! so a single badly encoded line never takes the connection down. Lines
//! longer than the limit are skipped up to the next newline.

use std::cmp;
#[cfg(feature = "encoding")]
use std::io;

use bytes::{Buf, BytesMut};
#[cfg(feature = "encoding")]
use encoding::Encoding;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::{self, ProtocolError};
use crate::message::Message;

use crate::util::MAX_IRC_LINE_LEN;

pub struct IrcCodec {
    #[cfg(feature = "encoding")]
    encoding: &'static Encoding,
    /// Index of the next byte to scan for a newline.
    next_index: usize,
    max_len: usize,
    /// Skipping the rest of an over-long line.
    discarding: bool,
}

impl IrcCodec {
    /// Create a codec for the given encoding label, such as `utf-8` or
    /// `latin1`.
    pub fn new(_label: &str) -> error::Result<Self> {
        Ok(IrcCodec {
            #[cfg(feature = "encoding")]
            encoding: match Encoding::for_label(_label.as_bytes()) {
                Some(enc) => enc,
                None => {
                    return Err(ProtocolError::Io(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("unknown encoding: {}", _label),
                    )));
                }
            },
            next_index: 0,
            max_len: MAX_IRC_LINE_LEN,
            discarding: false,
        })
    }

    /// Limit on a line's length, excluding the newline.
    pub fn with_max_len(label: &str, max_len: usize) -> error::Result<Self> {
        let mut codec = Self::new(label)?;
        codec.max_len = max_len;
        Ok(codec)
    }

    fn finish_line(&self, line: &[u8]) -> String {
        self.decode_bytes(line)
            .trim_end_matches(['\r', '\n'])
            .to_string()
    }

    fn decode_bytes(&self, line: &[u8]) -> String {
        #[cfg(feature = "encoding")]
        {
            let (text, _, _) = self.encoding.decode(line);
            text.into_owned()
        }

        #[cfg(not(feature = "encoding"))]
        {
            String::from_utf8_lossy(line).into_owned()
        }
    }
}

impl Decoder for IrcCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        loop {
            let read_to = cmp::min(self.max_len.saturating_add(1), src.len());
            let newline = src[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n');

            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    src.advance(self.next_index + offset + 1);
                    self.next_index = 0;
                    self.discarding = false;
                }
                (true, None) => {
                    src.advance(read_to);
                    self.next_index = 0;
                    if src.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let line = src.split_to(self.next_index + offset + 1);
                    self.next_index = 0;
                    return Ok(Some(self.finish_line(&line)));
                }
                (false, None) if src.len() > self.max_len => {
                    warn!(max_len = self.max_len, "inbound line too long, discarding");
                    self.discarding = true;
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if src.is_empty() || self.discarding {
            src.clear();
            return Ok(None);
        }
        let line = src.split_to(src.len());
        let text = self.finish_line(&line);
        Ok((!text.is_empty()).then_some(text))
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> error::Result<()> {
        let mut line = msg.to_line();
        line.retain(|c| c != '\r' && c != '\n');
        line.push_str("\r\n");

        #[cfg(feature = "encoding")]
        {
            let (bytes, _, _) = self.encoding.encode(&line);
            dst.extend_from_slice(&bytes);
        }

        #[cfg(not(feature = "encoding"))]
        {
            dst.extend_from_slice(line.as_bytes());
        }

        Ok(())
    }
}
