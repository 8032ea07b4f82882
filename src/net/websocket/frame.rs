//! WebSocket frame exchange.
//!
//! Frame layout (RFC 6455 section 5.2): two prefix bytes carrying
//! `fin | rsv | opcode` and `mask | length-code`, an extended length of 0,
//! 2, or 8 bytes, a 4-byte masking key on masked frames, then the payload.

use crate::net::Stream;
use crate::status::{self, Result};
use std::rc::Rc;

/// Frame type carried in the low nibble of the first prefix byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Continuation of a fragmented message.
    Continuation = 0x0,
    /// UTF-8 text payload.
    Text = 0x1,
    /// Binary payload.
    Binary = 0x2,
    /// Connection close.
    Close = 0x8,
    /// Ping.
    Ping = 0x9,
    /// Pong.
    Pong = 0xA,
}

impl Opcode {
    /// Decodes the opcode nibble.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(Self::Continuation),
            0x1 => Some(Self::Text),
            0x2 => Some(Self::Binary),
            0x8 => Some(Self::Close),
            0x9 => Some(Self::Ping),
            0xA => Some(Self::Pong),
            _ => None,
        }
    }
}

/// XORs the payload with the masking key, byte `i` against `key[i mod 4]`.
/// Masking is an involution, so the same call also unmasks.
pub fn apply_mask(payload: &mut [u8], key: [u8; 4]) {
    for (index, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[index & 3];
    }
}

/// Builds the frame header for an unmasked server frame with `fin` set,
/// using the shortest length encoding. Returns the buffer and its used
/// length.
fn encode_header(opcode: Opcode, payload_len: usize) -> ([u8; 10], usize) {
    let mut header = [0u8; 10];
    header[0] = 0x80 | opcode as u8;
    if payload_len <= 125 {
        header[1] = payload_len as u8;
        (header, 2)
    } else if payload_len <= usize::from(u16::MAX) {
        header[1] = 126;
        header[2..4].copy_from_slice(&(payload_len as u16).to_be_bytes());
        (header, 4)
    } else {
        header[1] = 127;
        header[2..10].copy_from_slice(&(payload_len as u64).to_be_bytes());
        (header, 10)
    }
}

/// A connection speaking WebSocket frames after a completed upgrade.
///
/// The server side of the protocol: received frames must be masked and are
/// unmasked in place; sent frames are final and unmasked.
pub struct WebSocket {
    stream: Rc<Stream>,
}

impl WebSocket {
    /// Wraps an upgraded stream.
    #[must_use]
    pub fn new(stream: Stream) -> Self {
        Self {
            stream: Rc::new(stream),
        }
    }

    pub(crate) fn from_shared(stream: Rc<Stream>) -> Self {
        Self { stream }
    }

    /// Receives one frame into `buffer`, returning its type and the
    /// unmasked payload slice.
    ///
    /// # Errors
    ///
    /// Client errors for reserved bits, unknown opcodes, or unmasked
    /// frames; `exhausted` when the payload exceeds `buffer`; transport
    /// errors pass through.
    pub async fn recv<'a>(&self, buffer: &'a mut [u8]) -> Result<(Opcode, &'a [u8])> {
        let mut prefix = [0u8; 2];
        self.stream.read_exact(&mut prefix).await?;

        if prefix[0] & 0x70 != 0 {
            return Err(status::client_error("reserved frame bits are set"));
        }
        let opcode = Opcode::from_u8(prefix[0] & 0x0F)
            .ok_or_else(|| status::client_error("unknown frame opcode"))?;
        if prefix[1] & 0x80 == 0 {
            return Err(status::client_error("client frame is not masked"));
        }

        let payload_len = match prefix[1] & 0x7F {
            126 => {
                let mut extended = [0u8; 2];
                self.stream.read_exact(&mut extended).await?;
                u64::from(u16::from_be_bytes(extended))
            }
            127 => {
                let mut extended = [0u8; 8];
                self.stream.read_exact(&mut extended).await?;
                u64::from_be_bytes(extended)
            }
            code => u64::from(code),
        };

        let mut key = [0u8; 4];
        self.stream.read_exact(&mut key).await?;

        if payload_len > buffer.len() as u64 {
            return Err(status::exhausted(format!(
                "frame payload of {payload_len} bytes exceeds the {} byte buffer",
                buffer.len()
            )));
        }
        let payload = &mut buffer[..payload_len as usize];
        self.stream.read_exact(payload).await?;
        apply_mask(payload, key);
        Ok((opcode, &*payload))
    }

    /// Sends one final, unmasked frame: header first, then the payload.
    ///
    /// # Errors
    ///
    /// Transport errors pass through.
    pub async fn send(&self, opcode: Opcode, payload: &[u8]) -> Result<()> {
        let (header, header_len) = encode_header(opcode, payload.len());
        self.stream.write_all(&header[..header_len]).await?;
        self.stream.write_all(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn opcode_nibbles_round_trip() {
        for opcode in [
            Opcode::Continuation,
            Opcode::Text,
            Opcode::Binary,
            Opcode::Close,
            Opcode::Ping,
            Opcode::Pong,
        ] {
            assert_eq!(Opcode::from_u8(opcode as u8), Some(opcode));
        }
        for reserved in [0x3, 0x7, 0xB, 0xF] {
            assert_eq!(Opcode::from_u8(reserved), None);
        }
    }

    #[test]
    fn short_header_encodes_inline_length() {
        let (header, len) = encode_header(Opcode::Text, 4);
        assert_eq!(len, 2);
        assert_eq!(&header[..2], &[0x81, 0x04]);
    }

    #[test]
    fn boundary_lengths_pick_shortest_encoding() {
        let (header, len) = encode_header(Opcode::Binary, 125);
        assert_eq!((len, header[1]), (2, 125));

        let (header, len) = encode_header(Opcode::Binary, 126);
        assert_eq!((len, header[1]), (4, 126));
        assert_eq!(&header[2..4], &126u16.to_be_bytes());

        let (header, len) = encode_header(Opcode::Binary, 65_535);
        assert_eq!((len, header[1]), (4, 126));
        assert_eq!(&header[2..4], &65_535u16.to_be_bytes());

        let (header, len) = encode_header(Opcode::Binary, 65_536);
        assert_eq!((len, header[1]), (10, 127));
        assert_eq!(&header[2..10], &65_536u64.to_be_bytes());
    }

    #[test]
    fn fin_bit_is_always_set() {
        let (header, _) = encode_header(Opcode::Close, 0);
        assert_eq!(header[0], 0x88);
    }

    proptest! {
        #[test]
        fn masking_twice_is_identity(payload in proptest::collection::vec(any::<u8>(), 0..512),
                                     key in any::<[u8; 4]>()) {
            let mut masked = payload.clone();
            apply_mask(&mut masked, key);
            apply_mask(&mut masked, key);
            prop_assert_eq!(masked, payload);
        }
    }
}
