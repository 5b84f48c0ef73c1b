//! Fixed 24-byte management MAC header.
//!
//! Layout (all multi-byte fields little-endian):
//!
//! ```text
//!  0  frame control   (2)
//!  2  duration        (2)
//!  4  destination     (6)
//! 10  source          (6)
//! 16  bssid           (6)
//! 22  sequence ctrl   (2)   bits 0-3 fragment, bits 4-15 sequence
//! ```

use std::fmt;

use crate::error::DecodeError;

pub const MAC_HEADER_LEN: usize = 24;

const FC_TYPE_MANAGEMENT: u16 = 0;
const FC_SUBTYPE_BEACON: u16 = 8;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub fn oui(&self) -> [u8; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff; 6]
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", b[0], b[1], b[2], b[3], b[4], b[5])
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Borrowed view over the header bytes of one frame.
#[derive(Clone, Copy)]
pub struct MacHeader<'a> {
    raw: &'a [u8; MAC_HEADER_LEN],
}

impl<'a> MacHeader<'a> {
    pub fn parse(frame: &'a [u8]) -> Result<Self, DecodeError> {
        let raw = frame
            .get(..MAC_HEADER_LEN)
            .and_then(|h| <&[u8; MAC_HEADER_LEN]>::try_from(h).ok())
            .ok_or(DecodeError::ShortHeader { len: frame.len() })?;
        Ok(Self { raw })
    }

    pub fn split(frame: &'a [u8]) -> Result<(Self, &'a [u8]), DecodeError> {
        let hdr = Self::parse(frame)?;
        Ok((hdr, &frame[MAC_HEADER_LEN..]))
    }

    fn u16_at(&self, off: usize) -> u16 {
        u16::from_le_bytes([self.raw[off], self.raw[off + 1]])
    }

    fn addr_at(&self, off: usize) -> MacAddr {
        let mut a = [0u8; 6];
        a.copy_from_slice(&self.raw[off..off + 6]);
        MacAddr(a)
    }

    pub fn frame_control(&self) -> u16 { self.u16_at(0) }
    pub fn duration(&self)      -> u16 { self.u16_at(2) }
    pub fn destination(&self)   -> MacAddr { self.addr_at(4) }
    pub fn source(&self)        -> MacAddr { self.addr_at(10) }
    pub fn bssid(&self)         -> MacAddr { self.addr_at(16) }
    pub fn sequence_control(&self) -> u16 { self.u16_at(22) }

    pub fn frame_type(&self) -> u8 {
        ((self.frame_control() >> 2) & 0x3) as u8
    }

    pub fn frame_subtype(&self) -> u8 {
        ((self.frame_control() >> 4) & 0xf) as u8
    }

    pub fn is_beacon(&self) -> bool {
        self.frame_type() as u16 == FC_TYPE_MANAGEMENT && self.frame_subtype() as u16 == FC_SUBTYPE_BEACON
    }

    /// Bits 4-15 of sequence control.
    pub fn sequence_number(&self) -> u16 {
        self.sequence_control() >> 4
    }

    pub fn fragment_number(&self) -> u8 {
        (self.sequence_control() & 0x000f) as u8
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.raw
    }
}

impl fmt::Debug for MacHeader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacHeader")
            .field("frame_control", &format_args!("{:#06x}", self.frame_control()))
            .field("source", &self.source())
            .field("bssid", &self.bssid())
            .field("sequence", &self.sequence_number())
            .field("fragment", &self.fragment_number())
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn beacon_header(src: [u8; 6], bssid: [u8; 6], seq_ctrl: u16) -> Vec<u8> {
    let mut h = Vec::with_capacity(MAC_HEADER_LEN);
    h.extend_from_slice(&[0x80, 0x00]);
    h.extend_from_slice(&[0x00, 0x00]);
    h.extend_from_slice(&[0xff; 6]);
    h.extend_from_slice(&src);
    h.extend_from_slice(&bssid);
    h.extend_from_slice(&seq_ctrl.to_le_bytes());
    h
}
