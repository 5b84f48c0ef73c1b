use tracing::trace;

use crate::error::DecodeError;

/// Trailing frame check sequence, present when the FCS flag is set.
pub const FCS_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Radiotap {
    /// Bytes to skip to reach the 802.11 header.
    pub len: usize,
    /// The frame carries its 4-byte FCS at the end.
    pub fcs: bool,
    pub signal_dbm: Option<i8>,
    pub channel_freq: Option<u16>,
}

impl Radiotap {
    pub fn channel(&self) -> Option<u8> {
        self.channel_freq.and_then(freq_to_channel)
    }

    /// The 802.11 frame inside `data`, without the radiotap header or FCS.
    pub fn frame<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        let body = data.get(self.len..).unwrap_or(&[]);
        if self.fcs {
            &body[..body.len().saturating_sub(FCS_LEN)]
        } else {
            body
        }
    }
}

/// Channel number for a centre frequency in MHz (2.4, 5 and 6 GHz bands).
pub fn freq_to_channel(freq: u16) -> Option<u8> {
    match freq {
        2484 => Some(14),
        2412..=2472 => Some(((freq - 2407) / 5) as u8),
        5160..=5885 => Some(((freq - 5000) / 5) as u8),
        5955..=7115 => Some(((freq - 5950) / 5) as u8),
        _ => None,
    }
}

/// Parse the radiotap prefix of `data`.
pub fn parse(data: &[u8]) -> Result<Radiotap, DecodeError> {
    let rt = ::radiotap::Radiotap::from_bytes(data).map_err(|e| {
        trace!("radiotap rejected: {e:?}");
        DecodeError::BadRadiotap { len: data.len() }
    })?;
    Ok(Radiotap {
        len: rt.header.length as usize,
        fcs: rt.flags.map_or(false, |f| f.fcs),
        signal_dbm: rt.antenna_signal.map(|s| s.value),
        channel_freq: rt.channel.map(|c| c.freq),
    })
}
