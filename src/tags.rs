//! Tagged parameter (information element) scanning.
//!
//! The variable part of a beacon body is a run of `(number, length, data)`
//! elements. Scanning stops at the first element whose length is zero or
//! would run past the end of the buffer; whatever was found before that is
//! kept. Only the first element of each consumed kind is processed.

use std::fmt;

use tracing::trace;

pub const TAG_SUPPORTED_RATES: u8 = 1;
pub const TAG_RSN: u8 = 48;
pub const TAG_VENDOR_SPECIFIC: u8 = 221;

/// AKM suite selector for SAE (00-0F-AC:8).
pub const SAE_AKM_SUITE: [u8; 4] = [0x00, 0x0f, 0xac, 0x08];
pub const MICROSOFT_OUI: [u8; 3] = [0x00, 0x50, 0xf2];
pub const WPA_VENDOR_TYPE: u8 = 0x01;

const RSN_VERSION_MIN_LEN: usize = 2;
const RSN_AKM_SCAN_MIN_LEN: usize = 14;

/// One element borrowed from the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggedParameter<'a> {
    pub number: u8,
    pub data: &'a [u8],
}

impl TaggedParameter<'_> {
    /// Length byte on the wire. Parsed elements never exceed 255 bytes.
    pub fn length(&self) -> u8 {
        u8::try_from(self.data.len()).unwrap_or(u8::MAX)
    }
}

/// Iterator over well-formed elements. Ends at the buffer end or at the first
/// malformed element, after which [`TagIter::truncated`] reports `true`.
#[derive(Debug, Clone)]
pub struct TagIter<'a> {
    rest: &'a [u8],
    truncated: bool,
}

impl<'a> TagIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { rest: data, truncated: false }
    }

    /// Scan stopped on a zero or overlong length, or on a dangling header byte.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    fn stop(&mut self) -> Option<TaggedParameter<'a>> {
        self.truncated |= !self.rest.is_empty();
        self.rest = &[];
        None
    }
}

impl<'a> Iterator for TagIter<'a> {
    type Item = TaggedParameter<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest: &'a [u8] = self.rest;
        let (number, len, body) = match rest {
            [number, len, body @ ..] => (*number, *len as usize, body),
            _ => return self.stop(),
        };
        if len == 0 || len > body.len() {
            trace!(tag = number, len, remaining = body.len(), "tag scan stopped");
            return self.stop();
        }
        let (data, rest) = body.split_at(len);
        self.rest = rest;
        Some(TaggedParameter { number, data })
    }
}

// ─── Element payloads ─────────────────────────────────────────────────────────

/// One entry of the Supported Rates element, held in 500 kbps units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedRate {
    half_mbps: u8,
    basic: bool,
}

impl SupportedRate {
    pub fn from_byte(b: u8) -> Self {
        Self { half_mbps: b & 0x7f, basic: b & 0x80 != 0 }
    }

    pub fn rate_mbps(&self) -> f32 {
        self.half_mbps as f32 * 0.5
    }

    pub fn is_basic(&self) -> bool {
        self.basic
    }
}

/// `<whole>.<tenths>` with a trailing `*` for basic rates.
impl fmt::Display for SupportedRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.half_mbps / 2;
        let tenths = (self.half_mbps % 2) * 5;
        write!(f, "{whole}.{tenths}{}", if self.basic { "*" } else { "" })
    }
}

/// What the first RSN element revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RsnInfo {
    /// Present when the element holds at least two bytes. Not used for classification.
    pub version: Option<u16>,
    /// SAE suite selector seen somewhere in the element.
    pub sae: bool,
}

impl RsnInfo {
    fn parse(data: &[u8]) -> Self {
        let version = (data.len() >= RSN_VERSION_MIN_LEN).then(|| u16::from_le_bytes([data[0], data[1]]));
        let sae = data.len() >= RSN_AKM_SCAN_MIN_LEN && data.windows(4).any(|w| w == SAE_AKM_SUITE);
        Self { version, sae }
    }
}

/// Header of the first vendor-specific element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorTag {
    pub oui: [u8; 3],
    pub vendor_type: u8,
}

impl VendorTag {
    fn parse(data: &[u8]) -> Option<Self> {
        match data {
            [a, b, c, t, ..] => Some(Self { oui: [*a, *b, *c], vendor_type: *t }),
            _ => None,
        }
    }

    /// Legacy WPA information element (Microsoft OUI, type 1).
    pub fn is_wpa(&self) -> bool {
        self.oui == MICROSOFT_OUI && self.vendor_type == WPA_VENDOR_TYPE
    }
}

// ─── Scanner ──────────────────────────────────────────────────────────────────

/// Everything the scanner keeps from one frame's tag stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagFindings {
    /// Rates from the first Supported Rates element; empty if none was seen.
    pub rates: Vec<SupportedRate>,
    pub rsn: Option<RsnInfo>,
    /// `None` if no vendor element was seen or the first one was shorter than 4 bytes.
    pub vendor: Option<VendorTag>,
    pub truncated: bool,
}

/// Scan a tag stream, processing the first rates, RSN and vendor elements.
pub fn scan(data: &[u8]) -> TagFindings {
    let mut findings = TagFindings::default();
    let mut seen_rates = false;
    let mut seen_vendor = false;

    let mut tags = TagIter::new(data);
    for tag in tags.by_ref() {
        match tag.number {
            TAG_SUPPORTED_RATES if !seen_rates => {
                seen_rates = true;
                findings.rates = tag.data.iter().map(|&b| SupportedRate::from_byte(b)).collect();
            }
            TAG_RSN if findings.rsn.is_none() => {
                let rsn = RsnInfo::parse(tag.data);
                trace!(len = tag.data.len(), version = ?rsn.version, sae = rsn.sae, "rsn element");
                findings.rsn = Some(rsn);
            }
            TAG_VENDOR_SPECIFIC if !seen_vendor => {
                seen_vendor = true;
                findings.vendor = VendorTag::parse(tag.data);
            }
            _ => {}
        }
    }
    findings.truncated = tags.truncated();
    findings
}

#[cfg(test)]
pub(crate) fn tag(number: u8, data: &[u8]) -> Vec<u8> {
    let mut t = vec![number, data.len() as u8];
    t.extend_from_slice(data);
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    /// RSN body carrying one pairwise suite and the given AKM selector.
    fn rsn_body(akm: [u8; 4]) -> Vec<u8> {
        let mut b = vec![0x01, 0x00];
        b.extend_from_slice(&[0x00, 0x0f, 0xac, 0x04]);
        b.extend_from_slice(&[0x01, 0x00]);
        b.extend_from_slice(&[0x00, 0x0f, 0xac, 0x04]);
        b.extend_from_slice(&[0x01, 0x00]);
        b.extend_from_slice(&akm);
        b.extend_from_slice(&[0x00, 0x00]);
        b
    }

    #[test] fn length_byte()    { assert_eq!(TaggedParameter { number: 0, data: &[0; 7] }.length(), 7); }
    #[test] fn length_capped()  { assert_eq!(TaggedParameter { number: 0, data: &[0; 300] }.length(), 255); }
    #[test] fn rate_basic()     { assert_eq!(SupportedRate::from_byte(0x82).to_string(), "1.0*"); }
    #[test] fn rate_half()      { assert_eq!(SupportedRate::from_byte(0x0b).to_string(), "5.5"); }
    #[test] fn rate_value()     { assert_eq!(SupportedRate::from_byte(0x6c).rate_mbps(), 54.0); }

    #[test]
    fn walks_all_tags() {
        let mut s = tag(0, b"home");
        s.extend(tag(3, &[6]));
        s.extend(tag(5, &[0, 1, 0, 0]));
        let got: Vec<_> = TagIter::new(&s).map(|t| (t.number, t.length())).collect();
        assert_eq!(got, vec![(0, 4), (3, 1), (5, 4)]);
    }

    #[test]
    fn rates_first_occurrence_only() {
        let mut s = tag(TAG_SUPPORTED_RATES, &[0x82, 0x04]);
        s.extend(tag(TAG_SUPPORTED_RATES, &[0x8b, 0x96, 0x24]));
        let f = scan(&s);
        assert_eq!(f.rates.len(), 2);
        assert_eq!(f.rates[0].rate_mbps(), 1.0);
        assert!(f.rates[0].is_basic());
        assert_eq!(f.rates[1].rate_mbps(), 2.0);
        assert!(!f.rates[1].is_basic());
        assert!(!f.truncated);
    }

    #[test]
    fn zero_length_stops_scan() {
        let mut s = tag(0, &[]);
        s.extend(tag(TAG_SUPPORTED_RATES, &[0x82]));
        let f = scan(&s);
        assert!(f.rates.is_empty());
        assert!(f.truncated);
    }

    #[test]
    fn overlong_length_stops_scan() {
        let mut s = tag(TAG_SUPPORTED_RATES, &[0x82, 0x84]);
        s.extend_from_slice(&[TAG_RSN, 20, 0x01, 0x00]);
        let f = scan(&s);
        assert_eq!(f.rates.len(), 2);
        assert_eq!(f.rsn, None);
        assert!(f.truncated);
    }

    #[test]
    fn exact_fit_is_not_truncated() {
        let s = tag(TAG_RSN, &[0x01, 0x00]);
        let f = scan(&s);
        assert_eq!(f.rsn, Some(RsnInfo { version: Some(1), sae: false }));
        assert!(!f.truncated);
    }

    #[test]
    fn dangling_byte_marks_truncated() {
        let mut s = tag(TAG_SUPPORTED_RATES, &[0x82]);
        s.push(0x30);
        let f = scan(&s);
        assert_eq!(f.rates.len(), 1);
        assert!(f.truncated);
    }

    #[test]
    fn empty_stream() {
        assert_eq!(scan(&[]), TagFindings::default());
    }

    #[test]
    fn rsn_sae_anywhere() {
        let f = scan(&tag(TAG_RSN, &rsn_body(SAE_AKM_SUITE)));
        assert_eq!(f.rsn, Some(RsnInfo { version: Some(1), sae: true }));

        let f = scan(&tag(TAG_RSN, &rsn_body([0x00, 0x0f, 0xac, 0x02])));
        assert_eq!(f.rsn, Some(RsnInfo { version: Some(1), sae: false }));
    }

    #[test]
    fn rsn_sae_in_last_window() {
        let mut body = vec![0x01, 0x00];
        body.extend_from_slice(&[0u8; 8]);
        body.extend_from_slice(&SAE_AKM_SUITE);
        assert_eq!(body.len(), 14);
        assert!(scan(&tag(TAG_RSN, &body)).rsn.unwrap().sae);
    }

    #[test]
    fn rsn_short_element_skips_akm_scan() {
        let mut body = vec![0x01, 0x00];
        body.extend_from_slice(&SAE_AKM_SUITE);
        let rsn = scan(&tag(TAG_RSN, &body)).rsn.unwrap();
        assert_eq!(rsn.version, Some(1));
        assert!(!rsn.sae);

        let rsn = scan(&tag(TAG_RSN, &[0x01])).rsn.unwrap();
        assert_eq!(rsn.version, None);
    }

    #[test]
    fn second_rsn_ignored() {
        let mut s = tag(TAG_RSN, &rsn_body([0x00, 0x0f, 0xac, 0x02]));
        s.extend(tag(TAG_RSN, &rsn_body(SAE_AKM_SUITE)));
        assert!(!scan(&s).rsn.unwrap().sae);
    }

    #[test]
    fn first_vendor_tag_wins() {
        let mut s = tag(TAG_VENDOR_SPECIFIC, &[0x00, 0x10, 0x18, 0x02, 0x00]);
        s.extend(tag(TAG_VENDOR_SPECIFIC, &[0x00, 0x50, 0xf2, 0x01, 0x01, 0x00]));
        let v = scan(&s).vendor.unwrap();
        assert_eq!(v.oui, [0x00, 0x10, 0x18]);
        assert!(!v.is_wpa());
    }

    #[test]
    fn short_vendor_tag_consumes_slot() {
        let mut s = tag(TAG_VENDOR_SPECIFIC, &[0x00, 0x50, 0xf2]);
        s.extend(tag(TAG_VENDOR_SPECIFIC, &[0x00, 0x50, 0xf2, 0x01]));
        assert_eq!(scan(&s).vendor, None);
    }

    #[test]
    fn wpa_vendor_tag() {
        let v = scan(&tag(TAG_VENDOR_SPECIFIC, &[0x00, 0x50, 0xf2, 0x01, 0x01, 0x00])).vendor.unwrap();
        assert!(v.is_wpa());
    }

    // xorshift32, enough to shake out slicing mistakes.
    struct Rng(u32);
    impl Rng {
        fn next(&mut self) -> u32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            self.0 = x;
            x
        }
    }

    #[test]
    fn random_truncated_streams() {
        let mut rng = Rng(0x9e37_79b9);
        for _ in 0..5_000 {
            let mut s = Vec::new();
            for _ in 0..(rng.next() % 6) {
                let number = [0u8, 1, 3, 48, 221, 50][(rng.next() % 6) as usize];
                let len = (rng.next() % 24) as usize;
                let body: Vec<u8> = (0..len).map(|_| rng.next() as u8).collect();
                s.extend(tag(number, &body));
            }
            let cut = if s.is_empty() { 0 } else { rng.next() as usize % (s.len() + 1) };
            let stream = &s[..cut];

            let mut consumed = 0usize;
            let mut it = TagIter::new(stream);
            for t in it.by_ref() {
                assert!(t.length() > 0);
                consumed += 2 + t.data.len();
            }
            assert!(consumed <= stream.len());
            assert_eq!(it.truncated(), consumed < stream.len());

            let f = scan(stream);
            assert!(f.rates.len() <= 255);
            assert_eq!(f.truncated, it.truncated());
        }
    }
}
