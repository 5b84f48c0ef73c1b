use std::fmt;

use crate::tags::TagFindings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncryptionLabel {
    Open,
    WpaPersonal,
    Wpa2Personal,
    Wpa3Personal,
}

impl EncryptionLabel {
    pub const ALL: [EncryptionLabel; 4] = [
        EncryptionLabel::Open,
        EncryptionLabel::WpaPersonal,
        EncryptionLabel::Wpa2Personal,
        EncryptionLabel::Wpa3Personal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EncryptionLabel::Open         => "Open",
            EncryptionLabel::WpaPersonal  => "WPA-Personal",
            EncryptionLabel::Wpa2Personal => "WPA2-Personal",
            EncryptionLabel::Wpa3Personal => "WPA3-Personal",
        }
    }
}

impl fmt::Display for EncryptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First match wins: RSN with SAE, RSN, legacy WPA vendor element, open.
/// An RSN element outranks a WPA vendor element wherever either appeared.
pub fn classify(findings: &TagFindings) -> EncryptionLabel {
    match (findings.rsn, findings.vendor) {
        (Some(rsn), _) if rsn.sae => EncryptionLabel::Wpa3Personal,
        (Some(_), _) => EncryptionLabel::Wpa2Personal,
        (None, Some(v)) if v.is_wpa() => EncryptionLabel::WpaPersonal,
        _ => EncryptionLabel::Open,
    }
}
