//! Vendor lookup by organizationally unique identifier.
//!
//! The table is an ordered list of `(prefix, vendor)` pairs searched by exact
//! 24-bit match. There is no longest-prefix or partial matching.

/// Name reported when a prefix is not in the table.
pub const UNKNOWN_VENDOR: &str = "Unknown";

/// Built-in prefixes, in lookup order.
pub const BUILTIN_OUIS: &[(u32, &str)] = &[
    (0x001018, "Broadcom"),
    (0x7C5049, "Broadcom"),
    (0x001CB3, "Broadcom"),
    (0xB0C090, "Realtek"),
    (0xF46D04, "Realtek"),
    (0xDC9FDB, "Ubiquiti"),
    (0x0023DF, "Ubiquiti"),
    (0x001DD8, "Cisco"),
    (0x001E52, "Cisco"),
    (0x0050F2, "Microsoft"),
    (0x8C8590, "TP-Link"),
    (0x001FF3, "TP-Link"),
];

/// Immutable prefix table.
#[derive(Debug, Clone, Copy)]
pub struct OuiTable {
    entries: &'static [(u32, &'static str)],
}

impl Default for OuiTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl OuiTable {
    pub const fn builtin() -> Self {
        Self { entries: BUILTIN_OUIS }
    }

    pub const fn with_entries(entries: &'static [(u32, &'static str)]) -> Self {
        Self { entries }
    }

    /// Vendor for a 24-bit prefix, or [`UNKNOWN_VENDOR`].
    pub fn lookup(&self, oui: u32) -> &'static str {
        self.entries
            .iter()
            .find(|&&(prefix, _)| prefix == oui)
            .map(|&(_, name)| name)
            .unwrap_or(UNKNOWN_VENDOR)
    }

    /// Vendor for the first three bytes of an address.
    pub fn lookup_bytes(&self, prefix: [u8; 3]) -> &'static str {
        self.lookup(oui_from_bytes(prefix))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Big-endian packing of a 3-byte prefix, so `00:50:f2` becomes `0x0050F2`.
pub fn oui_from_bytes(b: [u8; 3]) -> u32 {
    (b[0] as u32) << 16 | (b[1] as u32) << 8 | b[2] as u32
}
