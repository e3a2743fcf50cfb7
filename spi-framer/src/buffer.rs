//! Byte accumulation for an open select window
//!
//! Keeps the transfer units of one window in arrival order and joins them into
//! contiguous MISO/MOSI buffers when the window closes.

/// Ordered list of `(miso, mosi)` transfer units
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionBuffer {
    units: Vec<(Vec<u8>, Vec<u8>)>,
    miso_len: usize,
    mosi_len: usize,
}

impl TransactionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one transfer unit
    pub fn push(&mut self, miso: Vec<u8>, mosi: Vec<u8>) {
        self.miso_len += miso.len();
        self.mosi_len += mosi.len();
        self.units.push((miso, mosi));
    }

    /// Number of transfer units held
    pub fn units(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Total MISO bytes held
    pub fn miso_len(&self) -> usize {
        self.miso_len
    }

    /// Total MOSI bytes held
    pub fn mosi_len(&self) -> usize {
        self.mosi_len
    }

    /// Concatenate all units, returning `(miso, mosi)`
    pub fn into_bytes(self) -> (Vec<u8>, Vec<u8>) {
        let mut miso = Vec::with_capacity(self.miso_len);
        let mut mosi = Vec::with_capacity(self.mosi_len);

        for (unit_miso, unit_mosi) in self.units {
            miso.extend_from_slice(&unit_miso);
            mosi.extend_from_slice(&unit_mosi);
        }

        (miso, mosi)
    }
}
