use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::ton::{TonCodecError, TonCodecResult};

pub const MAX_CELL_BITS: usize = 1023;
pub const MAX_CELL_REFS: usize = 4;
pub const MAX_CELL_DEPTH: u16 = 1024;

/// Ordinary TON cell. Depth and representation hash are computed once at construction,
/// so children must always be built before their parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
    depth: u16,
    hash: [u8; 32],
}

impl Cell {
    pub fn new(mut data: Vec<u8>, bit_len: usize, refs: Vec<Arc<Cell>>) -> TonCodecResult<Self> {
        if bit_len > MAX_CELL_BITS {
            return Err(TonCodecError::CellOverflow(format!("{} bits", bit_len)));
        }
        if refs.len() > MAX_CELL_REFS {
            return Err(TonCodecError::CellOverflow(format!("{} refs", refs.len())));
        }
        let byte_len = bit_len.div_ceil(8);
        if data.len() < byte_len {
            return Err(TonCodecError::CellUnderflow);
        }
        data.truncate(byte_len);
        // Bits past bit_len never take part in the hash.
        if bit_len % 8 != 0 {
            let keep = 0xffu8 << (8 - bit_len % 8);
            data[byte_len - 1] &= keep;
        }

        let depth = match refs.iter().map(|r| r.depth).max() {
            None => 0,
            Some(deepest) => deepest
                .checked_add(1)
                .filter(|depth| *depth <= MAX_CELL_DEPTH)
                .ok_or_else(|| TonCodecError::CellOverflow(format!("depth above {}", MAX_CELL_DEPTH)))?,
        };
        let mut cell = Cell {
            data,
            bit_len,
            refs,
            depth,
            hash: [0u8; 32],
        };
        cell.hash = cell.representation_hash();

        Ok(cell)
    }

    pub fn empty() -> Self {
        let mut cell = Cell {
            data: Vec::new(),
            bit_len: 0,
            refs: Vec::new(),
            depth: 0,
            hash: [0u8; 32],
        };
        cell.hash = cell.representation_hash();
        cell
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }

    pub fn parser(&self) -> CellSlice<'_> {
        CellSlice::new(self)
    }

    /// Refs descriptor byte for an ordinary level-0 cell.
    pub(crate) fn d1(&self) -> u8 {
        self.refs.len() as u8
    }

    /// Bits descriptor byte: floor(bits / 8) + ceil(bits / 8).
    pub(crate) fn d2(&self) -> u8 {
        (self.bit_len / 8 + self.bit_len.div_ceil(8)) as u8
    }

    /// Data bytes with the completion tag appended when the bit length is not byte aligned.
    pub(crate) fn padded_data(&self) -> Vec<u8> {
        let mut padded = self.data.clone();
        if self.bit_len % 8 != 0 {
            let last = padded.len() - 1;
            padded[last] |= 1 << (7 - self.bit_len % 8);
        }
        padded
    }

    fn representation_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update([self.d1(), self.d2()]);
        hasher.update(self.padded_data());
        for r in &self.refs {
            hasher.update(r.depth.to_be_bytes());
        }
        for r in &self.refs {
            hasher.update(r.hash);
        }
        hasher.finalize().into()
    }
}

#[derive(Debug, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_bit(&mut self, bit: bool) -> TonCodecResult<&mut Self> {
        if self.bit_len >= MAX_CELL_BITS {
            return Err(TonCodecError::CellOverflow(format!("{} bits", self.bit_len + 1)));
        }
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let last = self.data.len() - 1;
            self.data[last] |= 1 << (7 - self.bit_len % 8);
        }
        self.bit_len += 1;
        Ok(self)
    }

    pub fn store_uint(&mut self, value: u64, bits: usize) -> TonCodecResult<&mut Self> {
        if bits > 64 || (bits < 64 && value >> bits != 0) {
            return Err(TonCodecError::CellOverflow(format!("{} does not fit in {} bits", value, bits)));
        }
        for i in (0..bits).rev() {
            self.store_bit((value >> i) & 1 == 1)?;
        }
        Ok(self)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> TonCodecResult<&mut Self> {
        for byte in bytes {
            self.store_uint(*byte as u64, 8)?;
        }
        Ok(self)
    }

    pub fn store_ref(&mut self, cell: Arc<Cell>) -> TonCodecResult<&mut Self> {
        if self.refs.len() >= MAX_CELL_REFS {
            return Err(TonCodecError::CellOverflow(format!("{} refs", self.refs.len() + 1)));
        }
        self.refs.push(cell);
        Ok(self)
    }

    pub fn store_maybe_ref(&mut self, cell: Option<Arc<Cell>>) -> TonCodecResult<&mut Self> {
        match cell {
            Some(cell) => {
                self.store_bit(true)?;
                self.store_ref(cell)
            }
            None => self.store_bit(false),
        }
    }

    pub fn build(self) -> TonCodecResult<Cell> {
        Cell::new(self.data, self.bit_len, self.refs)
    }
}

/// Read cursor over a cell's bits and refs.
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl<'a> CellSlice<'a> {
    pub fn new(cell: &'a Cell) -> Self {
        Self {
            cell,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len - self.bit_pos
    }

    pub fn remaining_refs(&self) -> usize {
        self.cell.refs.len() - self.ref_pos
    }

    pub fn load_bit(&mut self) -> TonCodecResult<bool> {
        if self.bit_pos >= self.cell.bit_len {
            return Err(TonCodecError::CellUnderflow);
        }
        let byte = self.cell.data[self.bit_pos / 8];
        let bit = (byte >> (7 - self.bit_pos % 8)) & 1 == 1;
        self.bit_pos += 1;
        Ok(bit)
    }

    pub fn load_uint(&mut self, bits: usize) -> TonCodecResult<u64> {
        if bits > 64 {
            return Err(TonCodecError::CellOverflow(format!("{} bit integer", bits)));
        }
        if bits > self.remaining_bits() {
            return Err(TonCodecError::CellUnderflow);
        }
        let mut value = 0u64;
        for _ in 0..bits {
            value = (value << 1) | self.load_bit()? as u64;
        }
        Ok(value)
    }

    pub fn load_bytes<const N: usize>(&mut self) -> TonCodecResult<[u8; N]> {
        if N * 8 > self.remaining_bits() {
            return Err(TonCodecError::CellUnderflow);
        }
        let mut out = [0u8; N];
        for byte in out.iter_mut() {
            *byte = self.load_uint(8)? as u8;
        }
        Ok(out)
    }

    pub fn skip_bits(&mut self, bits: usize) -> TonCodecResult<()> {
        if bits > self.remaining_bits() {
            return Err(TonCodecError::CellUnderflow);
        }
        self.bit_pos += bits;
        Ok(())
    }

    pub fn load_ref(&mut self) -> TonCodecResult<Arc<Cell>> {
        let cell = self
            .cell
            .refs
            .get(self.ref_pos)
            .cloned()
            .ok_or(TonCodecError::CellUnderflow)?;
        self.ref_pos += 1;
        Ok(cell)
    }

    pub fn load_maybe_ref(&mut self) -> TonCodecResult<Option<Arc<Cell>>> {
        if self.load_bit()? {
            Ok(Some(self.load_ref()?))
        } else {
            Ok(None)
        }
    }
}
