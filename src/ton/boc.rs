use std::{collections::HashMap, sync::Arc};

use crate::ton::{cell::Cell, TonCodecError, TonCodecResult};

const BOC_GENERIC_MAGIC: u32 = 0xb5ee_9c72;
const BOC_LEAN_MAGIC: u32 = 0x68ff_65f3;
const BOC_LEAN_CRC_MAGIC: u32 = 0xacc3_a728;

/// Bag-of-cells codec.
pub struct Boc;

impl Boc {
    /// Decodes a serialized bag of cells and returns its roots.
    pub fn deserialize(bytes: &[u8]) -> TonCodecResult<Vec<Arc<Cell>>> {
        let mut reader = ByteReader::new(bytes);

        let magic = reader.read_uint(4)? as u32;
        let (has_idx, has_crc, size) = match magic {
            BOC_GENERIC_MAGIC => {
                let flags = reader.read_u8()?;
                (flags & 0x80 != 0, flags & 0x40 != 0, (flags & 0x07) as usize)
            }
            BOC_LEAN_MAGIC => (true, false, reader.read_u8()? as usize),
            BOC_LEAN_CRC_MAGIC => (true, true, reader.read_u8()? as usize),
            other => return Err(TonCodecError::InvalidBoc(format!("unknown magic {:08x}", other))),
        };
        if size == 0 || size > 4 {
            return Err(TonCodecError::InvalidBoc(format!("invalid ref size {}", size)));
        }

        let off_bytes = reader.read_u8()? as usize;
        if off_bytes == 0 || off_bytes > 8 {
            return Err(TonCodecError::InvalidBoc(format!("invalid offset size {}", off_bytes)));
        }

        let cell_count = reader.read_uint(size)? as usize;
        let root_count = reader.read_uint(size)? as usize;
        let absent_count = reader.read_uint(size)?;
        let total_cells_size = reader.read_uint(off_bytes)? as usize;

        if absent_count != 0 {
            return Err(TonCodecError::InvalidBoc("absent cells are not supported".to_string()));
        }
        if root_count == 0 || root_count > cell_count {
            return Err(TonCodecError::InvalidBoc(format!(
                "{} roots for {} cells",
                root_count, cell_count
            )));
        }

        let roots = if magic == BOC_GENERIC_MAGIC {
            let mut roots = Vec::with_capacity(root_count);
            for _ in 0..root_count {
                roots.push(reader.read_uint(size)? as usize);
            }
            roots
        } else {
            vec![0]
        };

        if has_idx {
            reader.skip(cell_count * off_bytes)?;
        }

        let cells_start = reader.position();
        let mut raw_cells = Vec::with_capacity(cell_count.min(4096));
        for index in 0..cell_count {
            raw_cells.push(read_raw_cell(&mut reader, index, cell_count, size)?);
        }
        if reader.position() - cells_start != total_cells_size {
            return Err(TonCodecError::InvalidBoc("cell data size mismatch".to_string()));
        }

        if has_crc {
            let checked = reader.position();
            let expected = u32::from_le_bytes(reader.read_array::<4>()?);
            if crc32c(&bytes[..checked]) != expected {
                return Err(TonCodecError::InvalidBoc("crc32c mismatch".to_string()));
            }
        }

        // References always point forward, so cells can be materialised back to front.
        let mut built: Vec<Option<Arc<Cell>>> = vec![None; cell_count];
        for index in (0..cell_count).rev() {
            let raw = &raw_cells[index];
            let mut refs = Vec::with_capacity(raw.refs.len());
            for r in &raw.refs {
                let child = built[*r]
                    .clone()
                    .ok_or_else(|| TonCodecError::InvalidBoc(format!("dangling ref {}", r)))?;
                refs.push(child);
            }
            built[index] = Some(Arc::new(Cell::new(raw.data.clone(), raw.bit_len, refs)?));
        }

        roots
            .into_iter()
            .map(|root| {
                built
                    .get(root)
                    .cloned()
                    .flatten()
                    .ok_or_else(|| TonCodecError::InvalidBoc(format!("invalid root index {}", root)))
            })
            .collect()
    }

    /// Decodes a bag of cells that must contain exactly one root.
    pub fn deserialize_single_root(bytes: &[u8]) -> TonCodecResult<Arc<Cell>> {
        let mut roots = Self::deserialize(bytes)?;
        if roots.len() != 1 {
            return Err(TonCodecError::InvalidBoc(format!("expected 1 root, got {}", roots.len())));
        }
        Ok(roots.remove(0))
    }

    /// Serializes a single-root bag of cells with the generic magic and no index.
    pub fn serialize(root: &Arc<Cell>, with_crc: bool) -> Vec<u8> {
        let ordered = topological_order(root);
        let positions: HashMap<[u8; 32], usize> =
            ordered.iter().enumerate().map(|(i, c)| (c.hash(), i)).collect();

        let size = bytes_needed(ordered.len() as u64);
        let mut cell_data = Vec::new();
        for cell in &ordered {
            cell_data.push(cell.d1());
            cell_data.push(cell.d2());
            cell_data.extend_from_slice(&cell.padded_data());
            for r in cell.refs() {
                write_uint(&mut cell_data, positions[&r.hash()] as u64, size);
            }
        }
        let off_bytes = bytes_needed(cell_data.len() as u64);

        let mut out = Vec::with_capacity(cell_data.len() + 32);
        out.extend_from_slice(&BOC_GENERIC_MAGIC.to_be_bytes());
        let mut flags = size as u8;
        if with_crc {
            flags |= 0x40;
        }
        out.push(flags);
        out.push(off_bytes as u8);
        write_uint(&mut out, ordered.len() as u64, size);
        write_uint(&mut out, 1, size);
        write_uint(&mut out, 0, size);
        write_uint(&mut out, cell_data.len() as u64, off_bytes);
        write_uint(&mut out, 0, size);
        out.extend_from_slice(&cell_data);

        if with_crc {
            let crc = crc32c(&out);
            out.extend_from_slice(&crc.to_le_bytes());
        }

        out
    }
}

struct RawCell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<usize>,
}

fn read_raw_cell(reader: &mut ByteReader<'_>, index: usize, cell_count: usize, size: usize) -> TonCodecResult<RawCell> {
    let d1 = reader.read_u8()?;
    let d2 = reader.read_u8()?;

    let ref_count = (d1 & 0x07) as usize;
    let exotic = d1 & 0x08 != 0;
    let with_hashes = d1 & 0x10 != 0;
    let level_mask = d1 >> 5;

    if exotic {
        return Err(TonCodecError::UnsupportedCell(format!("exotic cell at {}", index)));
    }
    if ref_count > 4 {
        return Err(TonCodecError::InvalidBoc(format!("cell {} has {} refs", index, ref_count)));
    }
    if with_hashes {
        let hash_count = level_mask.count_ones() as usize + 1;
        reader.skip(hash_count * (32 + 2))?;
    }

    let data_len = (d2 as usize).div_ceil(2);
    let data = reader.read_bytes(data_len)?.to_vec();
    let bit_len = if d2 % 2 == 0 {
        data_len * 8
    } else {
        let last = *data
            .last()
            .ok_or_else(|| TonCodecError::InvalidBoc(format!("cell {} has no data byte", index)))?;
        if last == 0 {
            return Err(TonCodecError::InvalidBoc(format!("cell {} missing completion tag", index)));
        }
        data_len * 8 - last.trailing_zeros() as usize - 1
    };

    let mut refs = Vec::with_capacity(ref_count);
    for _ in 0..ref_count {
        let r = reader.read_uint(size)? as usize;
        if r <= index || r >= cell_count {
            return Err(TonCodecError::InvalidBoc(format!("cell {} has invalid ref {}", index, r)));
        }
        refs.push(r);
    }

    Ok(RawCell { data, bit_len, refs })
}

fn topological_order(root: &Arc<Cell>) -> Vec<Arc<Cell>> {
    fn visit(cell: &Arc<Cell>, seen: &mut HashMap<[u8; 32], ()>, post: &mut Vec<Arc<Cell>>) {
        if seen.insert(cell.hash(), ()).is_some() {
            return;
        }
        for r in cell.refs().iter().rev() {
            visit(r, seen, post);
        }
        post.push(cell.clone());
    }

    let mut seen = HashMap::new();
    let mut post = Vec::new();
    visit(root, &mut seen, &mut post);
    post.reverse();
    post
}

fn bytes_needed(value: u64) -> usize {
    let mut n = 1;
    while n < 8 && value >> (n * 8) != 0 {
        n += 1;
    }
    n
}

fn write_uint(out: &mut Vec<u8>, value: u64, bytes: usize) {
    out.extend_from_slice(&value.to_be_bytes()[8 - bytes..]);
}

/// CRC-32C (Castagnoli), reflected, as used by the bag-of-cells trailer.
fn crc32c(bytes: &[u8]) -> u32 {
    let mut crc = !0u32;
    for byte in bytes {
        crc ^= *byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0x82f6_3b78 & mask);
        }
    }
    !crc
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn read_bytes(&mut self, n: usize) -> TonCodecResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| TonCodecError::InvalidBoc("unexpected end of input".to_string()))?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn read_array<const N: usize>(&mut self) -> TonCodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    fn read_u8(&mut self) -> TonCodecResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_uint(&mut self, n: usize) -> TonCodecResult<u64> {
        Ok(self
            .read_bytes(n)?
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | *b as u64))
    }

    fn skip(&mut self, n: usize) -> TonCodecResult<()> {
        self.read_bytes(n).map(|_| ())
    }
}

/// A bag of `cells` empty cells, each referencing the next one.
#[cfg(test)]
pub(crate) fn chained_boc(cells: usize) -> Vec<u8> {
    const REF_SIZE: usize = 3;
    const OFF_BYTES: usize = 4;

    let mut body = Vec::new();
    for index in 0..cells {
        if index + 1 < cells {
            body.extend_from_slice(&[0x01, 0x00]);
            write_uint(&mut body, (index + 1) as u64, REF_SIZE);
        } else {
            body.extend_from_slice(&[0x00, 0x00]);
        }
    }

    let mut out = BOC_GENERIC_MAGIC.to_be_bytes().to_vec();
    out.push(REF_SIZE as u8);
    out.push(OFF_BYTES as u8);
    write_uint(&mut out, cells as u64, REF_SIZE);
    write_uint(&mut out, 1, REF_SIZE);
    write_uint(&mut out, 0, REF_SIZE);
    write_uint(&mut out, body.len() as u64, OFF_BYTES);
    write_uint(&mut out, 0, REF_SIZE);
    out.extend_from_slice(&body);
    out
}
