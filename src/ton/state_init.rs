use std::sync::Arc;

use crate::ton::{
    address::TonAddress,
    boc::Boc,
    cell::{Cell, CellBuilder},
    TonCodecResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickTock {
    pub tick: bool,
    pub tock: bool,
}

/// Contract state-init:
/// `split_depth:(Maybe (## 5)) special:(Maybe TickTock) code:(Maybe ^Cell) data:(Maybe ^Cell) library:(Maybe ^Cell)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateInit {
    pub split_depth: Option<u8>,
    pub special: Option<TickTock>,
    pub code: Option<Arc<Cell>>,
    pub data: Option<Arc<Cell>>,
    pub library: Option<Arc<Cell>>,
}

impl StateInit {
    pub fn new(code: Arc<Cell>, data: Arc<Cell>) -> Self {
        Self {
            split_depth: None,
            special: None,
            code: Some(code),
            data: Some(data),
            library: None,
        }
    }

    /// Decodes a base64 bag of cells whose single root is a state-init.
    pub fn from_base64(encoded: &str) -> TonCodecResult<Self> {
        use base64::{engine::general_purpose::STANDARD, Engine as _};

        let bytes = STANDARD.decode(encoded.trim())?;
        let root = Boc::deserialize_single_root(&bytes)?;
        Self::from_cell(&root)
    }

    pub fn from_cell(cell: &Cell) -> TonCodecResult<Self> {
        let mut slice = cell.parser();

        let split_depth = if slice.load_bit()? {
            Some(slice.load_uint(5)? as u8)
        } else {
            None
        };
        let special = if slice.load_bit()? {
            Some(TickTock {
                tick: slice.load_bit()?,
                tock: slice.load_bit()?,
            })
        } else {
            None
        };
        let code = slice.load_maybe_ref()?;
        let data = slice.load_maybe_ref()?;
        let library = slice.load_maybe_ref()?;

        Ok(Self {
            split_depth,
            special,
            code,
            data,
            library,
        })
    }

    pub fn to_cell(&self) -> TonCodecResult<Cell> {
        let mut builder = CellBuilder::new();

        match self.split_depth {
            Some(depth) => {
                builder.store_bit(true)?.store_uint(depth as u64, 5)?;
            }
            None => {
                builder.store_bit(false)?;
            }
        }
        match self.special {
            Some(tt) => {
                builder.store_bit(true)?.store_bit(tt.tick)?.store_bit(tt.tock)?;
            }
            None => {
                builder.store_bit(false)?;
            }
        }
        builder.store_maybe_ref(self.code.clone())?;
        builder.store_maybe_ref(self.data.clone())?;
        builder.store_maybe_ref(self.library.clone())?;

        builder.build()
    }

    /// Address of the contract this state-init deploys to in the given workchain.
    pub fn address(&self, workchain: i32) -> TonCodecResult<TonAddress> {
        Ok(TonAddress::new(workchain, self.to_cell()?.hash()))
    }
}
