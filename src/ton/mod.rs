//! Minimal TON primitives needed to check a `ton_proof`: cells and bags of cells,
//! contract state-init, account addresses and the standard wallet data layouts.

pub mod address;
pub mod boc;
pub mod cell;
pub mod state_init;
pub mod wallets;

pub use address::TonAddress;
pub use boc::Boc;
pub use cell::{Cell, CellBuilder, CellSlice};
pub use state_init::StateInit;
pub use wallets::{KnownWallet, KnownWallets, WalletDataLayout};

#[derive(Debug, thiserror::Error)]
pub enum TonCodecError {
    #[error("Invalid bag of cells: {0}")]
    InvalidBoc(String),
    #[error("Unsupported cell: {0}")]
    UnsupportedCell(String),
    #[error("Cell overflow: {0}")]
    CellOverflow(String),
    #[error("Cell underflow")]
    CellUnderflow,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

pub type TonCodecResult<T> = Result<T, TonCodecError>;
