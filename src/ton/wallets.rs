use crate::ton::{cell::Cell, state_init::StateInit, TonCodecResult};

/// Where a wallet contract keeps its owner's public key inside the data cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletDataLayout {
    /// `seqno:uint32 public_key:bits256` (v1, v2)
    SeqnoKey,
    /// `seqno:uint32 subwallet_id:uint32 public_key:bits256 ...` (v3, v4)
    SeqnoSubwalletKey,
    /// `is_signature_allowed:bool seqno:uint32 wallet_id:uint32 public_key:bits256 ...` (v5)
    SignatureFlagSeqnoWalletIdKey,
}

impl WalletDataLayout {
    pub fn read_public_key(&self, data: &Cell) -> TonCodecResult<[u8; 32]> {
        let mut slice = data.parser();
        match self {
            WalletDataLayout::SeqnoKey => slice.skip_bits(32)?,
            WalletDataLayout::SeqnoSubwalletKey => slice.skip_bits(64)?,
            WalletDataLayout::SignatureFlagSeqnoWalletIdKey => slice.skip_bits(65)?,
        }
        slice.load_bytes::<32>()
    }
}

#[derive(Debug, Clone)]
pub struct KnownWallet {
    pub name: &'static str,
    pub code_hash: [u8; 32],
    pub layout: WalletDataLayout,
}

const STANDARD_WALLETS: &[(&str, &str, WalletDataLayout)] = &[
    (
        "v1r1",
        "a0cfc2c48aee16a271f2cfc0b7382d81756cecb1017d077faaab3bb602f6868c",
        WalletDataLayout::SeqnoKey,
    ),
    (
        "v1r2",
        "d4902fcc9fad74698fa8e353220a68da0dcf72e32bcb2eb9ee04217c17d3062c",
        WalletDataLayout::SeqnoKey,
    ),
    (
        "v1r3",
        "587cc789eff1c84f46ec3797e45fc809a14ff5ae24f1e0c7a6a99cc9dc9061ff",
        WalletDataLayout::SeqnoKey,
    ),
    (
        "v2r1",
        "5c9a5e68c108e18721a07c42f9956bfb39ad77ec6d624b60c576ec88eee65329",
        WalletDataLayout::SeqnoKey,
    ),
    (
        "v2r2",
        "fe9530d3243853083ef2ef0b4c2908c0abf6fa1c31ea243aacaa5bf8c7d753f1",
        WalletDataLayout::SeqnoKey,
    ),
    (
        "v3r1",
        "b61041a58a7980b946e8fb9e198e3c904d24799ffa36574ea4251c41a566f581",
        WalletDataLayout::SeqnoSubwalletKey,
    ),
    (
        "v3r2",
        "84dafa449f98a6987789ba232358072bc0f76dc4524002a5d0918b9a75d2d599",
        WalletDataLayout::SeqnoSubwalletKey,
    ),
    (
        "v4r1",
        "64dd54805522c5be8a9db59cea0105ccf0d08786ca79beb8cb79e880a8d7322d",
        WalletDataLayout::SeqnoSubwalletKey,
    ),
    (
        "v4r2",
        "feb5ff6820e2ff0d9483e7e0d62c817d846789fb4ae580c878866d959dabd5c0",
        WalletDataLayout::SeqnoSubwalletKey,
    ),
    (
        "v5r1",
        "20834b7b72b112147e1b2fb457b84e74d1a30f04f737d4f62a668e9552d2b72f",
        WalletDataLayout::SignatureFlagSeqnoWalletIdKey,
    ),
];

/// Registry of wallet contracts whose state-init carries the owner key at a known position.
#[derive(Debug, Clone)]
pub struct KnownWallets {
    wallets: Vec<KnownWallet>,
}

impl Default for KnownWallets {
    fn default() -> Self {
        let wallets = STANDARD_WALLETS
            .iter()
            .filter_map(|(name, hash, layout)| {
                let code_hash: [u8; 32] = hex::decode(hash).ok()?.try_into().ok()?;
                Some(KnownWallet {
                    name: *name,
                    code_hash,
                    layout: *layout,
                })
            })
            .collect();

        Self { wallets }
    }
}

impl KnownWallets {
    pub fn new(wallets: Vec<KnownWallet>) -> Self {
        Self { wallets }
    }

    pub fn with(mut self, wallet: KnownWallet) -> Self {
        self.wallets.push(wallet);
        self
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    pub fn identify(&self, code: &Cell) -> Option<&KnownWallet> {
        let hash = code.hash();
        self.wallets.iter().find(|w| w.code_hash == hash)
    }

    /// Public key embedded in the state-init, if its code is a known wallet and the data
    /// cell matches that wallet's layout.
    pub fn try_parse_public_key(&self, state_init: &StateInit) -> Option<[u8; 32]> {
        let code = state_init.code.as_ref()?;
        let data = state_init.data.as_ref()?;
        let wallet = self.identify(code)?;

        match wallet.layout.read_public_key(data) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::debug!(wallet = wallet.name, error = %e, "Known wallet code with unreadable data");
                None
            }
        }
    }
}
