use std::sync::Arc;

use async_trait::async_trait;

use crate::ton::{KnownWallets, StateInit, TonAddress};

/// Somewhere a wallet's 32-byte Ed25519 public key can be looked up.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PublicKeySource: Send + Sync {
    async fn resolve_public_key(&self, address: &TonAddress, state_init: &StateInit) -> Option<[u8; 32]>;
}

/// Reads the key straight out of the data cell of a recognised wallet contract.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedKeySource {
    wallets: KnownWallets,
}

impl EmbeddedKeySource {
    pub fn new(wallets: KnownWallets) -> Self {
        Self { wallets }
    }
}

#[async_trait]
impl PublicKeySource for EmbeddedKeySource {
    async fn resolve_public_key(&self, _address: &TonAddress, state_init: &StateInit) -> Option<[u8; 32]> {
        self.wallets.try_parse_public_key(state_init)
    }
}

/// Asks each source in order; the first one that returns a key wins.
#[derive(Clone, Default)]
pub struct FirstMatch {
    sources: Vec<Arc<dyn PublicKeySource>>,
}

impl FirstMatch {
    pub fn new(sources: Vec<Arc<dyn PublicKeySource>>) -> Self {
        Self { sources }
    }

    pub fn then(mut self, source: Arc<dyn PublicKeySource>) -> Self {
        self.sources.push(source);
        self
    }
}

#[async_trait]
impl PublicKeySource for FirstMatch {
    async fn resolve_public_key(&self, address: &TonAddress, state_init: &StateInit) -> Option<[u8; 32]> {
        for source in &self.sources {
            if let Some(key) = source.resolve_public_key(address, state_init).await {
                return Some(key);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ton::{Cell, CellBuilder, KnownWallet, WalletDataLayout};

    fn state_init_with_key(key: [u8; 32]) -> (StateInit, KnownWallets) {
        let mut code = CellBuilder::new();
        code.store_bytes(b"test wallet code").unwrap();
        let code = Arc::new(code.build().unwrap());

        let mut data = CellBuilder::new();
        data.store_uint(0, 32).unwrap().store_bytes(&key).unwrap();

        let wallets = KnownWallets::default().with(KnownWallet {
            name: "test",
            code_hash: code.hash(),
            layout: WalletDataLayout::SeqnoKey,
        });

        (StateInit::new(code, Arc::new(data.build().unwrap())), wallets)
    }

    fn address() -> TonAddress {
        TonAddress::new(0, [1u8; 32])
    }

    #[tokio::test]
    async fn embedded_source_reads_known_wallet_key() {
        let (init, wallets) = state_init_with_key([3u8; 32]);

        let key = EmbeddedKeySource::new(wallets).resolve_public_key(&address(), &init).await;
        assert_eq!(key, Some([3u8; 32]));

        let unknown = StateInit::new(Arc::new(Cell::empty()), Arc::new(Cell::empty()));
        let key = EmbeddedKeySource::default().resolve_public_key(&address(), &unknown).await;
        assert_eq!(key, None);
    }

    #[tokio::test]
    async fn first_match_stops_at_first_key() {
        let (init, wallets) = state_init_with_key([3u8; 32]);

        let mut fallback = MockPublicKeySource::new();
        fallback.expect_resolve_public_key().never();

        let chain = FirstMatch::default()
            .then(Arc::new(EmbeddedKeySource::new(wallets)))
            .then(Arc::new(fallback));

        assert_eq!(chain.resolve_public_key(&address(), &init).await, Some([3u8; 32]));
    }

    #[tokio::test]
    async fn first_match_falls_through_to_next_source() {
        let unknown = StateInit::new(Arc::new(Cell::empty()), Arc::new(Cell::empty()));

        let mut fallback = MockPublicKeySource::new();
        fallback
            .expect_resolve_public_key()
            .times(1)
            .returning(|_, _| Some([8u8; 32]));

        let chain = FirstMatch::new(vec![Arc::new(EmbeddedKeySource::default()), Arc::new(fallback)]);

        assert_eq!(chain.resolve_public_key(&address(), &unknown).await, Some([8u8; 32]));
        assert_eq!(FirstMatch::default().resolve_public_key(&address(), &unknown).await, None);
    }
}
