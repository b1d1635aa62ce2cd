//! The chain RPC/signing boundary the submission pipeline drives.
//!
//! The settlement contract and the RPC node are external collaborators
//! ; this module only specifies the shape of the calls the
//! pipeline needs. [`EthersChainClient`] is the production implementation
//! against a real JSON-RPC endpoint; [`MockChainClient`] is a
//! deterministic test double used to script the retry/timeout/revert
//! scenarios.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::abi::Address;
use ethers::middleware::SignerMiddleware;
use ethers::prelude::abigen;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{BlockNumber, Bytes, H256};
use parking_lot::Mutex;

/// Mined-transaction outcome, or `None` if the wait timed out (treated
/// as success, not failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// The chain operations one submission attempt needs.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn pending_nonce(&self) -> anyhow::Result<u64>;
    async fn estimate_gas(&self, root: &[u8; 32], fills: &[u8], agg_sig: &[u8]) -> anyhow::Result<u64>;
    async fn gas_price(&self) -> anyhow::Result<u64>;
    async fn chain_id(&self) -> anyhow::Result<u64>;

    #[allow(clippy::too_many_arguments)]
    async fn sign_and_broadcast(
        &self,
        root: [u8; 32],
        fills: Vec<u8>,
        agg_sig: Vec<u8>,
        nonce: u64,
        gas_limit: u64,
        gas_price: u64,
        chain_id: u64,
    ) -> anyhow::Result<String>;

    /// `Ok(None)` means the wait deadline elapsed with no receipt yet.
    async fn wait_for_receipt(
        &self,
        tx_id: &str,
        timeout: Duration,
    ) -> anyhow::Result<Option<ReceiptStatus>>;
}

abigen!(
    SettlementContract,
    r#"[
        function submitBatch(bytes32 root, bytes fills, bytes aggSig) external
    ]"#
);

type SequencerMiddleware = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Production [`ChainClient`] backed by a real JSON-RPC endpoint and a
/// local signing wallet.
pub struct EthersChainClient {
    client: Arc<SequencerMiddleware>,
    contract: SettlementContract<SequencerMiddleware>,
}

impl EthersChainClient {
    pub async fn connect(
        rpc_url: &str,
        private_key: &str,
        contract_address: Address,
    ) -> anyhow::Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)?;
        let chain_id = provider.get_chainid().await?.as_u64();
        let wallet = private_key.parse::<LocalWallet>()?.with_chain_id(chain_id);
        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        let contract = SettlementContract::new(contract_address, client.clone());
        Ok(Self { client, contract })
    }
}

#[async_trait]
impl ChainClient for EthersChainClient {
    async fn pending_nonce(&self) -> anyhow::Result<u64> {
        let address = self.client.address();
        let nonce = self
            .client
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await?;
        Ok(nonce.as_u64())
    }

    async fn estimate_gas(&self, root: &[u8; 32], fills: &[u8], agg_sig: &[u8]) -> anyhow::Result<u64> {
        let call = self.contract.submit_batch(
            *root,
            Bytes::from(fills.to_vec()),
            Bytes::from(agg_sig.to_vec()),
        );
        let gas = call.estimate_gas().await?;
        Ok(gas.as_u64())
    }

    async fn gas_price(&self) -> anyhow::Result<u64> {
        let price = self.client.get_gas_price().await?;
        Ok(price.as_u64())
    }

    async fn chain_id(&self) -> anyhow::Result<u64> {
        Ok(self.client.signer().chain_id())
    }

    async fn sign_and_broadcast(
        &self,
        root: [u8; 32],
        fills: Vec<u8>,
        agg_sig: Vec<u8>,
        nonce: u64,
        gas_limit: u64,
        gas_price: u64,
        _chain_id: u64,
    ) -> anyhow::Result<String> {
        let call = self
            .contract
            .submit_batch(root, Bytes::from(fills), Bytes::from(agg_sig))
            .nonce(nonce)
            .gas(gas_limit)
            .gas_price(gas_price);
        let pending = call.send().await?;
        Ok(format!("{:#x}", pending.tx_hash()))
    }

    async fn wait_for_receipt(
        &self,
        tx_id: &str,
        timeout: Duration,
    ) -> anyhow::Result<Option<ReceiptStatus>> {
        let hash: H256 = tx_id.parse()?;
        let fut = self.client.get_transaction_receipt(hash);
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(Some(receipt))) => {
                let status = receipt.status.map(|s| s.as_u64()).unwrap_or(1);
                Ok(Some(if status == 1 {
                    ReceiptStatus::Success
                } else {
                    ReceiptStatus::Reverted
                }))
            }
            Ok(Ok(None)) => Ok(None),
            Ok(Err(err)) => Err(err.into()),
            Err(_elapsed) => Ok(None),
        }
    }
}

/// A scripted outcome for one broadcast attempt against [`MockChainClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOutcome {
    Success,
    TransientFailure,
    Reverted,
    Timeout,
}

/// Deterministic chain double: pops one [`MockOutcome`] per
/// `sign_and_broadcast` call, defaulting to `Success` once the script is
/// exhausted.
pub struct MockChainClient {
    script: Mutex<VecDeque<MockOutcome>>,
    receipts: Mutex<HashMap<String, MockOutcome>>,
    tx_counter: AtomicU64,
}

impl MockChainClient {
    pub fn new(script: Vec<MockOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            receipts: Mutex::new(HashMap::new()),
            tx_counter: AtomicU64::new(0),
        }
    }

    pub fn always_succeeds() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn pending_nonce(&self) -> anyhow::Result<u64> {
        Ok(0)
    }

    async fn estimate_gas(&self, _root: &[u8; 32], _fills: &[u8], _agg_sig: &[u8]) -> anyhow::Result<u64> {
        Ok(100_000)
    }

    async fn gas_price(&self) -> anyhow::Result<u64> {
        Ok(20_000_000_000)
    }

    async fn chain_id(&self) -> anyhow::Result<u64> {
        Ok(1337)
    }

    async fn sign_and_broadcast(
        &self,
        _root: [u8; 32],
        _fills: Vec<u8>,
        _agg_sig: Vec<u8>,
        _nonce: u64,
        _gas_limit: u64,
        _gas_price: u64,
        _chain_id: u64,
    ) -> anyhow::Result<String> {
        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or(MockOutcome::Success);

        if outcome == MockOutcome::TransientFailure {
            anyhow::bail!("mock transient rpc failure");
        }

        let id = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        let tx_id = format!("0xmock{id:016x}");
        self.receipts.lock().insert(tx_id.clone(), outcome);
        Ok(tx_id)
    }

    async fn wait_for_receipt(
        &self,
        tx_id: &str,
        _timeout: Duration,
    ) -> anyhow::Result<Option<ReceiptStatus>> {
        let outcome = self
            .receipts
            .lock()
            .get(tx_id)
            .copied()
            .unwrap_or(MockOutcome::Success);

        Ok(match outcome {
            MockOutcome::Success => Some(ReceiptStatus::Success),
            MockOutcome::Reverted => Some(ReceiptStatus::Reverted),
            MockOutcome::Timeout => None,
            MockOutcome::TransientFailure => unreachable!("transient failures never reach a receipt"),
        })
    }
}
