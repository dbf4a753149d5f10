//! Nonce, build, sign and broadcast as one submission.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use exchange_core::api::NodeClient;
use exchange_core::config::Config;
use exchange_core::gas::GasProvider;
use exchange_core::signing::TransactionSigner;
use exchange_core::types::SignedTransaction;
use exchange_core::{Error, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::builder::{ContractInvocation, TransactionBuilder, TxTarget};
use crate::watcher::{TransactionWatcher, WatchHandle};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Stage of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    FetchingNonce,
    Signing,
    Broadcasting,
    Submitted,
    Failed,
}

/// One pass through the pipeline, identified for log correlation.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    id: Uuid,
    state: PipelineState,
    transitions: Vec<PipelineState>,
}

impl PipelineRun {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: PipelineState::Idle,
            transitions: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// States entered after `Idle`, in order.
    pub fn transitions(&self) -> &[PipelineState] {
        &self.transitions
    }

    fn advance(&mut self, next: PipelineState) {
        debug!(run_id = %self.id, from = ?self.state, to = ?next, "Pipeline transition");
        self.state = next;
        self.transitions.push(next);
    }
}

/// What to send and what to watch for afterwards.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    invocation: Option<ContractInvocation>,
    destination: Option<Address>,
    value: U256,
    data: Bytes,
    watch_events: Option<Vec<B256>>,
    track_receipt: bool,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call a contract method. Takes precedence over a raw destination.
    pub fn invocation(mut self, invocation: ContractInvocation) -> Self {
        self.invocation = Some(invocation);
        self
    }

    pub fn destination(mut self, to: Address) -> Self {
        self.destination = Some(to);
        self
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Watch for these event signatures once the transaction is mined.
    pub fn watch_events(mut self, events: impl IntoIterator<Item = B256>) -> Self {
        self.watch_events = Some(events.into_iter().collect());
        self
    }

    /// Watch for the receipt.
    pub fn track_receipt(mut self) -> Self {
        self.track_receipt = true;
        self
    }

    fn target(&self) -> TxTarget {
        match &self.invocation {
            Some(invocation) => TxTarget::Invocation {
                invocation: invocation.clone(),
                value: self.value,
            },
            None => TxTarget::Raw {
                to: self.destination,
                value: self.value,
                data: self.data.clone(),
            },
        }
    }

    fn wants_watch(&self) -> bool {
        self.track_receipt || self.watch_events.is_some()
    }

    fn watch_contract(&self) -> Option<Address> {
        self.invocation
            .as_ref()
            .map(|invocation| invocation.contract)
            .or(self.destination)
    }
}

/// A broadcast transaction.
#[derive(Debug)]
pub struct Submitted {
    pub tx_hash: B256,
    pub nonce: u64,
    pub run: PipelineRun,
    /// Present when the receipt or events were requested.
    pub watch: Option<WatchHandle>,
}

/// Builds, signs and broadcasts transactions for one signer on one chain.
pub struct TransactionPipeline {
    node: Arc<dyn NodeClient>,
    signer: Arc<dyn TransactionSigner>,
    gas: Arc<dyn GasProvider>,
    chain_id: u64,
    poll_interval: Duration,
}

impl std::fmt::Debug for TransactionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionPipeline")
            .field("address", &self.signer.address())
            .field("chain_id", &self.chain_id)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl TransactionPipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Sending account.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Fetch the nonce, build, sign and broadcast.
    ///
    /// Nothing is retried. A failure at any stage ends the run and no later
    /// stage is attempted. When tracking was requested the returned
    /// [`Submitted::watch`] carries the running watcher.
    pub async fn submit(&self, submission: Submission) -> Result<Submitted> {
        let mut run = PipelineRun::new();

        let (tx_hash, nonce) = match self.execute(&mut run, &submission).await {
            Ok(sent) => sent,
            Err(e) => {
                warn!(
                    run_id = %run.id(),
                    stage = ?run.state(),
                    error = %e,
                    "Submission failed"
                );
                run.advance(PipelineState::Failed);
                return Err(e);
            }
        };

        let watch = submission.wants_watch().then(|| {
            let mut watcher = TransactionWatcher::new(
                self.node.clone(),
                tx_hash,
                submission.watch_contract(),
                self.poll_interval,
            );
            if let Some(events) = &submission.watch_events {
                watcher.start_watching(events.iter().copied());
            }
            watcher.spawn()
        });

        run.advance(PipelineState::Submitted);
        info!(run_id = %run.id(), tx_hash = %tx_hash, nonce, "Transaction submitted");

        Ok(Submitted {
            tx_hash,
            nonce,
            run,
            watch,
        })
    }

    /// Fetch the nonce, build and sign without broadcasting.
    pub async fn sign(&self, submission: &Submission) -> Result<SignedTransaction> {
        let mut run = PipelineRun::new();
        self.sign_in(&mut run, submission).await
    }

    /// Broadcast a signed transaction, returning its hash.
    ///
    /// May be called again with the same payload after a failure.
    pub async fn broadcast(&self, signed: &SignedTransaction) -> Result<B256> {
        let tx_hash = self
            .node
            .send_raw_transaction(&signed.raw)
            .await
            .map_err(|e| match e {
                Error::Broadcast { .. } => e,
                other => Error::broadcast(other.to_string()),
            })?;

        if tx_hash != signed.hash {
            warn!(
                expected = %signed.hash,
                reported = %tx_hash,
                "Node reported a different transaction hash"
            );
        }
        Ok(tx_hash)
    }

    async fn execute(&self, run: &mut PipelineRun, submission: &Submission) -> Result<(B256, u64)> {
        let signed = self.sign_in(run, submission).await?;
        let nonce = signed.request.nonce;

        run.advance(PipelineState::Broadcasting);
        let tx_hash = self.broadcast(&signed).await?;
        Ok((tx_hash, nonce))
    }

    async fn sign_in(
        &self,
        run: &mut PipelineRun,
        submission: &Submission,
    ) -> Result<SignedTransaction> {
        let from = self.signer.address();

        run.advance(PipelineState::FetchingNonce);
        let nonce = self.node.get_nonce(from).await.map_err(|e| match e {
            Error::NodeQuery { .. } | Error::Http(_) => e,
            other => Error::node_query(other.to_string()),
        })?;

        let request = TransactionBuilder::new(self.gas.as_ref(), from, self.chain_id)
            .build(&submission.target(), nonce)
            .await?;

        run.advance(PipelineState::Signing);
        self.signer
            .sign_transaction(request)
            .await
            .map_err(|e| match e {
                Error::Signing { .. } => e,
                other => Error::signing(other.to_string()),
            })
    }
}

/// Assembles a [`TransactionPipeline`]; node, signer, gas and chain are required.
#[derive(Default)]
pub struct PipelineBuilder {
    node: Option<Arc<dyn NodeClient>>,
    signer: Option<Arc<dyn TransactionSigner>>,
    gas: Option<Arc<dyn GasProvider>>,
    chain_id: Option<u64>,
    poll_interval: Option<Duration>,
}

impl PipelineBuilder {
    pub fn node(mut self, node: Arc<dyn NodeClient>) -> Self {
        self.node = Some(node);
        self
    }

    pub fn signer(mut self, signer: Arc<dyn TransactionSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn gas(mut self, gas: Arc<dyn GasProvider>) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Take the chain id and poll interval from `config`.
    pub fn config(self, config: &Config) -> Self {
        self.chain_id(config.exchange.chain_id)
            .poll_interval(Duration::from_millis(config.node.poll_interval_ms))
    }

    #[allow(clippy::result_large_err)]
    pub fn build(self) -> Result<TransactionPipeline> {
        Ok(TransactionPipeline {
            node: self.node.ok_or_else(|| missing("node client"))?,
            signer: self.signer.ok_or_else(|| missing("signer"))?,
            gas: self.gas.ok_or_else(|| missing("gas provider"))?,
            chain_id: self.chain_id.ok_or_else(|| missing("chain id"))?,
            poll_interval: self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
        })
    }
}

fn missing(what: &str) -> Error {
    Error::Config {
        message: format!("transaction pipeline requires a {}", what),
    }
}
