//! Receipt and event tracking for broadcast transactions.
//!
//! A [`TransactionWatcher`] follows one transaction hash. It polls for the
//! receipt, then consumes a log subscription for the event signatures it was
//! asked to watch. Each observed event is removed from the pending set; once
//! the set is empty the subscription is dropped and the watcher stops.
//!
//! Notifications for one watcher are delivered in order over a single
//! channel, so consumers never see two of them concurrently.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use exchange_core::api::NodeClient;
use exchange_core::types::{Log, TransactionReceipt};
use exchange_core::{Error, Result};
use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Capacity of the per-watcher notification channel.
const NOTIFICATION_BUFFER: usize = 64;

/// Lifecycle of a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStatus {
    Pending,
    ReceiptReceived,
    EventReceived,
    Stopped,
}

/// What a watcher is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchState {
    tx_hash: B256,
    pending_events: BTreeSet<B256>,
    events_armed: bool,
    status: WatchStatus,
}

impl WatchState {
    pub fn new(tx_hash: B256) -> Self {
        Self {
            tx_hash,
            pending_events: BTreeSet::new(),
            events_armed: false,
            status: WatchStatus::Pending,
        }
    }

    pub fn tx_hash(&self) -> B256 {
        self.tx_hash
    }

    pub fn pending_events(&self) -> &BTreeSet<B256> {
        &self.pending_events
    }

    pub fn status(&self) -> WatchStatus {
        self.status
    }

    pub fn is_stopped(&self) -> bool {
        self.status == WatchStatus::Stopped
    }

    /// Whether events are being tracked and at least one is still pending.
    pub fn is_watching_events(&self) -> bool {
        self.events_armed && !self.pending_events.is_empty()
    }

    /// Set the event signatures to watch.
    ///
    /// The set can be given once; later calls leave it untouched and return
    /// `false`. An empty set watches no events.
    pub fn start_watching(&mut self, events: impl IntoIterator<Item = B256>) -> bool {
        if self.events_armed || self.is_stopped() {
            return false;
        }
        self.pending_events.extend(events);
        self.events_armed = !self.pending_events.is_empty();
        self.events_armed
    }

    /// Remove event signatures from the pending set.
    ///
    /// Removing an absent signature is a no-op. Emptying a watched set stops
    /// the watch.
    pub fn stop_watching(&mut self, events: &[B256]) {
        for event in events {
            self.pending_events.remove(event);
        }
        if self.events_armed && self.pending_events.is_empty() {
            self.status = WatchStatus::Stopped;
        }
    }

    fn record_receipt(&mut self) {
        if !self.is_stopped() {
            self.status = WatchStatus::ReceiptReceived;
        }
    }

    /// Match `log` against the pending set, consuming its signature.
    fn observe_log(&mut self, log: &Log) -> Option<B256> {
        if log.transaction_hash.is_some_and(|hash| hash != self.tx_hash) {
            return None;
        }
        let signature = log.event_signature()?;
        if !self.pending_events.contains(&signature) {
            return None;
        }
        self.status = WatchStatus::EventReceived;
        self.stop_watching(&[signature]);
        Some(signature)
    }

    fn stop(&mut self) {
        self.status = WatchStatus::Stopped;
    }
}

/// A notification from a watcher.
#[derive(Debug)]
pub enum WatchNotification {
    /// The transaction was mined. Delivered at most once.
    Receipt(TransactionReceipt),
    /// A watched event was emitted. Delivered once per signature.
    Event { signature: B256, log: Log },
    /// A node query failed; the watcher stops after this.
    Error(Error),
    /// The watcher has stopped. Always the last notification.
    Stopped,
}

/// Callback interface over a watcher's notifications.
#[async_trait]
pub trait WatchObserver: Send + Sync {
    async fn on_receipt(&self, receipt: &TransactionReceipt);

    async fn on_event(&self, signature: B256, log: &Log);

    async fn on_error(&self, _error: &Error) {}
}

enum WatchCommand {
    StopWatching(Vec<B256>),
    Stop,
}

/// Cloneable control side of a running watcher.
#[derive(Debug, Clone)]
pub struct WatchControl {
    tx_hash: B256,
    commands: mpsc::UnboundedSender<WatchCommand>,
    state: watch::Receiver<WatchState>,
}

impl std::fmt::Debug for WatchCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchCommand::StopWatching(events) => write!(f, "StopWatching({})", events.len()),
            WatchCommand::Stop => write!(f, "Stop"),
        }
    }
}

impl WatchControl {
    pub fn tx_hash(&self) -> B256 {
        self.tx_hash
    }

    /// Snapshot of the watcher's state.
    pub fn state(&self) -> WatchState {
        self.state.borrow().clone()
    }

    /// Stop watching `events`. Idempotent.
    pub fn stop_watching(&self, events: Vec<B256>) {
        // The watcher may already have stopped; nothing is left to remove then.
        let _ = self.commands.send(WatchCommand::StopWatching(events));
    }

    /// Stop the watcher entirely.
    pub fn stop(&self) {
        let _ = self.commands.send(WatchCommand::Stop);
    }

    /// Wait until the watcher has stopped and return its final state.
    pub async fn stopped(&mut self) -> WatchState {
        let _ = self.state.wait_for(WatchState::is_stopped).await;
        self.state()
    }
}

/// Handle to a spawned watcher: control plus the notification stream.
///
/// Dropping every handle and control stops the watcher.
#[derive(Debug)]
pub struct WatchHandle {
    control: WatchControl,
    notifications: mpsc::Receiver<WatchNotification>,
}

impl WatchHandle {
    pub fn tx_hash(&self) -> B256 {
        self.control.tx_hash()
    }

    pub fn state(&self) -> WatchState {
        self.control.state()
    }

    pub fn control(&self) -> WatchControl {
        self.control.clone()
    }

    pub fn stop_watching(&self, events: Vec<B256>) {
        self.control.stop_watching(events);
    }

    pub fn stop(&self) {
        self.control.stop();
    }

    /// Next notification, or `None` once the watcher is gone.
    pub async fn next(&mut self) -> Option<WatchNotification> {
        self.notifications.recv().await
    }

    /// Deliver every notification to each observer in turn until the watcher
    /// stops, then return the final state.
    pub async fn dispatch(mut self, observers: Vec<Arc<dyn WatchObserver>>) -> WatchState {
        while let Some(notification) = self.notifications.recv().await {
            match &notification {
                WatchNotification::Receipt(receipt) => {
                    for observer in &observers {
                        observer.on_receipt(receipt).await;
                    }
                }
                WatchNotification::Event { signature, log } => {
                    for observer in &observers {
                        observer.on_event(*signature, log).await;
                    }
                }
                WatchNotification::Error(error) => {
                    for observer in &observers {
                        observer.on_error(error).await;
                    }
                }
                WatchNotification::Stopped => break,
            }
        }
        self.control.state()
    }
}

/// Channels shared between a running watcher and its handle.
struct Session {
    notifications: mpsc::Sender<WatchNotification>,
    commands: mpsc::UnboundedReceiver<WatchCommand>,
    state: watch::Sender<WatchState>,
}

impl Session {
    fn publish(&self, state: &WatchState) {
        self.state.send_replace(state.clone());
    }

    /// Returns `false` once nobody is listening.
    async fn deliver(&self, notification: WatchNotification) -> bool {
        self.notifications.send(notification).await.is_ok()
    }
}

/// Tracks one broadcast transaction until its receipt and events arrive.
pub struct TransactionWatcher {
    node: Arc<dyn NodeClient>,
    contract: Option<Address>,
    poll_interval: Duration,
    state: WatchState,
}

impl TransactionWatcher {
    /// Watch `tx_hash`; event logs are filtered to `contract` when given.
    pub fn new(
        node: Arc<dyn NodeClient>,
        tx_hash: B256,
        contract: Option<Address>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            node,
            contract,
            poll_interval,
            state: WatchState::new(tx_hash),
        }
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    /// See [`WatchState::start_watching`].
    pub fn start_watching(&mut self, events: impl IntoIterator<Item = B256>) -> bool {
        self.state.start_watching(events)
    }

    /// See [`WatchState::stop_watching`].
    pub fn stop_watching(&mut self, events: &[B256]) {
        self.state.stop_watching(events);
    }

    /// Run the watcher on the tokio runtime.
    pub fn spawn(self) -> WatchHandle {
        let (notify_tx, notify_rx) = mpsc::channel(NOTIFICATION_BUFFER);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(self.state.clone());

        let control = WatchControl {
            tx_hash: self.state.tx_hash(),
            commands: command_tx,
            state: state_rx,
        };

        let session = Session {
            notifications: notify_tx,
            commands: command_rx,
            state: state_tx,
        };
        tokio::spawn(self.run(session));

        WatchHandle {
            control,
            notifications: notify_rx,
        }
    }

    async fn run(mut self, mut session: Session) {
        let tx_hash = self.state.tx_hash();
        info!(
            tx_hash = %tx_hash,
            events = self.state.pending_events().len(),
            "Watching transaction"
        );

        if let Err(e) = self.watch(&mut session).await {
            warn!(tx_hash = %tx_hash, error = %e, "Watch failed");
            self.state.stop();
            session.publish(&self.state);
            session.deliver(WatchNotification::Error(e)).await;
        }

        self.state.stop();
        session.publish(&self.state);
        session.deliver(WatchNotification::Stopped).await;
        info!(tx_hash = %tx_hash, "Stopped watching transaction");
    }

    async fn watch(&mut self, session: &mut Session) -> Result<()> {
        if self.state.is_stopped() {
            return Ok(());
        }

        let logs = if self.state.is_watching_events() {
            let signatures = self.state.pending_events().iter().copied().collect();
            Some(self.node.subscribe_logs(self.contract, signatures).await?)
        } else {
            None
        };

        if !self.await_receipt(session).await? {
            return Ok(());
        }

        let Some(mut logs) = logs else {
            return Ok(());
        };

        while self.state.is_watching_events() {
            tokio::select! {
                command = session.commands.recv() => {
                    if !self.apply(command, session) {
                        return Ok(());
                    }
                }
                item = logs.next() => match item {
                    Some(Ok(log)) => {
                        let Some(signature) = self.state.observe_log(&log) else {
                            continue;
                        };
                        debug!(tx_hash = %self.state.tx_hash(), event = %signature, "Event observed");
                        session.publish(&self.state);
                        if !session.deliver(WatchNotification::Event { signature, log }).await {
                            return Ok(());
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        warn!(tx_hash = %self.state.tx_hash(), "Log subscription ended");
                        return Ok(());
                    }
                },
            }
        }
        Ok(())
    }

    /// Poll until the receipt arrives. Returns `false` if the watch stopped first.
    async fn await_receipt(&mut self, session: &mut Session) -> Result<bool> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                command = session.commands.recv() => {
                    if !self.apply(command, session) {
                        return Ok(false);
                    }
                }
                _ = ticker.tick() => {
                    let Some(receipt) = self.node.get_receipt(self.state.tx_hash()).await? else {
                        debug!(tx_hash = %self.state.tx_hash(), "Receipt pending");
                        continue;
                    };
                    info!(
                        tx_hash = %self.state.tx_hash(),
                        block_number = receipt.block_number,
                        success = receipt.succeeded(),
                        "Receipt received"
                    );
                    self.state.record_receipt();
                    session.publish(&self.state);
                    return Ok(session.deliver(WatchNotification::Receipt(receipt)).await);
                }
            }
        }
    }

    /// Apply a command. Returns `false` when the watch should end.
    fn apply(&mut self, command: Option<WatchCommand>, session: &Session) -> bool {
        match command {
            Some(WatchCommand::StopWatching(events)) => {
                self.state.stop_watching(&events);
                session.publish(&self.state);
                !self.state.is_stopped()
            }
            Some(WatchCommand::Stop) | None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;
    use exchange_core::api::LogStream;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const EVENT_A: B256 = B256::repeat_byte(0xa1);
    const EVENT_B: B256 = B256::repeat_byte(0xb2);

    fn tx_hash() -> B256 {
        B256::repeat_byte(0x77)
    }

    fn receipt() -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: tx_hash(),
            block_hash: B256::repeat_byte(0x01),
            block_number: 100,
            gas_used: 50_000,
            status: Some(1),
            logs: Vec::new(),
        }
    }

    fn log(signature: B256, tx: B256) -> Log {
        Log {
            address: Address::repeat_byte(0x61),
            topics: vec![signature],
            data: Bytes::new(),
            block_number: Some(100),
            transaction_hash: Some(tx),
            log_index: Some(0),
        }
    }

    /// Node with scripted receipt answers and a channel-backed log feed.
    struct ScriptedNode {
        receipts: Mutex<VecDeque<Result<Option<TransactionReceipt>>>>,
        logs: Mutex<Option<mpsc::UnboundedReceiver<Result<Log>>>>,
        subscriptions: AtomicUsize,
    }

    impl ScriptedNode {
        fn new(
            receipts: Vec<Result<Option<TransactionReceipt>>>,
        ) -> (Arc<Self>, mpsc::UnboundedSender<Result<Log>>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let node = Arc::new(Self {
                receipts: Mutex::new(receipts.into()),
                logs: Mutex::new(Some(rx)),
                subscriptions: AtomicUsize::new(0),
            });
            (node, tx)
        }

        fn subscriptions(&self) -> usize {
            self.subscriptions.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NodeClient for ScriptedNode {
        async fn get_nonce(&self, _address: Address) -> Result<u64> {
            Ok(0)
        }

        async fn send_raw_transaction(&self, _raw: &[u8]) -> Result<B256> {
            Ok(tx_hash())
        }

        async fn get_receipt(&self, _tx_hash: B256) -> Result<Option<TransactionReceipt>> {
            // An exhausted script keeps reporting "pending".
            self.receipts.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }

        async fn subscribe_logs(
            &self,
            _address: Option<Address>,
            _event_signatures: Vec<B256>,
        ) -> Result<LogStream> {
            self.subscriptions.fetch_add(1, Ordering::SeqCst);
            let rx = self
                .logs
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| Error::node_query("already subscribed"))?;
            Ok(futures_util::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed())
        }
    }

    fn watcher(node: Arc<ScriptedNode>) -> TransactionWatcher {
        TransactionWatcher::new(
            node,
            tx_hash(),
            Some(Address::repeat_byte(0x61)),
            Duration::from_millis(1),
        )
    }

    #[test]
    fn test_stop_watching_is_idempotent() {
        let mut state = WatchState::new(tx_hash());
        assert!(state.start_watching([EVENT_A, EVENT_B]));

        state.stop_watching(&[EVENT_A]);
        state.stop_watching(&[EVENT_A]);
        assert_eq!(state.pending_events().len(), 1);
        assert!(state.pending_events().contains(&EVENT_B));
        assert!(!state.is_stopped());

        state.stop_watching(&[EVENT_B]);
        assert!(state.is_stopped());
        state.stop_watching(&[EVENT_B]);
        assert!(state.is_stopped());
    }

    #[test]
    fn test_event_set_is_never_replaced() {
        let mut state = WatchState::new(tx_hash());
        assert!(state.start_watching([EVENT_A]));
        assert!(!state.start_watching([EVENT_B]));
        assert_eq!(
            state.pending_events().iter().copied().collect::<Vec<_>>(),
            vec![EVENT_A]
        );
    }

    #[test]
    fn test_empty_event_set_watches_receipt_only() {
        let mut state = WatchState::new(tx_hash());
        assert!(!state.start_watching([]));
        assert!(!state.is_watching_events());
        state.stop_watching(&[EVENT_A]);
        assert_eq!(state.status(), WatchStatus::Pending);
    }

    #[test]
    fn test_logs_from_other_transactions_ignored() {
        let mut state = WatchState::new(tx_hash());
        state.start_watching([EVENT_A]);

        assert_eq!(state.observe_log(&log(EVENT_A, B256::repeat_byte(0x99))), None);
        assert_eq!(state.observe_log(&log(EVENT_B, tx_hash())), None);
        assert_eq!(state.observe_log(&log(EVENT_A, tx_hash())), Some(EVENT_A));
        assert!(state.is_stopped());
    }

    #[tokio::test]
    async fn test_events_drain_pending_set_then_stop() {
        let (node, log_tx) = ScriptedNode::new(vec![Ok(None), Ok(Some(receipt()))]);
        let mut watcher = watcher(node.clone());
        watcher.start_watching([EVENT_A, EVENT_B]);
        let mut handle = watcher.spawn();

        assert!(matches!(handle.next().await, Some(WatchNotification::Receipt(_))));
        assert_eq!(handle.state().status(), WatchStatus::ReceiptReceived);

        log_tx.send(Ok(log(EVENT_A, tx_hash()))).unwrap();
        match handle.next().await {
            Some(WatchNotification::Event { signature, .. }) => assert_eq!(signature, EVENT_A),
            other => panic!("expected EventA, got {:?}", other),
        }
        let state = handle.state();
        assert_eq!(state.status(), WatchStatus::EventReceived);
        assert_eq!(
            state.pending_events().iter().copied().collect::<Vec<_>>(),
            vec![EVENT_B]
        );
        assert!(!log_tx.is_closed());

        log_tx.send(Ok(log(EVENT_B, tx_hash()))).unwrap();
        match handle.next().await {
            Some(WatchNotification::Event { signature, .. }) => assert_eq!(signature, EVENT_B),
            other => panic!("expected EventB, got {:?}", other),
        }
        assert!(matches!(handle.next().await, Some(WatchNotification::Stopped)));
        assert!(handle.next().await.is_none());

        let state = handle.state();
        assert!(state.is_stopped());
        assert!(state.pending_events().is_empty());
        assert_eq!(node.subscriptions(), 1);
        // The subscription stream has been dropped.
        assert!(log_tx.is_closed());
    }

    #[tokio::test]
    async fn test_receipt_without_events_skips_subscription() {
        let (node, _log_tx) = ScriptedNode::new(vec![Ok(Some(receipt()))]);
        let mut handle = watcher(node.clone()).spawn();

        match handle.next().await {
            Some(WatchNotification::Receipt(r)) => assert_eq!(r.transaction_hash, tx_hash()),
            other => panic!("expected receipt, got {:?}", other),
        }
        assert!(matches!(handle.next().await, Some(WatchNotification::Stopped)));
        assert_eq!(node.subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_node_error_reported_then_stops() {
        let (node, _log_tx) =
            ScriptedNode::new(vec![Ok(None), Err(Error::node_query("connection reset"))]);
        let mut handle = watcher(node).spawn();

        assert!(matches!(
            handle.next().await,
            Some(WatchNotification::Error(Error::NodeQuery { .. }))
        ));
        assert!(matches!(handle.next().await, Some(WatchNotification::Stopped)));
        assert!(handle.state().is_stopped());
    }

    #[tokio::test]
    async fn test_log_stream_error_stops_watch() {
        let (node, log_tx) = ScriptedNode::new(vec![Ok(Some(receipt()))]);
        let mut watcher = watcher(node);
        watcher.start_watching([EVENT_A]);
        let mut handle = watcher.spawn();

        assert!(matches!(handle.next().await, Some(WatchNotification::Receipt(_))));
        log_tx.send(Err(Error::node_query("filter not found"))).unwrap();
        assert!(matches!(handle.next().await, Some(WatchNotification::Error(_))));
        assert!(matches!(handle.next().await, Some(WatchNotification::Stopped)));
    }

    #[tokio::test]
    async fn test_explicit_stop_before_receipt() {
        let (node, _log_tx) = ScriptedNode::new(vec![]);
        let mut handle = watcher(node).spawn();

        handle.stop();
        assert!(matches!(handle.next().await, Some(WatchNotification::Stopped)));
        assert!(handle.state().is_stopped());
    }

    #[tokio::test]
    async fn test_stopped_before_spawn_never_polls() {
        let (node, _log_tx) = ScriptedNode::new(vec![Ok(Some(receipt()))]);
        let mut watcher = watcher(node.clone());
        watcher.start_watching([EVENT_A]);
        watcher.stop_watching(&[EVENT_A]);
        assert!(watcher.state().is_stopped());
        let mut handle = watcher.spawn();

        assert!(matches!(handle.next().await, Some(WatchNotification::Stopped)));
        assert!(handle.next().await.is_none());
        assert_eq!(node.receipts.lock().unwrap().len(), 1);
        assert_eq!(node.subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_stop_watching_last_event_from_handle() {
        let (node, log_tx) = ScriptedNode::new(vec![Ok(Some(receipt()))]);
        let mut watcher = watcher(node);
        watcher.start_watching([EVENT_A]);
        let mut handle = watcher.spawn();

        assert!(matches!(handle.next().await, Some(WatchNotification::Receipt(_))));
        handle.stop_watching(vec![EVENT_A]);
        handle.stop_watching(vec![EVENT_A]);
        assert!(matches!(handle.next().await, Some(WatchNotification::Stopped)));

        let mut control = handle.control();
        assert!(control.stopped().await.pending_events().is_empty());
        assert!(log_tx.is_closed());
    }

    #[derive(Default)]
    struct RecordingObserver {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl WatchObserver for RecordingObserver {
        async fn on_receipt(&self, receipt: &TransactionReceipt) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("receipt:{}", receipt.block_number));
        }

        async fn on_event(&self, signature: B256, _log: &Log) {
            self.calls.lock().unwrap().push(format!("event:{}", signature));
        }
    }

    #[tokio::test]
    async fn test_dispatch_to_multiple_observers() {
        let (node, log_tx) = ScriptedNode::new(vec![Ok(Some(receipt()))]);
        let mut watcher = watcher(node.clone());
        watcher.start_watching([EVENT_A]);
        let handle = watcher.spawn();

        let first = Arc::new(RecordingObserver::default());
        let second = Arc::new(RecordingObserver::default());
        let observers: Vec<Arc<dyn WatchObserver>> = vec![first.clone(), second.clone()];

        log_tx.send(Ok(log(EVENT_A, tx_hash()))).unwrap();
        let final_state = handle.dispatch(observers).await;

        assert!(final_state.is_stopped());
        let expected = vec!["receipt:100".to_string(), format!("event:{}", EVENT_A)];
        assert_eq!(*first.calls.lock().unwrap(), expected);
        assert_eq!(*second.calls.lock().unwrap(), expected);
        assert_eq!(node.subscriptions(), 1);
    }
}
