//! Sign a 0x order and submit a tracked transaction.
//!
//! Run with:
//! ```
//! RPC_URL=http://127.0.0.1:8545 CHAIN_ID=1337 WALLET_PRIVATE_KEY=0x... \
//!     cargo run --example submit_order
//! ```

use std::sync::Arc;

use alloy_primitives::{B256, U256};
use alloy_signer_local::PrivateKeySigner;
use anyhow::Context;
use async_trait::async_trait;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exchange_core::api::JsonRpcClient;
use exchange_core::config::Config;
use exchange_core::gas::RpcGasProvider;
use exchange_core::signing::{is_valid_signature, OrderSigner, EXCHANGE_V3_ADDRESS};
use exchange_core::types::{Log, TransactionReceipt};
use tx_engine::{Submission, TransactionPipeline, WatchObserver};

const WETH_ASSET_DATA: &str =
    "0xf47261b0000000000000000000000000c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
const DAI_ASSET_DATA: &str =
    "0xf47261b00000000000000000000000006b175474e89094c44da98b954eedeac495271d0f";

struct LoggingObserver;

#[async_trait]
impl WatchObserver for LoggingObserver {
    async fn on_receipt(&self, receipt: &TransactionReceipt) {
        info!(
            tx_hash = %receipt.transaction_hash,
            block_number = receipt.block_number,
            gas_used = receipt.gas_used,
            success = receipt.succeeded(),
            "Receipt"
        );
    }

    async fn on_event(&self, signature: B256, log: &Log) {
        info!(event = %signature, address = %log.address, "Event");
    }

    async fn on_error(&self, error: &exchange_core::Error) {
        warn!(error = %error, "Watch failed");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "submit_order=info,exchange_core=info,tx_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let key: PrivateKeySigner = std::env::var("WALLET_PRIVATE_KEY")
        .context("WALLET_PRIVATE_KEY environment variable not set")?
        .parse()
        .context("WALLET_PRIVATE_KEY is not a valid private key")?;

    let exchange_address = match config.exchange.exchange_address {
        Some(address) => address,
        None => EXCHANGE_V3_ADDRESS.parse()?,
    };

    // Order
    let order_signer = OrderSigner::new(key.clone());
    let order = order_signer
        .order_builder()
        .maker_asset_amount(U256::from(10u64).pow(U256::from(18u64)))
        .taker_asset_amount(U256::from(2_000u64) * U256::from(10u64).pow(U256::from(18u64)))
        .maker_asset_data(WETH_ASSET_DATA)
        .taker_asset_data(DAI_ASSET_DATA)
        .expires_in(3_600)
        .exchange_address(exchange_address)
        .chain_id(config.exchange.chain_id)
        .build()?;

    let signed = order_signer.sign(&order).await?;
    info!(
        maker = %order_signer.address(),
        valid = is_valid_signature(&signed, order_signer.address()),
        "Signed order"
    );
    println!("{}", serde_json::to_string_pretty(&signed)?);

    // Transaction
    let client = JsonRpcClient::from_config(&config.node)?;
    let pipeline = TransactionPipeline::builder()
        .node(Arc::new(client.clone()))
        .signer(Arc::new(key))
        .gas(Arc::new(RpcGasProvider::new(client, &config.gas)))
        .config(&config)
        .build()?;

    let submitted = pipeline
        .submit(
            Submission::new()
                .destination(pipeline.address())
                .value(U256::ZERO)
                .track_receipt(),
        )
        .await?;
    info!(tx_hash = %submitted.tx_hash, nonce = submitted.nonce, "Submitted");

    if let Some(watch) = submitted.watch {
        let observers: Vec<Arc<dyn WatchObserver>> = vec![Arc::new(LoggingObserver)];
        let state = watch.dispatch(observers).await;
        info!(status = ?state.status(), "Watch finished");
    }

    Ok(())
}
