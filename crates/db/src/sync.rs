//! Database synchronization against a node (`--init-db`).
//!
//! Walks blocks from the chain head down to genesis, one blocking call at a
//! time. Every contract-creation transaction is resolved through its receipt
//! to the deployed address, and the contract's code and balance are stored.
//! Zero-balance instances are skipped unless the caller asks for everything.

use crate::storage::ContractStorage;
use argus_chain::NodeClient;
use argus_utils::errors::DbError;
use num_bigint::BigUint;
use serde_json::Value;

/// Runs a full synchronization pass, returning the number of stored
/// instances. No step is retried; the first failure aborts the sync.
pub async fn sync(
    storage: &ContractStorage,
    client: &NodeClient,
    sync_all: bool,
) -> Result<u64, DbError> {
    let head = client.block_number().await?;
    tracing::info!("synchronizing contract database from block {head} down to genesis");

    let mut stored = 0u64;
    for number in (0..=head).rev() {
        let Some(block) = client.block_by_number(number).await? else {
            tracing::debug!("block {number} not available");
            continue;
        };
        let transactions = block
            .get("transactions")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for tx in &transactions {
            // Contract creations carry a null recipient.
            if !tx.get("to").is_some_and(Value::is_null) {
                continue;
            }
            let Some(tx_hash) = tx.get("hash").and_then(Value::as_str) else {
                continue;
            };
            let Some(receipt) = client.transaction_receipt(tx_hash).await? else {
                continue;
            };
            let Some(address) = receipt.get("contractAddress").and_then(Value::as_str) else {
                continue;
            };

            let code = client.code_at(address).await?;
            if code.is_empty() {
                continue;
            }
            let balance = client.balance_of(address).await?;
            if balance == BigUint::from(0u8) && !sync_all {
                tracing::debug!("skipping zero-balance contract {address}");
                continue;
            }

            let code_hash = storage.save_contract(&code)?;
            storage.add_instance(address, &code_hash, &balance)?;
            stored += 1;
            tracing::info!("stored contract {address} (hash {code_hash})");
        }

        if number % 1000 == 0 {
            tracing::info!("processed down to block {number}");
        }
    }
    Ok(stored)
}
