//! Content-addressed contract storage on SQLite.
//!
//! Contracts are keyed by the Keccak-256 of their runtime code; instances map
//! chain addresses (and their balances) onto that content hash, so every
//! address sharing a deployment shows up under one match.

use crate::query::Query;
use argus_core::keccak256;
use argus_utils::errors::DbError;
use num_bigint::BigUint;
use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS contracts (
    code_hash TEXT PRIMARY KEY,
    code      BLOB NOT NULL
);
CREATE TABLE IF NOT EXISTS instances (
    address   TEXT PRIMARY KEY,
    code_hash TEXT NOT NULL REFERENCES contracts(code_hash),
    balance   TEXT NOT NULL
);
";

/// One search hit: a content hash plus every stored address sharing it whose
/// balance passed the query.
#[derive(Clone, Debug)]
pub struct Match {
    pub code_hash: String,
    pub instances: Vec<(String, BigUint)>,
}

/// Handle on the persistent database under a root directory.
pub struct ContractStorage {
    conn: Connection,
}

fn db_err(e: rusqlite::Error) -> DbError {
    DbError::Storage(e.to_string())
}

impl ContractStorage {
    /// Opens (creating if needed) `contracts.db` under `root`.
    pub fn open(root: &Path) -> Result<Self, DbError> {
        fs::create_dir_all(root)
            .map_err(|e| DbError::Storage(format!("could not create '{}': {e}", root.display())))?;
        let conn = Connection::open(root.join("contracts.db")).map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Stores a contract body, returning its content hash. Idempotent.
    pub fn save_contract(&self, code: &[u8]) -> Result<String, DbError> {
        let code_hash = hex::encode(keccak256(code));
        self.conn
            .execute(
                "INSERT OR IGNORE INTO contracts (code_hash, code) VALUES (?1, ?2)",
                params![code_hash, code],
            )
            .map_err(db_err)?;
        Ok(code_hash)
    }

    /// Records (or refreshes) an on-chain instance of a stored contract.
    pub fn add_instance(
        &self,
        address: &str,
        code_hash: &str,
        balance: &BigUint,
    ) -> Result<(), DbError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO instances (address, code_hash, balance) \
                 VALUES (?1, ?2, ?3)",
                params![address, code_hash, balance.to_string()],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// Parses `expr` and emits every match through `emit`, returning the hit
    /// count. A malformed expression fails before anything is emitted.
    pub fn search(&self, expr: &str, mut emit: impl FnMut(&Match)) -> Result<usize, DbError> {
        let query = Query::parse(expr)?;
        let mut stmt = self
            .conn
            .prepare("SELECT code_hash, code FROM contracts ORDER BY code_hash")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })
            .map_err(db_err)?;

        let mut hits = 0;
        for row in rows {
            let (code_hash, code) = row.map_err(db_err)?;
            if !query.matches_code(&code) {
                continue;
            }
            let instances = self.instances_of(&code_hash, &query)?;
            // A hit needs at least one address with a passing balance.
            if instances.is_empty() {
                continue;
            }
            hits += 1;
            emit(&Match {
                code_hash,
                instances,
            });
        }
        tracing::debug!("search matched {hits} contracts");
        Ok(hits)
    }

    fn instances_of(
        &self,
        code_hash: &str,
        query: &Query,
    ) -> Result<Vec<(String, BigUint)>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT address, balance FROM instances WHERE code_hash = ?1 ORDER BY address")
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![code_hash], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(db_err)?;

        let mut instances = Vec::new();
        for row in rows {
            let (address, raw) = row.map_err(db_err)?;
            let balance = BigUint::parse_bytes(raw.as_bytes(), 10)
                .unwrap_or_else(|| BigUint::from(0u8));
            if query.matches_balance(&balance) {
                instances.push((address, balance));
            }
        }
        Ok(instances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn erc20ish_code() -> Vec<u8> {
        // Contains a PUSH4 of the transfer selector, as a dispatcher would.
        hex::decode("600063a9059cbb1457005b00").unwrap()
    }

    #[test]
    fn save_is_idempotent_and_searchable_by_selector() {
        let dir = tempdir().unwrap();
        let storage = ContractStorage::open(dir.path()).unwrap();

        let hash1 = storage.save_contract(&erc20ish_code()).unwrap();
        let hash2 = storage.save_contract(&erc20ish_code()).unwrap();
        assert_eq!(hash1, hash2);

        storage
            .add_instance("0xaaaa", &hash1, &BigUint::from(5u8))
            .unwrap();
        storage
            .add_instance("0xbbbb", &hash1, &BigUint::from(0u8))
            .unwrap();

        let mut matches = Vec::new();
        let hits = storage
            .search("func#transfer(address,uint256)#", |m| {
                matches.push(m.clone())
            })
            .unwrap();
        assert_eq!(hits, 1);
        assert_eq!(matches[0].code_hash, hash1);
        assert_eq!(matches[0].instances.len(), 2);
    }

    #[test]
    fn balance_constraints_filter_instances() {
        let dir = tempdir().unwrap();
        let storage = ContractStorage::open(dir.path()).unwrap();
        let hash = storage.save_contract(&erc20ish_code()).unwrap();
        storage
            .add_instance("0xaaaa", &hash, &BigUint::from(5u8))
            .unwrap();
        storage
            .add_instance("0xbbbb", &hash, &BigUint::from(0u8))
            .unwrap();

        let mut matches = Vec::new();
        let hits = storage
            .search("code#63a9059cbb# and bal>0", |m| matches.push(m.clone()))
            .unwrap();
        assert_eq!(hits, 1);
        assert_eq!(
            matches[0].instances,
            vec![("0xaaaa".to_string(), BigUint::from(5u8))]
        );

        // No instance passes: the contract is not a hit at all.
        let hits = storage.search("bal>1000000", |_| {}).unwrap();
        assert_eq!(hits, 0);
    }

    #[test]
    fn malformed_expression_fails_before_emitting() {
        let dir = tempdir().unwrap();
        let storage = ContractStorage::open(dir.path()).unwrap();
        let mut emitted = 0;
        let result = storage.search("gibberish", |_| emitted += 1);
        assert!(matches!(result, Err(DbError::Syntax(_))));
        assert_eq!(emitted, 0);
    }

    #[test]
    fn non_matching_code_is_skipped() {
        let dir = tempdir().unwrap();
        let storage = ContractStorage::open(dir.path()).unwrap();
        let hash = storage.save_contract(&[0x60, 0x01]).unwrap();
        storage
            .add_instance("0xaaaa", &hash, &BigUint::from(1u8))
            .unwrap();
        let hits = storage.search("code#ff#", |_| {}).unwrap();
        assert_eq!(hits, 0);
    }
}
