//! Per-batch account identity.
//!
//! Every address touched by a batch resolves to exactly one shared
//! [`Account`] instance, either loaded from the store or created on the spot.
//! The arena lives for one batch and is dropped after commit.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::error::{DomainError, DomainResult, StorageResult};
use crate::models::{Account, Transfer, TransferEvent};
use crate::ports::AccountRepository;

/// Accounts of one batch keyed by address.
#[derive(Debug, Default)]
pub struct AccountArena {
    accounts: BTreeMap<String, Arc<Account>>,
    created: usize,
}

impl AccountArena {
    /// Shared instance for `id`.
    pub fn get(&self, id: &str) -> Option<&Arc<Account>> {
        self.accounts.get(id)
    }

    /// All accounts, ordered by id.
    pub fn accounts(&self) -> Vec<Arc<Account>> {
        self.accounts.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Number of accounts that did not exist in the store.
    pub fn created(&self) -> usize {
        self.created
    }

    /// Resolve the endpoints of every record through the arena.
    ///
    /// A miss means the arena was not built from these records and is
    /// reported as [`DomainError::Internal`].
    pub fn build_transfers(&self, events: Vec<TransferEvent>) -> DomainResult<Vec<Transfer>> {
        events
            .into_iter()
            .map(|event| {
                let from = self.resolve(&event.from)?;
                let to = self.resolve(&event.to)?;
                Ok(Transfer {
                    id: event.id,
                    block_number: event.block_number,
                    block_hash: event.block_hash,
                    timestamp: event.timestamp,
                    extrinsic_hash: event.extrinsic_hash,
                    from,
                    to,
                    amount: event.amount,
                    fee: event.fee,
                    kind: event.kind,
                    remark: event.remark,
                    vesting_duration_blocks: event.vesting_duration_blocks,
                })
            })
            .collect()
    }

    fn resolve(&self, id: &str) -> DomainResult<Arc<Account>> {
        self.accounts
            .get(id)
            .cloned()
            .ok_or_else(|| DomainError::Internal(format!("account {} missing from batch arena", id)))
    }
}

/// Build the arena for `events`.
///
/// Existing accounts are fetched in one round trip and kept as stored; the
/// rest get a bare [`Account`].
pub async fn materialize_accounts(
    repo: &dyn AccountRepository,
    events: &[TransferEvent],
) -> StorageResult<AccountArena> {
    let ids: BTreeSet<&str> = events
        .iter()
        .flat_map(|e| [e.from.as_str(), e.to.as_str()])
        .collect();

    let mut arena = AccountArena::default();
    if ids.is_empty() {
        return Ok(arena);
    }

    let wanted: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    for account in repo.find_accounts(&wanted).await? {
        arena.accounts.insert(account.id.clone(), Arc::new(account));
    }

    for id in ids {
        if !arena.accounts.contains_key(id) {
            arena.accounts.insert(id.to_string(), Arc::new(Account::new(id)));
            arena.created += 1;
        }
    }

    debug!(
        accounts = arena.len(),
        created = arena.created,
        "Accounts materialized"
    );
    Ok(arena)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::models::{BlockHash, TransferKind};

    #[derive(Default)]
    struct FakeAccounts {
        stored: Vec<Account>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl AccountRepository for FakeAccounts {
        async fn find_accounts(&self, ids: &[String]) -> StorageResult<Vec<Account>> {
            self.calls.lock().unwrap().push(ids.to_vec());
            Ok(self
                .stored
                .iter()
                .filter(|a| ids.contains(&a.id))
                .cloned()
                .collect())
        }
    }

    fn event(id: &str, from: &str, to: &str) -> TransferEvent {
        TransferEvent {
            id: id.into(),
            block_number: 1,
            block_hash: BlockHash([0; 32]),
            timestamp: DateTime::<Utc>::from_timestamp_millis(0).unwrap(),
            extrinsic_hash: None,
            from: from.into(),
            to: to.into(),
            amount: 1,
            fee: Some(0),
            kind: TransferKind::Transfer,
            remark: None,
            vesting_duration_blocks: None,
        }
    }

    // Test critique: deux transferts touchant X partagent la même instance
    #[tokio::test]
    async fn test_shared_instance_per_address() {
        let repo = FakeAccounts::default();
        let events = vec![event("1", "X", "Y"), event("2", "Z", "X")];

        let arena = materialize_accounts(&repo, &events).await.unwrap();
        assert_eq!(arena.len(), 3);
        assert_eq!(arena.created(), 3);

        let transfers = arena.build_transfers(events).unwrap();
        assert!(Arc::ptr_eq(&transfers[0].from, &transfers[1].to));
        assert_eq!(transfers[0].from.id, "X");
    }

    #[tokio::test]
    async fn test_existing_accounts_are_not_recreated() {
        let repo = FakeAccounts {
            stored: vec![Account::new("X")],
            ..Default::default()
        };

        let arena = materialize_accounts(&repo, &[event("1", "X", "Y")])
            .await
            .unwrap();
        assert_eq!(arena.created(), 1);
        assert_eq!(arena.get("X").unwrap().as_ref(), &Account::new("X"));

        // Une seule requête groupée, sans doublons
        let calls = repo.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec!["X".to_string(), "Y".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_the_store() {
        let repo = FakeAccounts::default();
        let arena = materialize_accounts(&repo, &[]).await.unwrap();
        assert!(arena.is_empty());
        assert!(repo.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_endpoint_is_internal_error() {
        let arena = AccountArena::default();
        let err = arena.build_transfers(vec![event("1", "X", "Y")]).unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
    }
}
