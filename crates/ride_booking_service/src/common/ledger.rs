/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;

/// A wallet balance together with its optimistic-concurrency token. The
/// version advances on every committed write to the wallet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VersionedBalance {
    pub amount: Money,
    pub version: u64,
}

/// One balance mutation inside an atomic batch. A negative delta debits the
/// wallet. When `expected_version` is set, the write commits only while the
/// wallet version is unchanged since the corresponding read.
#[derive(Debug, Clone)]
pub struct LedgerOperation {
    pub owner: WalletOwnerId,
    pub delta: Money,
    pub expected_version: Option<u64>,
    pub allow_negative: bool,
}

impl LedgerOperation {
    pub fn debit(owner: WalletOwnerId, amount: Money, expected_version: u64) -> LedgerOperation {
        LedgerOperation {
            owner,
            delta: -amount,
            expected_version: Some(expected_version),
            allow_negative: false,
        }
    }

    pub fn credit(owner: WalletOwnerId, amount: Money, expected_version: u64) -> LedgerOperation {
        LedgerOperation {
            owner,
            delta: amount,
            expected_version: Some(expected_version),
            allow_negative: false,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("BALANCE_VERSION_CONFLICT")]
    Conflict,
    #[error("INSUFFICIENT_FUNDS")]
    InsufficientFunds,
    #[error("UNBALANCED_TRANSFER")]
    Unbalanced,
}

/// The external balance store the settlement engine mutates. Multi-operation
/// batches commit together or not at all; no reader ever observes a partial
/// batch.
#[async_trait]
pub trait WalletLedger: Send + Sync {
    /// Reads the current balance. An absent wallet reads as zero at
    /// version 0, so a first credit can still carry a version guard.
    async fn balance(&self, owner: &WalletOwnerId) -> VersionedBalance;

    /// Applies a batch of balance mutations atomically. Batches of two or
    /// more operations must net to zero across the batch (conservation law);
    /// single-operation batches move money across the system boundary and
    /// are exempt.
    async fn apply_atomic(&self, operations: &[LedgerOperation]) -> Result<(), LedgerError>;
}

#[derive(Debug, Default, Clone, Copy)]
struct WalletEntry {
    amount: Money,
    version: u64,
}

/// Process-local ledger: one mutex over the wallet map, checks and writes
/// under the same lock acquisition.
#[derive(Default)]
pub struct InMemoryWalletLedger {
    wallets: Mutex<FxHashMap<WalletOwnerId, WalletEntry>>,
}

impl InMemoryWalletLedger {
    pub fn new() -> InMemoryWalletLedger {
        InMemoryWalletLedger::default()
    }
}

#[async_trait]
impl WalletLedger for InMemoryWalletLedger {
    async fn balance(&self, owner: &WalletOwnerId) -> VersionedBalance {
        let wallets = self.wallets.lock().await;
        let entry = wallets.get(owner).copied().unwrap_or_default();
        VersionedBalance {
            amount: entry.amount,
            version: entry.version,
        }
    }

    async fn apply_atomic(&self, operations: &[LedgerOperation]) -> Result<(), LedgerError> {
        let mut wallets = self.wallets.lock().await;

        if operations.len() > 1 {
            let net = operations
                .iter()
                .fold(Money(0), |total, operation| total + operation.delta);
            if net != Money(0) {
                return Err(LedgerError::Unbalanced);
            }
        }

        // Validate the whole batch before touching any wallet.
        for operation in operations {
            let entry = wallets.get(&operation.owner).copied().unwrap_or_default();

            if let Some(expected_version) = operation.expected_version {
                if entry.version != expected_version {
                    return Err(LedgerError::Conflict);
                }
            }

            let updated = entry.amount + operation.delta;
            if updated.is_negative() && !operation.allow_negative {
                return Err(LedgerError::InsufficientFunds);
            }
        }

        for operation in operations {
            let entry = wallets.entry(operation.owner.to_owned()).or_default();
            entry.amount = entry.amount + operation.delta;
            entry.version += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(id: &str) -> WalletOwnerId {
        WalletOwnerId(id.to_string())
    }

    async fn seeded(entries: &[(&str, f64)]) -> InMemoryWalletLedger {
        let ledger = InMemoryWalletLedger::new();
        for (id, amount) in entries {
            ledger
                .apply_atomic(&[LedgerOperation {
                    owner: owner(id),
                    delta: Money::from_major_f64(*amount),
                    expected_version: None,
                    allow_negative: false,
                }])
                .await
                .expect("seed credit failed");
        }
        ledger
    }

    #[tokio::test]
    async fn absent_wallet_reads_as_zero() {
        let ledger = InMemoryWalletLedger::new();
        let balance = ledger.balance(&owner("nobody")).await;
        assert_eq!(balance.amount, Money(0));
        assert_eq!(balance.version, 0);
    }

    #[tokio::test]
    async fn unbalanced_transfer_is_rejected() {
        let ledger = seeded(&[("driver", 100.0)]).await;
        let result = ledger
            .apply_atomic(&[
                LedgerOperation {
                    owner: owner("driver"),
                    delta: Money::from_major_f64(-3.60),
                    expected_version: None,
                    allow_negative: false,
                },
                LedgerOperation {
                    owner: owner("passenger"),
                    delta: Money::from_major_f64(3.50),
                    expected_version: None,
                    allow_negative: false,
                },
            ])
            .await;
        assert_eq!(result, Err(LedgerError::Unbalanced));
        assert_eq!(
            ledger.balance(&owner("driver")).await.amount,
            Money::from_major_f64(100.0)
        );
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict_and_nothing_commits() {
        let ledger = seeded(&[("a", 50.0), ("b", 10.0)]).await;
        let stale = ledger.balance(&owner("a")).await.version.wrapping_sub(1);
        let result = ledger
            .apply_atomic(&[
                LedgerOperation::debit(owner("a"), Money::from_major_f64(5.0), stale),
                LedgerOperation {
                    owner: owner("b"),
                    delta: Money::from_major_f64(5.0),
                    expected_version: None,
                    allow_negative: false,
                },
            ])
            .await;
        assert_eq!(result, Err(LedgerError::Conflict));
        assert_eq!(
            ledger.balance(&owner("b")).await.amount,
            Money::from_major_f64(10.0)
        );
    }

    #[tokio::test]
    async fn overdraft_is_rejected_unless_allowed() {
        let ledger = seeded(&[("driver", 1.0)]).await;
        let version = ledger.balance(&owner("driver")).await.version;

        let rejected = ledger
            .apply_atomic(&[LedgerOperation::debit(
                owner("driver"),
                Money::from_major_f64(3.60),
                version,
            )])
            .await;
        assert_eq!(rejected, Err(LedgerError::InsufficientFunds));

        let allowed = ledger
            .apply_atomic(&[LedgerOperation {
                owner: owner("driver"),
                delta: Money::from_major_f64(-3.60),
                expected_version: Some(version),
                allow_negative: true,
            }])
            .await;
        assert_eq!(allowed, Ok(()));
        assert_eq!(
            ledger.balance(&owner("driver")).await.amount,
            Money::from_major_f64(-2.60)
        );
    }

    #[tokio::test]
    async fn committed_batch_moves_both_balances_and_bumps_versions() {
        let ledger = seeded(&[("driver", 20.0), ("passenger", 0.0)]).await;
        let driver_before = ledger.balance(&owner("driver")).await;
        let passenger_before = ledger.balance(&owner("passenger")).await;

        ledger
            .apply_atomic(&[
                LedgerOperation::debit(
                    owner("driver"),
                    Money::from_major_f64(3.60),
                    driver_before.version,
                ),
                LedgerOperation::credit(
                    owner("passenger"),
                    Money::from_major_f64(3.60),
                    passenger_before.version,
                ),
            ])
            .await
            .expect("transfer failed");

        let driver_after = ledger.balance(&owner("driver")).await;
        let passenger_after = ledger.balance(&owner("passenger")).await;
        assert_eq!(
            driver_after.amount,
            driver_before.amount - Money::from_major_f64(3.60)
        );
        assert_eq!(
            passenger_after.amount,
            passenger_before.amount + Money::from_major_f64(3.60)
        );
        assert_eq!(driver_after.version, driver_before.version + 1);
        assert_eq!(passenger_after.version, passenger_before.version + 1);
        // Conservation: the pooled total is unchanged.
        assert_eq!(
            driver_after.amount + passenger_after.amount,
            driver_before.amount + passenger_before.amount
        );
    }
}
