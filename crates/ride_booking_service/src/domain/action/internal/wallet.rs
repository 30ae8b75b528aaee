/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::ledger::{LedgerError, LedgerOperation};
use crate::common::types::*;
use crate::domain::types::internal::wallet::*;
use crate::environment::AppState;
use crate::tools::error::AppError;
use crate::tools::logger::*;
use actix_web::web::Data;

/// Ops-plane wallet credit. Top-ups have no version guard; they are the one
/// writer that may race freely with settlements.
pub async fn topup_wallet(
    data: Data<AppState>,
    owner_id: WalletOwnerId,
    request_body: WalletTopupRequest,
) -> Result<WalletBalanceResponse, AppError> {
    if request_body.amount <= Money(0) {
        return Err(AppError::InvalidRequest(
            "Top-up amount must be positive".to_string(),
        ));
    }

    data.wallet_ledger
        .apply_atomic(&[LedgerOperation {
            owner: owner_id.to_owned(),
            delta: request_body.amount,
            expected_version: None,
            allow_negative: false,
        }])
        .await
        .map_err(|err| match err {
            LedgerError::Conflict => AppError::SettlementConflict,
            LedgerError::InsufficientFunds => AppError::InsufficientWalletBalance,
            LedgerError::Unbalanced => {
                AppError::InternalError("Ledger batch does not conserve money".to_string())
            }
        })?;

    info!(tag = "[WALLET TOPUP]", owner_id = %owner_id.inner(), amount = %request_body.amount);
    wallet_balance(data, owner_id).await
}

pub async fn wallet_balance(
    data: Data<AppState>,
    owner_id: WalletOwnerId,
) -> Result<WalletBalanceResponse, AppError> {
    let balance = data.wallet_ledger.balance(&owner_id).await;
    Ok(WalletBalanceResponse {
        owner_id,
        amount: balance.amount,
        version: balance.version,
    })
}
