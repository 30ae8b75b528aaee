/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::ledger::*;
use crate::common::types::*;
use crate::outbound::types::{PaymentFormDetails, PaymentGateway};
use crate::tools::error::AppError;
use tracing::{info, warn};

fn ensure_state(session: &PaymentSession, expected: SettlementState) -> Result<(), AppError> {
    if session.state == expected {
        Ok(())
    } else {
        Err(AppError::InvalidSessionState(
            expected.to_string(),
            session.state.to_string(),
        ))
    }
}

fn map_ledger_error(error: LedgerError) -> AppError {
    match error {
        LedgerError::Conflict => AppError::SettlementConflict,
        LedgerError::InsufficientFunds => AppError::InsufficientWalletBalance,
        LedgerError::Unbalanced => {
            AppError::InternalError("Ledger batch does not conserve money".to_string())
        }
    }
}

async fn try_debit_wallet(
    ledger: &dyn WalletLedger,
    owner: &WalletOwnerId,
    amount: Money,
) -> Result<(), AppError> {
    let balance = ledger.balance(owner).await;
    if balance.amount < amount {
        return Err(AppError::InsufficientWalletBalance);
    }

    ledger
        .apply_atomic(&[LedgerOperation::debit(
            owner.to_owned(),
            amount,
            balance.version,
        )])
        .await
        .map_err(map_ledger_error)
}

async fn try_credit_change(
    ledger: &dyn WalletLedger,
    driver_wallet: &WalletOwnerId,
    passenger_wallet: &WalletOwnerId,
    change_due: Money,
) -> Result<(), AppError> {
    let driver_balance = ledger.balance(driver_wallet).await;
    let passenger_balance = ledger.balance(passenger_wallet).await;

    // The driver already holds the tendered cash, so the recorded balance may
    // go into debt rather than blocking the passenger's change.
    let operations = [
        LedgerOperation {
            owner: driver_wallet.to_owned(),
            delta: -change_due,
            expected_version: Some(driver_balance.version),
            allow_negative: true,
        },
        LedgerOperation::credit(
            passenger_wallet.to_owned(),
            change_due,
            passenger_balance.version,
        ),
    ];

    ledger
        .apply_atomic(&operations)
        .await
        .map_err(map_ledger_error)
}

/// Debits the fare from the passenger wallet, retrying once on an
/// optimistic-concurrency collision before the conflict surfaces.
pub async fn debit_wallet(
    ledger: &dyn WalletLedger,
    owner: &WalletOwnerId,
    amount: Money,
) -> Result<(), AppError> {
    match try_debit_wallet(ledger, owner, amount).await {
        Err(AppError::SettlementConflict) => {
            warn!(tag = "[SETTLEMENT CONFLICT]", owner = %owner.inner(), "Retrying wallet debit after version conflict");
            try_debit_wallet(ledger, owner, amount).await
        }
        result => result,
    }
}

async fn credit_change(
    ledger: &dyn WalletLedger,
    driver_wallet: &WalletOwnerId,
    passenger_wallet: &WalletOwnerId,
    change_due: Money,
) -> Result<(), AppError> {
    match try_credit_change(ledger, driver_wallet, passenger_wallet, change_due).await {
        Err(AppError::SettlementConflict) => {
            warn!(tag = "[SETTLEMENT CONFLICT]", driver = %driver_wallet.inner(), "Retrying change credit after version conflict");
            try_credit_change(ledger, driver_wallet, passenger_wallet, change_due).await
        }
        result => result,
    }
}

/// Opens a payment session for the chosen method.
///
/// The wallet path completes in this transition: balance check followed by
/// one atomic debit. An insufficient balance surfaces as a typed failure and
/// the caller keeps the session in METHOD_SELECTION so another method can be
/// chosen.
pub async fn select_payment_method(
    ledger: &dyn WalletLedger,
    passenger_wallet: &WalletOwnerId,
    amount_due: Money,
    method: PaymentMethod,
) -> Result<PaymentSession, AppError> {
    match method {
        PaymentMethod::Wallet => {
            debit_wallet(ledger, passenger_wallet, amount_due).await?;
            info!(tag = "[WALLET SETTLEMENT]", wallet = %passenger_wallet.inner(), amount = %amount_due);
            Ok(PaymentSession::new(
                method,
                amount_due,
                SettlementState::Complete,
            ))
        }
        PaymentMethod::Card | PaymentMethod::Pix => Ok(PaymentSession::new(
            method,
            amount_due,
            SettlementState::FormEntry,
        )),
        PaymentMethod::Cash => Ok(PaymentSession::new(
            method,
            amount_due,
            SettlementState::AmountEntry,
        )),
    }
}

/// Confirms a card/PIX session against the payment gateway. A decline leaves
/// the session in FORM_ENTRY for another attempt.
pub async fn confirm_card_payment(
    gateway: &dyn PaymentGateway,
    session: &PaymentSession,
    form: &PaymentFormDetails,
) -> Result<PaymentSession, AppError> {
    ensure_state(session, SettlementState::FormEntry)?;

    if !matches!(session.method, PaymentMethod::Card | PaymentMethod::Pix) {
        return Err(AppError::InvalidRequest(
            "Payment session is not a card or PIX session".to_string(),
        ));
    }

    gateway
        .authorize(session.method, session.amount_due, form)
        .await?;

    Ok(PaymentSession {
        state: SettlementState::Complete,
        ..session.to_owned()
    })
}

/// Records the tendered cash amount. Exact payment completes the session
/// directly; an overpayment moves it to DRIVER_CONFIRMATION with the change
/// owed.
pub fn submit_cash_amount(
    session: &PaymentSession,
    amount_tendered: Money,
) -> Result<PaymentSession, AppError> {
    ensure_state(session, SettlementState::AmountEntry)?;

    if amount_tendered < session.amount_due {
        return Err(AppError::InvalidCashAmount(format!(
            "Tendered amount {amount_tendered} is less than the amount due {}",
            session.amount_due
        )));
    }

    let change_due = amount_tendered - session.amount_due;

    Ok(PaymentSession {
        amount_tendered: Some(amount_tendered),
        change_due: Some(change_due),
        state: if change_due == Money(0) {
            SettlementState::Complete
        } else {
            SettlementState::DriverConfirmation
        },
        ..session.to_owned()
    })
}

/// Applies the driver's change disposition. RETURN_CASH never touches the
/// ledger; CREDIT_WALLET moves the change from the driver balance to the
/// passenger wallet in one atomic batch.
pub async fn confirm_change_disposition(
    ledger: &dyn WalletLedger,
    session: &PaymentSession,
    driver_wallet: &WalletOwnerId,
    passenger_wallet: &WalletOwnerId,
    disposition: ChangeDisposition,
) -> Result<PaymentSession, AppError> {
    ensure_state(session, SettlementState::DriverConfirmation)?;

    let change_due = session.change_due.ok_or_else(|| {
        AppError::InternalError("Session awaiting driver confirmation has no change due".to_string())
    })?;

    if let ChangeDisposition::CreditWallet = disposition {
        credit_change(ledger, driver_wallet, passenger_wallet, change_due).await?;
        info!(tag = "[CHANGE CREDITED]", driver = %driver_wallet.inner(), passenger = %passenger_wallet.inner(), amount = %change_due);
    }

    Ok(PaymentSession {
        change_disposition: Some(disposition),
        state: SettlementState::Complete,
        ..session.to_owned()
    })
}
