/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::{settlement, types::*};
use crate::domain::action::ui::ride::ensure_active;
use crate::domain::types::ui::payment::*;
use crate::environment::AppState;
use crate::outbound::types::PaymentFormDetails;
use crate::storage::commands::*;
use crate::tools::error::AppError;
use crate::tools::logger::*;
use crate::tools::prometheus::COMPLETED_SETTLEMENTS;
use actix_web::web::Data;

fn passenger_wallet(ride_request: &RideRequest) -> WalletOwnerId {
    WalletOwnerId(ride_request.passenger_id.inner())
}

fn active_session(ride_request: &RideRequest) -> Result<PaymentSession, AppError> {
    ride_request
        .payment_session
        .to_owned()
        .ok_or_else(|| AppError::PaymentSessionNotFound(ride_request.ride_request_id.inner()))
}

async fn store_session(
    data: &Data<AppState>,
    ride_request_id: &RideRequestId,
    session: PaymentSession,
) -> Result<(), AppError> {
    with_ride_request(&data.ride_requests, ride_request_id, |ride_request| {
        ride_request.payment_session = Some(session);
        Ok(())
    })
    .await
}

/// Freezes the booking once its settlement reaches COMPLETE: status flips,
/// the pickup watch stops, the settlement counter ticks.
async fn complete_booking(
    data: &Data<AppState>,
    ride_request_id: &RideRequestId,
    method: PaymentMethod,
) -> Result<(), AppError> {
    with_ride_request(&data.ride_requests, ride_request_id, |ride_request| {
        ride_request.booking_status = BookingStatus::COMPLETED;
        Ok(())
    })
    .await?;

    if let Some(tracker) = data.pickup_watches.write().await.remove(ride_request_id) {
        tracker.stop_watching();
    }

    COMPLETED_SETTLEMENTS
        .with_label_values(&[method.to_string().as_str()])
        .inc();
    info!(
        tag = "[SETTLEMENT COMPLETE]",
        ride_request_id = %ride_request_id.inner(),
        method = %method
    );
    Ok(())
}

/// Opens (or re-opens) the payment session with the chosen method. Amount
/// due is the exact fare of the booking. Switching method is allowed while
/// the session is non-terminal.
pub async fn select_payment_method(
    data: Data<AppState>,
    ride_request_id: RideRequestId,
    request_body: SelectPaymentMethodRequest,
) -> Result<PaymentSession, AppError> {
    let ride_request = get_ride_request(&data.ride_requests, &ride_request_id).await?;
    ensure_active(&ride_request)?;

    if let Some(session) = &ride_request.payment_session {
        if session.state.is_terminal() {
            return Err(AppError::InvalidSessionState(
                "a non-terminal state".to_string(),
                session.state.to_string(),
            ));
        }
    }

    let amount_due = ride_request.fare.exact;

    match settlement::select_payment_method(
        data.wallet_ledger.as_ref(),
        &passenger_wallet(&ride_request),
        amount_due,
        request_body.method,
    )
    .await
    {
        Ok(session) => {
            store_session(&data, &ride_request_id, session.to_owned()).await?;
            if session.state.is_terminal() {
                complete_booking(&data, &ride_request_id, session.method).await?;
            }
            Ok(session)
        }
        Err(AppError::InsufficientWalletBalance) => {
            // Guard rejection: the session rests in METHOD_SELECTION so the
            // passenger can pick another method.
            let session =
                PaymentSession::new(request_body.method, amount_due, SettlementState::MethodSelection);
            store_session(&data, &ride_request_id, session).await?;
            Err(AppError::InsufficientWalletBalance)
        }
        Err(err) => Err(err),
    }
}

/// Confirms a card/PIX form against the payment gateway. On a decline the
/// stored session stays in FORM_ENTRY for another attempt.
pub async fn confirm_card_payment(
    data: Data<AppState>,
    ride_request_id: RideRequestId,
    form: PaymentFormDetails,
) -> Result<PaymentSession, AppError> {
    let ride_request = get_ride_request(&data.ride_requests, &ride_request_id).await?;
    ensure_active(&ride_request)?;
    let session = active_session(&ride_request)?;

    let session =
        settlement::confirm_card_payment(data.payment_gateway.as_ref(), &session, &form).await?;

    store_session(&data, &ride_request_id, session.to_owned()).await?;
    complete_booking(&data, &ride_request_id, session.method).await?;
    Ok(session)
}

/// Records the tendered cash amount; exact payment completes the session,
/// overpayment hands over to the driver's change decision.
pub async fn submit_cash_amount(
    data: Data<AppState>,
    ride_request_id: RideRequestId,
    request_body: SubmitCashAmountRequest,
) -> Result<PaymentSession, AppError> {
    let ride_request = get_ride_request(&data.ride_requests, &ride_request_id).await?;
    ensure_active(&ride_request)?;
    let session = active_session(&ride_request)?;

    let session = settlement::submit_cash_amount(&session, request_body.amount_tendered)?;

    store_session(&data, &ride_request_id, session.to_owned()).await?;
    if session.state.is_terminal() {
        complete_booking(&data, &ride_request_id, session.method).await?;
    }
    Ok(session)
}

/// Applies the driver's change disposition; requires an assigned driver
/// since CREDIT_WALLET moves money out of the driver's balance.
pub async fn confirm_change_disposition(
    data: Data<AppState>,
    ride_request_id: RideRequestId,
    request_body: ConfirmChangeDispositionRequest,
) -> Result<PaymentSession, AppError> {
    let ride_request = get_ride_request(&data.ride_requests, &ride_request_id).await?;
    ensure_active(&ride_request)?;
    let session = active_session(&ride_request)?;

    let driver_id = ride_request
        .driver_id
        .to_owned()
        .ok_or_else(|| AppError::DriverNotAssigned(ride_request_id.inner()))?;

    let session = settlement::confirm_change_disposition(
        data.wallet_ledger.as_ref(),
        &session,
        &WalletOwnerId(driver_id.inner()),
        &passenger_wallet(&ride_request),
        request_body.disposition,
    )
    .await?;

    store_session(&data, &ride_request_id, session.to_owned()).await?;
    complete_booking(&data, &ride_request_id, session.method).await?;
    Ok(session)
}

pub async fn get_payment_session(
    data: Data<AppState>,
    ride_request_id: RideRequestId,
) -> Result<PaymentSession, AppError> {
    let ride_request = get_ride_request(&data.ride_requests, &ride_request_id).await?;
    active_session(&ride_request)
}
