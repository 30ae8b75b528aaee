/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use actix_web::{
    get, post,
    web::{Data, Json, Path},
};

use crate::{
    common::types::*,
    domain::{action::ui::payment, types::ui::payment::*},
    environment::AppState,
    outbound::types::PaymentFormDetails,
    tools::error::AppError,
};

#[post("/ui/payment/{rideRequestId}/method")]
pub async fn select_payment_method(
    data: Data<AppState>,
    path: Path<String>,
    param_obj: Json<SelectPaymentMethodRequest>,
) -> Result<Json<PaymentSession>, AppError> {
    let ride_request_id = RideRequestId(path.into_inner());
    let request_body = param_obj.into_inner();

    Ok(Json(
        payment::select_payment_method(data, ride_request_id, request_body).await?,
    ))
}

#[post("/ui/payment/{rideRequestId}/card")]
pub async fn confirm_card_payment(
    data: Data<AppState>,
    path: Path<String>,
    param_obj: Json<PaymentFormDetails>,
) -> Result<Json<PaymentSession>, AppError> {
    let ride_request_id = RideRequestId(path.into_inner());
    let form = param_obj.into_inner();

    Ok(Json(
        payment::confirm_card_payment(data, ride_request_id, form).await?,
    ))
}

#[post("/ui/payment/{rideRequestId}/cash")]
pub async fn submit_cash_amount(
    data: Data<AppState>,
    path: Path<String>,
    param_obj: Json<SubmitCashAmountRequest>,
) -> Result<Json<PaymentSession>, AppError> {
    let ride_request_id = RideRequestId(path.into_inner());
    let request_body = param_obj.into_inner();

    Ok(Json(
        payment::submit_cash_amount(data, ride_request_id, request_body).await?,
    ))
}

#[post("/ui/payment/{rideRequestId}/change")]
pub async fn confirm_change_disposition(
    data: Data<AppState>,
    path: Path<String>,
    param_obj: Json<ConfirmChangeDispositionRequest>,
) -> Result<Json<PaymentSession>, AppError> {
    let ride_request_id = RideRequestId(path.into_inner());
    let request_body = param_obj.into_inner();

    Ok(Json(
        payment::confirm_change_disposition(data, ride_request_id, request_body).await?,
    ))
}

#[get("/ui/payment/{rideRequestId}")]
pub async fn get_payment_session(
    data: Data<AppState>,
    path: Path<String>,
) -> Result<Json<PaymentSession>, AppError> {
    let ride_request_id = RideRequestId(path.into_inner());

    Ok(Json(
        payment::get_payment_session(data, ride_request_id).await?,
    ))
}
