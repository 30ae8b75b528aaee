/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::common::types::RoutingStatus;
use actix_web::{
    http::{header::ContentType, StatusCode},
    HttpResponse, ResponseError,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    error_message: String,
    pub error_code: String,
}

#[macros::add_error]
pub enum AppError {
    InternalError(String),
    InvalidRequest(String),
    UnprocessibleRequest(String),
    LargePayloadSize(usize, usize),
    RequestTimeout,
    ExternalAPICallError(String),
    SerializationError(String),
    DeserializationError(String),
    RideRequestNotFound(String),
    PaymentSessionNotFound(String),
    VehicleClassNotFound(String),
    DriverNotAssigned(String),
    InvalidSessionState(String, String),
    RideNotActive(String, String),
    LocationUnavailable(String),
    RouteUnavailable(RoutingStatus),
    InsufficientWalletBalance,
    InvalidCashAmount(String),
    ProviderDeclined(String),
    SettlementConflict,
}

impl AppError {
    fn error_message(&self) -> ErrorBody {
        ErrorBody {
            error_message: self.message(),
            error_code: self.code(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            AppError::InternalError(err) => err.to_string(),
            AppError::InvalidRequest(err) => err.to_string(),
            AppError::UnprocessibleRequest(err) => err.to_string(),
            AppError::LargePayloadSize(length, limit) => {
                format!("Content length ({length} Bytes) greater than allowed maximum limit : ({limit} Bytes)")
            }
            AppError::ExternalAPICallError(err) => err.to_string(),
            AppError::SerializationError(err) => err.to_string(),
            AppError::DeserializationError(err) => err.to_string(),
            AppError::RideRequestNotFound(ride_request_id) => {
                format!("Ride request not found : {ride_request_id}")
            }
            AppError::PaymentSessionNotFound(ride_request_id) => {
                format!("No payment session exists for ride request : {ride_request_id}")
            }
            AppError::VehicleClassNotFound(vehicle_class_id) => {
                format!("Unknown vehicle class : {vehicle_class_id}")
            }
            AppError::DriverNotAssigned(ride_request_id) => {
                format!("No driver assigned to ride request : {ride_request_id}")
            }
            AppError::InvalidSessionState(expected, actual) => {
                format!("Payment session is in state {actual}, operation requires {expected}")
            }
            AppError::RideNotActive(ride_request_id, booking_status) => {
                format!("Ride request {ride_request_id} is {booking_status}, it can no longer be modified")
            }
            AppError::LocationUnavailable(reason) => {
                format!("Current position unavailable : {reason}")
            }
            AppError::RouteUnavailable(status) => {
                format!("Route could not be resolved : {status}")
            }
            AppError::InsufficientWalletBalance => {
                "Insufficient wallet balance, choose another payment method".to_string()
            }
            AppError::InvalidCashAmount(reason) => {
                format!("Invalid cash amount : {reason}")
            }
            AppError::ProviderDeclined(reason) => {
                format!("Payment provider declined the transaction : {reason}")
            }
            AppError::SettlementConflict => {
                "Concurrent wallet update detected, settlement was not applied".to_string()
            }
            _ => "Some Error Occured".to_string(),
        }
    }

    fn code(&self) -> String {
        match self {
            AppError::InternalError(_) => "INTERNAL_ERROR",
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::UnprocessibleRequest(_) => "UNPROCESSIBLE_REQUEST",
            AppError::LargePayloadSize(_, _) => "LARGE_PAYLOAD_SIZE",
            AppError::RequestTimeout => "REQUEST_TIMEOUT",
            AppError::ExternalAPICallError(_) => "EXTERNAL_API_CALL_ERROR",
            AppError::SerializationError(_) => "SERIALIZATION_ERROR",
            AppError::DeserializationError(_) => "DESERIALIZATION_ERROR",
            AppError::RideRequestNotFound(_) => "RIDE_REQUEST_NOT_FOUND",
            AppError::PaymentSessionNotFound(_) => "PAYMENT_SESSION_NOT_FOUND",
            AppError::VehicleClassNotFound(_) => "VEHICLE_CLASS_NOT_FOUND",
            AppError::DriverNotAssigned(_) => "DRIVER_NOT_ASSIGNED",
            AppError::InvalidSessionState(_, _) => "INVALID_SESSION_STATE",
            AppError::RideNotActive(_, _) => "RIDE_NOT_ACTIVE",
            AppError::LocationUnavailable(_) => "LOCATION_UNAVAILABLE",
            AppError::RouteUnavailable(_) => "ROUTE_UNAVAILABLE",
            AppError::InsufficientWalletBalance => "INSUFFICIENT_WALLET_BALANCE",
            AppError::InvalidCashAmount(_) => "INVALID_CASH_AMOUNT",
            AppError::ProviderDeclined(_) => "PROVIDER_DECLINED",
            AppError::SettlementConflict => "SETTLEMENT_CONFLICT",
        }
        .to_string()
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(self.error_message())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UnprocessibleRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::LargePayloadSize(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            AppError::ExternalAPICallError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DeserializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RideRequestNotFound(_) => StatusCode::NOT_FOUND,
            AppError::PaymentSessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::VehicleClassNotFound(_) => StatusCode::BAD_REQUEST,
            AppError::DriverNotAssigned(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidSessionState(_, _) => StatusCode::CONFLICT,
            AppError::RideNotActive(_, _) => StatusCode::CONFLICT,
            AppError::LocationUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::RouteUnavailable(status) => match status {
                RoutingStatus::NotFound | RoutingStatus::InvalidRequest => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            },
            AppError::InsufficientWalletBalance => StatusCode::PAYMENT_REQUIRED,
            AppError::InvalidCashAmount(_) => StatusCode::BAD_REQUEST,
            AppError::ProviderDeclined(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::SettlementConflict => StatusCode::CONFLICT,
        }
    }
}
