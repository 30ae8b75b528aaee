/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
pub mod internal;
pub mod ui;

use crate::common::types::PassengerId;
use crate::tools::error::AppError;
use actix_web::{web::ServiceConfig, HttpRequest};

// The fronting gateway authenticates the caller and forwards the passenger
// identity in the `pid` header.
pub(crate) fn passenger_id_from_headers(req: &HttpRequest) -> Result<PassengerId, AppError> {
    req.headers()
        .get("pid")
        .and_then(|header_value| header_value.to_str().ok())
        .map(|pid| PassengerId(pid.to_string()))
        .ok_or(AppError::InvalidRequest("pid not found".to_string()))
}

pub fn handler(config: &mut ServiceConfig) {
    config
        .service(ui::location::update_device_location)
        .service(ui::ride::book_ride)
        .service(ui::ride::get_ride)
        .service(ui::ride::update_vehicle_class)
        .service(ui::ride::update_destination)
        .service(ui::ride::start_pickup_tracking)
        .service(ui::ride::stop_pickup_tracking)
        .service(ui::ride::cancel_ride)
        .service(ui::payment::select_payment_method)
        .service(ui::payment::confirm_card_payment)
        .service(ui::payment::submit_cash_amount)
        .service(ui::payment::confirm_change_disposition)
        .service(ui::payment::get_payment_session)
        .service(internal::ride::assign_driver)
        .service(internal::wallet::topup_wallet)
        .service(internal::wallet::wallet_balance)
        .service(ui::healthcheck::health_check);
}
