/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use actix_web::{
    post,
    web::{Data, Json},
    HttpRequest,
};

use crate::{
    common::types::*,
    domain::{action::ui::location, api::passenger_id_from_headers, types::ui::location::*},
    environment::AppState,
    tools::error::AppError,
};

#[post("/ui/location/update")]
pub async fn update_device_location(
    data: Data<AppState>,
    param_obj: Json<Vec<UpdateDeviceLocationRequest>>,
    req: HttpRequest,
) -> Result<Json<APISuccess>, AppError> {
    let request_body = param_obj.into_inner();

    if request_body.is_empty() {
        return Err(AppError::InvalidRequest(
            "Vec<UpdateDeviceLocationRequest> is empty".to_string(),
        ));
    }

    let passenger_id = passenger_id_from_headers(&req)?;

    Ok(Json(
        location::update_device_location(data, passenger_id, request_body).await?,
    ))
}
