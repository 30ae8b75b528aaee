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
    HttpRequest,
};

use crate::{
    common::types::*,
    domain::{action::ui::ride, api::passenger_id_from_headers, types::ui::ride::*},
    environment::AppState,
    tools::error::AppError,
};

#[post("/ui/ride/book")]
pub async fn book_ride(
    data: Data<AppState>,
    param_obj: Json<BookRideRequest>,
    req: HttpRequest,
) -> Result<Json<RideRequest>, AppError> {
    let request_body = param_obj.into_inner();
    let passenger_id = passenger_id_from_headers(&req)?;

    Ok(Json(ride::book_ride(data, passenger_id, request_body).await?))
}

#[get("/ui/ride/{rideRequestId}")]
pub async fn get_ride(
    data: Data<AppState>,
    path: Path<String>,
) -> Result<Json<RideRequest>, AppError> {
    let ride_request_id = RideRequestId(path.into_inner());

    Ok(Json(ride::get_ride(data, ride_request_id).await?))
}

#[post("/ui/ride/{rideRequestId}/vehicleClass")]
pub async fn update_vehicle_class(
    data: Data<AppState>,
    path: Path<String>,
    param_obj: Json<UpdateVehicleClassRequest>,
) -> Result<Json<RideRequest>, AppError> {
    let ride_request_id = RideRequestId(path.into_inner());
    let request_body = param_obj.into_inner();

    Ok(Json(
        ride::update_vehicle_class(data, ride_request_id, request_body).await?,
    ))
}

#[post("/ui/ride/{rideRequestId}/destination")]
pub async fn update_destination(
    data: Data<AppState>,
    path: Path<String>,
    param_obj: Json<UpdateDestinationRequest>,
) -> Result<Json<RideRequest>, AppError> {
    let ride_request_id = RideRequestId(path.into_inner());
    let request_body = param_obj.into_inner();

    Ok(Json(
        ride::update_destination(data, ride_request_id, request_body).await?,
    ))
}

#[post("/ui/ride/{rideRequestId}/tracking/start")]
pub async fn start_pickup_tracking(
    data: Data<AppState>,
    path: Path<String>,
) -> Result<Json<APISuccess>, AppError> {
    let ride_request_id = RideRequestId(path.into_inner());

    Ok(Json(
        ride::start_pickup_tracking(data, ride_request_id).await?,
    ))
}

#[post("/ui/ride/{rideRequestId}/tracking/stop")]
pub async fn stop_pickup_tracking(
    data: Data<AppState>,
    path: Path<String>,
) -> Result<Json<APISuccess>, AppError> {
    let ride_request_id = RideRequestId(path.into_inner());

    Ok(Json(
        ride::stop_pickup_tracking(data, ride_request_id).await?,
    ))
}

#[post("/ui/ride/{rideRequestId}/cancel")]
pub async fn cancel_ride(
    data: Data<AppState>,
    path: Path<String>,
) -> Result<Json<APISuccess>, AppError> {
    let ride_request_id = RideRequestId(path.into_inner());

    Ok(Json(ride::cancel_ride(data, ride_request_id).await?))
}
