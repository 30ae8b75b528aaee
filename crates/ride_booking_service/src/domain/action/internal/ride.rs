/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use crate::domain::action::ui::ride::ensure_active;
use crate::domain::types::internal::ride::*;
use crate::environment::AppState;
use crate::storage::commands::*;
use crate::tools::error::AppError;
use crate::tools::logger::*;
use actix_web::web::Data;

/// Dispatch assigns the driver who will collect the fare; required before a
/// cash change disposition can be confirmed.
pub async fn assign_driver(
    data: Data<AppState>,
    ride_request_id: RideRequestId,
    request_body: AssignDriverRequest,
) -> Result<APISuccess, AppError> {
    with_ride_request(&data.ride_requests, &ride_request_id, |ride_request| {
        ensure_active(ride_request)?;
        ride_request.driver_id = Some(request_body.driver_id.to_owned());
        Ok(())
    })
    .await?;

    info!(
        tag = "[DRIVER ASSIGNED]",
        ride_request_id = %ride_request_id.inner(),
        driver_id = %request_body.driver_id.inner()
    );
    Ok(APISuccess::default())
}
