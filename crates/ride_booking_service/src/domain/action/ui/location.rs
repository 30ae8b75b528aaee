/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::tracking::DeviceSample;
use crate::common::types::*;
use crate::domain::types::ui::location::*;
use crate::environment::AppState;
use crate::tools::error::AppError;
use crate::tools::logger::*;
use crate::tools::prometheus::TOTAL_LOCATION_UPDATES;
use actix_web::web::Data;

/// Ingests raw GPS samples from a passenger device. Samples are replayed in
/// timestamp order and implausibly imprecise fixes are dropped; the store
/// keeps only the freshest sample per passenger.
pub async fn update_device_location(
    data: Data<AppState>,
    passenger_id: PassengerId,
    mut request_body: Vec<UpdateDeviceLocationRequest>,
) -> Result<APISuccess, AppError> {
    request_body.sort_by(|a, b| a.ts.cmp(&b.ts));

    for sample in request_body {
        if sample.acc.inner() > data.max_sample_accuracy_meters {
            debug!(
                tag = "[IMPRECISE SAMPLE DROPPED]",
                passenger_id = %passenger_id.inner(),
                accuracy = sample.acc.inner()
            );
            continue;
        }

        TOTAL_LOCATION_UPDATES.inc();
        data.device_locations
            .record(
                &passenger_id,
                DeviceSample {
                    point: sample.pt,
                    accuracy: sample.acc,
                    captured_at: sample.ts,
                },
            )
            .await;
    }

    Ok(APISuccess::default())
}
