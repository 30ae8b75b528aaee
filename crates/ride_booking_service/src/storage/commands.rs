/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use crate::tools::error::AppError;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

// Bookings live in process memory; persistence belongs to collaborators
// outside this service.
pub type RideRequestStore = Arc<RwLock<FxHashMap<RideRequestId, RideRequest>>>;

pub fn new_ride_request_store() -> RideRequestStore {
    Arc::new(RwLock::new(FxHashMap::default()))
}

pub async fn set_ride_request(store: &RideRequestStore, ride_request: RideRequest) {
    store
        .write()
        .await
        .insert(ride_request.ride_request_id.to_owned(), ride_request);
}

pub async fn get_ride_request(
    store: &RideRequestStore,
    ride_request_id: &RideRequestId,
) -> Result<RideRequest, AppError> {
    store
        .read()
        .await
        .get(ride_request_id)
        .cloned()
        .ok_or_else(|| AppError::RideRequestNotFound(ride_request_id.inner()))
}

/// Read-modify-write under a single write-lock acquisition, so guarded
/// transitions never interleave with another writer.
pub async fn with_ride_request<F, T>(
    store: &RideRequestStore,
    ride_request_id: &RideRequestId,
    callback: F,
) -> Result<T, AppError>
where
    F: FnOnce(&mut RideRequest) -> Result<T, AppError>,
{
    let mut ride_requests = store.write().await;
    let ride_request = ride_requests
        .get_mut(ride_request_id)
        .ok_or_else(|| AppError::RideRequestNotFound(ride_request_id.inner()))?;
    callback(ride_request)
}
