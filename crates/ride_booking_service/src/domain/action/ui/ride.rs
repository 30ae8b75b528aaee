/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::{fare, route::resolve_route, types::*};
use crate::domain::types::ui::ride::*;
use crate::environment::AppState;
use crate::outbound::types::RoutingProvider;
use crate::storage::commands::*;
use crate::tools::error::AppError;
use crate::tools::logger::*;
use crate::tools::prometheus::RIDE_BOOKINGS;
use actix_web::web::Data;
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub(crate) fn ensure_active(ride_request: &RideRequest) -> Result<(), AppError> {
    if ride_request.booking_status == BookingStatus::ACTIVE {
        Ok(())
    } else {
        Err(AppError::RideNotActive(
            ride_request.ride_request_id.inner(),
            ride_request.booking_status.to_string(),
        ))
    }
}

/// Resolves the route with a single backoff retry for transient provider
/// failures. Deterministic failures surface immediately.
pub(crate) async fn resolve_route_with_retry(
    provider: &dyn RoutingProvider,
    origin: &Point,
    destination: &Point,
    backoff_ms: u64,
) -> Result<Route, AppError> {
    match resolve_route(provider, origin, destination).await {
        Err(AppError::RouteUnavailable(status)) if status.is_retryable() => {
            let jitter = rand::thread_rng().gen_range(0..=backoff_ms.max(2) / 2);
            warn!(tag = "[ROUTE RETRY]", status = %status, backoff_ms = backoff_ms + jitter);
            tokio::time::sleep(Duration::from_millis(backoff_ms + jitter)).await;
            resolve_route(provider, origin, destination).await
        }
        result => result,
    }
}

/// Applies a finished route resolution to the ride, unless a newer
/// resolution has been issued meanwhile (last-write-wins on the route).
async fn apply_route_resolution(
    data: Data<AppState>,
    ride_request_id: RideRequestId,
    origin: Point,
    destination: Point,
    epoch: u64,
) -> Result<(), AppError> {
    let route = resolve_route_with_retry(
        data.routing_provider.as_ref(),
        &origin,
        &destination,
        data.route_retry_backoff_ms,
    )
    .await?;

    with_ride_request(&data.ride_requests, &ride_request_id, |ride_request| {
        if ride_request.route_epoch != epoch {
            info!(
                tag = "[STALE ROUTE DROPPED]",
                ride_request_id = %ride_request_id.inner(),
                stale_epoch = epoch,
                current_epoch = ride_request.route_epoch
            );
            return Ok(());
        }

        let vehicle_class = data
            .vehicle_classes
            .get(&ride_request.vehicle_class_id)
            .ok_or_else(|| {
                AppError::VehicleClassNotFound(ride_request.vehicle_class_id.inner())
            })?;

        ride_request.route = route.to_owned();
        ride_request.fare = fare::quote(vehicle_class, route.distance);
        Ok(())
    })
    .await
}

#[macros::measure_duration]
pub async fn book_ride(
    data: Data<AppState>,
    passenger_id: PassengerId,
    request_body: BookRideRequest,
) -> Result<RideRequest, AppError> {
    let vehicle_class = data.vehicle_class(&request_body.vehicle_class_id)?;

    if request_body.passenger_count == 0
        || request_body.passenger_count > data.max_passenger_count
    {
        return Err(AppError::InvalidRequest(format!(
            "Passenger count must be between 1 and {}",
            data.max_passenger_count
        )));
    }

    let pickup = match request_body.pickup {
        Some(pickup) => pickup,
        None => {
            let tracker = data.position_tracker(&passenger_id);
            tracker.current_position().await?.point
        }
    };

    let route = resolve_route_with_retry(
        data.routing_provider.as_ref(),
        &pickup,
        &request_body.destination,
        data.route_retry_backoff_ms,
    )
    .await?;

    let fare = fare::quote(&vehicle_class, route.distance);

    let ride_request = RideRequest {
        ride_request_id: RideRequestId(format!("ride-{}", Uuid::new_v4())),
        passenger_id,
        driver_id: None,
        pickup,
        destination: request_body.destination,
        vehicle_class_id: request_body.vehicle_class_id,
        passenger_count: request_body.passenger_count,
        route,
        fare,
        booking_status: BookingStatus::ACTIVE,
        payment_session: None,
        route_epoch: 0,
        created_at: TimeStamp(Utc::now()),
    };

    set_ride_request(&data.ride_requests, ride_request.to_owned()).await;
    RIDE_BOOKINGS.inc();
    info!(
        tag = "[RIDE BOOKED]",
        ride_request_id = %ride_request.ride_request_id.inner(),
        fare = %ride_request.fare.exact
    );

    Ok(ride_request)
}

pub async fn get_ride(
    data: Data<AppState>,
    ride_request_id: RideRequestId,
) -> Result<RideRequest, AppError> {
    get_ride_request(&data.ride_requests, &ride_request_id).await
}

/// Changing the vehicle class recomputes the fare synchronously from the
/// stored route; no stale quote survives the change.
pub async fn update_vehicle_class(
    data: Data<AppState>,
    ride_request_id: RideRequestId,
    request_body: UpdateVehicleClassRequest,
) -> Result<RideRequest, AppError> {
    let vehicle_class = data.vehicle_class(&request_body.vehicle_class_id)?;

    with_ride_request(&data.ride_requests, &ride_request_id, |ride_request| {
        ensure_active(ride_request)?;
        ride_request.vehicle_class_id = request_body.vehicle_class_id.to_owned();
        ride_request.fare = fare::quote(&vehicle_class, ride_request.route.distance);
        Ok(ride_request.to_owned())
    })
    .await
}

/// Changing the destination re-resolves the route before answering, guarded
/// by the route epoch so a concurrent resolution cannot be overwritten by a
/// stale one.
pub async fn update_destination(
    data: Data<AppState>,
    ride_request_id: RideRequestId,
    request_body: UpdateDestinationRequest,
) -> Result<RideRequest, AppError> {
    let (pickup, epoch) =
        with_ride_request(&data.ride_requests, &ride_request_id, |ride_request| {
            ensure_active(ride_request)?;
            ride_request.destination = request_body.destination.to_owned();
            ride_request.route_epoch += 1;
            Ok((ride_request.pickup.to_owned(), ride_request.route_epoch))
        })
        .await?;

    apply_route_resolution(
        data.to_owned(),
        ride_request_id.to_owned(),
        pickup,
        request_body.destination,
        epoch,
    )
    .await?;

    get_ride_request(&data.ride_requests, &ride_request_id).await
}

/// Starts the continuous pickup watch for an active booking. Every delivered
/// (filtered) position updates the pickup and triggers an epoch-guarded route
/// refresh. Idempotent per ride.
pub async fn start_pickup_tracking(
    data: Data<AppState>,
    ride_request_id: RideRequestId,
) -> Result<APISuccess, AppError> {
    let ride_request = get_ride_request(&data.ride_requests, &ride_request_id).await?;
    ensure_active(&ride_request)?;

    let mut pickup_watches = data.pickup_watches.write().await;
    if pickup_watches.contains_key(&ride_request_id) {
        return Ok(APISuccess::default());
    }

    let tracker = Arc::new(data.position_tracker(&ride_request.passenger_id));

    let watch_data = data.to_owned();
    let watch_ride_request_id = ride_request_id.to_owned();
    tracker.start_watching(
        Arc::new(move |position| {
            let data = watch_data.to_owned();
            let ride_request_id = watch_ride_request_id.to_owned();
            tokio::spawn(async move {
                if let Err(err) = refresh_pickup(data, ride_request_id, position).await {
                    warn!(tag = "[PICKUP REFRESH FAILED]", error = %err);
                }
            });
        }),
        Arc::new(|err| {
            warn!(tag = "[PICKUP WATCH]", error = %err, "Dropping failed sample");
        }),
    );

    pickup_watches.insert(ride_request_id, tracker);
    Ok(APISuccess::default())
}

async fn refresh_pickup(
    data: Data<AppState>,
    ride_request_id: RideRequestId,
    position: Position,
) -> Result<(), AppError> {
    let (destination, epoch) =
        with_ride_request(&data.ride_requests, &ride_request_id, |ride_request| {
            ensure_active(ride_request)?;
            ride_request.pickup = position.point.to_owned();
            ride_request.route_epoch += 1;
            Ok((ride_request.destination.to_owned(), ride_request.route_epoch))
        })
        .await?;

    apply_route_resolution(data, ride_request_id, position.point, destination, epoch).await
}

pub async fn stop_pickup_tracking(
    data: Data<AppState>,
    ride_request_id: RideRequestId,
) -> Result<APISuccess, AppError> {
    let _ = get_ride_request(&data.ride_requests, &ride_request_id).await?;

    if let Some(tracker) = data.pickup_watches.write().await.remove(&ride_request_id) {
        tracker.stop_watching();
    }
    Ok(APISuccess::default())
}

/// Abandons a booking. Allowed any time before the settlement completes;
/// repeating a cancellation is a no-op.
pub async fn cancel_ride(
    data: Data<AppState>,
    ride_request_id: RideRequestId,
) -> Result<APISuccess, AppError> {
    with_ride_request(&data.ride_requests, &ride_request_id, |ride_request| {
        if ride_request.booking_status == BookingStatus::COMPLETED {
            return Err(AppError::RideNotActive(
                ride_request.ride_request_id.inner(),
                ride_request.booking_status.to_string(),
            ));
        }
        ride_request.booking_status = BookingStatus::CANCELLED;
        Ok(())
    })
    .await?;

    if let Some(tracker) = data.pickup_watches.write().await.remove(&ride_request_id) {
        tracker.stop_watching();
    }

    info!(tag = "[RIDE CANCELLED]", ride_request_id = %ride_request_id.inner());
    Ok(APISuccess::default())
}
