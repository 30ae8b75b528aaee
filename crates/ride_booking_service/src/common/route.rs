/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use crate::outbound::types::RoutingProvider;
use crate::tools::error::AppError;

/// Resolves the route between two points and normalizes provider units:
/// meters become kilometers, seconds become whole minutes (nearest).
///
/// Never retries — NOT_FOUND and INVALID_REQUEST are deterministic, and the
/// caller owns the single backoff retry for transient provider failures.
pub async fn resolve_route(
    provider: &dyn RoutingProvider,
    origin: &Point,
    destination: &Point,
) -> Result<Route, AppError> {
    let provider_route = provider.route(origin, destination).await?;

    Ok(Route {
        distance: Kilometers(provider_route.distance_meters / 1000.0),
        duration: Minutes((provider_route.duration_seconds / 60.0).round() as u32),
    })
}
