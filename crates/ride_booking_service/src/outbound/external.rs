/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use super::types::*;
use crate::common::types::*;
use crate::tools::callapi::{call_api, call_api_unwrapping_error};
use crate::tools::error::AppError;
use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};

/// Routing provider over the configured route-compute endpoint.
pub struct HttpRoutingProvider {
    route_url: Url,
}

impl HttpRoutingProvider {
    pub fn new(route_url: Url) -> HttpRoutingProvider {
        HttpRoutingProvider { route_url }
    }
}

fn map_provider_status(status: &str) -> RoutingStatus {
    match status {
        "NOT_FOUND" => RoutingStatus::NotFound,
        "ZERO_RESULTS" => RoutingStatus::NoResultsAvailable,
        "INVALID_REQUEST" => RoutingStatus::InvalidRequest,
        "UNAVAILABLE" => RoutingStatus::ServiceUnavailable,
        _ => RoutingStatus::ProviderError,
    }
}

#[async_trait]
impl RoutingProvider for HttpRoutingProvider {
    async fn route(&self, origin: &Point, destination: &Point) -> Result<ProviderRoute, AppError> {
        let response = call_api::<RouteComputeResponse, RouteComputeRequest>(
            Method::POST,
            &self.route_url,
            vec![("content-type", "application/json")],
            Some(RouteComputeRequest {
                origin: origin.to_owned(),
                destination: destination.to_owned(),
            }),
        )
        .await
        .map_err(|err| match err {
            // Transport failures are indistinguishable from a provider outage.
            AppError::ExternalAPICallError(_) => {
                AppError::RouteUnavailable(RoutingStatus::ServiceUnavailable)
            }
            err => err,
        })?;

        match response.status.as_str() {
            "OK" => response
                .routes
                .first()
                .map(|leg| ProviderRoute {
                    distance_meters: leg.distance_meters,
                    duration_seconds: leg.duration_seconds,
                })
                .ok_or(AppError::RouteUnavailable(
                    RoutingStatus::NoResultsAvailable,
                )),
            status => Err(AppError::RouteUnavailable(map_provider_status(status))),
        }
    }
}

/// Card/PIX processor over the configured authorize endpoint.
pub struct HttpPaymentGateway {
    authorize_url: Url,
}

impl HttpPaymentGateway {
    pub fn new(authorize_url: Url) -> HttpPaymentGateway {
        HttpPaymentGateway { authorize_url }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn authorize(
        &self,
        method: PaymentMethod,
        amount: Money,
        form: &PaymentFormDetails,
    ) -> Result<(), AppError> {
        let response = call_api_unwrapping_error::<AuthorizePaymentResponse, AuthorizePaymentRequest>(
            Method::POST,
            &self.authorize_url,
            vec![("content-type", "application/json")],
            Some(AuthorizePaymentRequest {
                method,
                amount,
                form: form.to_owned(),
            }),
            Box::new(|resp| match resp.status() {
                StatusCode::PAYMENT_REQUIRED | StatusCode::UNPROCESSABLE_ENTITY => {
                    AppError::ProviderDeclined(resp.status().to_string())
                }
                status => AppError::ExternalAPICallError(status.to_string()),
            }),
        )
        .await?;

        if response.approved {
            Ok(())
        } else {
            Err(AppError::ProviderDeclined(
                response
                    .reason
                    .unwrap_or_else(|| "Declined without a reason".to_string()),
            ))
        }
    }
}
