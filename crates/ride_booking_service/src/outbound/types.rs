/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use crate::tools::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Raw provider route before unit normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRoute {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// External routing service, injected so tests can script routes. Stateless
/// between calls; never retries on its own.
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn route(&self, origin: &Point, destination: &Point) -> Result<ProviderRoute, AppError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteComputeRequest {
    pub origin: Point,
    pub destination: Point,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteComputeResponse {
    pub status: String,
    #[serde(default)]
    pub routes: Vec<RouteLeg>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RouteLeg {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// Card/PIX processor, injected behind the settlement engine.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Authorizes the amount against the submitted form. A decline surfaces
    /// as `AppError::ProviderDeclined` carrying the provider's reason.
    async fn authorize(
        &self,
        method: PaymentMethod,
        amount: Money,
        form: &PaymentFormDetails,
    ) -> Result<(), AppError>;
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFormDetails {
    pub card_holder_name: Option<String>,
    pub card_number_token: Option<String>,
    pub pix_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizePaymentRequest {
    pub method: PaymentMethod,
    pub amount: Money,
    pub form: PaymentFormDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizePaymentResponse {
    pub approved: bool,
    pub reason: Option<String>,
}
