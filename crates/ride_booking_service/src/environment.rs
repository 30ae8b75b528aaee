/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
#![allow(clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use crate::common::ledger::{LedgerOperation, WalletLedger};
use crate::common::tracking::{
    DeviceLocationProvider, DeviceLocationStore, LocationOptions, LocationProvider,
    PositionTracker,
};
use crate::common::types::*;
use crate::outbound::types::{PaymentGateway, RoutingProvider};
use crate::storage::commands::{new_ride_request_store, RideRequestStore};
use crate::tools::error::AppError;
use crate::tools::logger::LoggerConfig;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tokio::sync::RwLock;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub workers: usize,
    pub logger_cfg: LoggerConfig,
    pub request_timeout: u64,
    pub max_allowed_req_size: usize,
    pub routing_provider_url: String,
    pub payment_gateway_url: String,
    pub route_retry_backoff_ms: u64,
    pub location_cfg: LocationConfig,
    pub vehicle_classes: Vec<VehicleClassConfig>,
    pub max_passenger_count: u32,
    pub wallet_seeds: Vec<WalletSeedConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocationConfig {
    pub enable_high_accuracy: bool,
    pub location_timeout_ms: u64,
    pub location_maximum_age_ms: u64,
    pub sample_interval_ms: u64,
    pub movement_threshold_meters: f64,
    pub high_accuracy_threshold_meters: f64,
    pub max_sample_accuracy_meters: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VehicleClassConfig {
    pub vehicle_class_id: String,
    pub base_fare: f64,
    pub rate_per_km: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WalletSeedConfig {
    pub owner_id: String,
    pub amount: f64,
}

#[derive(Clone)]
pub struct AppState {
    pub ride_requests: RideRequestStore,
    pub pickup_watches: Arc<RwLock<FxHashMap<RideRequestId, Arc<PositionTracker>>>>,
    pub device_locations: Arc<DeviceLocationStore>,
    pub location_provider: Arc<dyn LocationProvider>,
    pub routing_provider: Arc<dyn RoutingProvider>,
    pub payment_gateway: Arc<dyn PaymentGateway>,
    pub wallet_ledger: Arc<dyn WalletLedger>,
    pub vehicle_classes: FxHashMap<VehicleClassId, VehicleClass>,
    pub max_passenger_count: u32,
    pub route_retry_backoff_ms: u64,
    pub location_options: LocationOptions,
    pub sample_interval: Duration,
    pub movement_threshold_meters: f64,
    pub max_sample_accuracy_meters: f64,
    pub request_timeout: u64,
    pub max_allowed_req_size: usize,
}

impl AppState {
    pub async fn new(
        app_config: AppConfig,
        routing_provider: Arc<dyn RoutingProvider>,
        payment_gateway: Arc<dyn PaymentGateway>,
        wallet_ledger: Arc<dyn WalletLedger>,
    ) -> AppState {
        let device_locations = Arc::new(DeviceLocationStore::new());
        let location_provider = Arc::new(DeviceLocationProvider::new(
            device_locations.to_owned(),
            Accuracy(app_config.location_cfg.high_accuracy_threshold_meters),
        ));

        for seed in &app_config.wallet_seeds {
            wallet_ledger
                .apply_atomic(&[LedgerOperation {
                    owner: WalletOwnerId(seed.owner_id.to_owned()),
                    delta: Money::from_major_f64(seed.amount),
                    expected_version: None,
                    allow_negative: false,
                }])
                .await
                .expect("Failed to seed wallet balances");
        }

        let vehicle_classes = app_config
            .vehicle_classes
            .into_iter()
            .map(|vehicle_class| {
                (
                    VehicleClassId(vehicle_class.vehicle_class_id.to_owned()),
                    VehicleClass {
                        vehicle_class_id: VehicleClassId(vehicle_class.vehicle_class_id),
                        base_fare: Money::from_major_f64(vehicle_class.base_fare),
                        rate_per_km: Money::from_major_f64(vehicle_class.rate_per_km),
                    },
                )
            })
            .collect::<FxHashMap<VehicleClassId, VehicleClass>>();

        AppState {
            ride_requests: new_ride_request_store(),
            pickup_watches: Arc::new(RwLock::new(FxHashMap::default())),
            device_locations,
            location_provider,
            routing_provider,
            payment_gateway,
            wallet_ledger,
            vehicle_classes,
            max_passenger_count: app_config.max_passenger_count,
            route_retry_backoff_ms: app_config.route_retry_backoff_ms,
            location_options: LocationOptions {
                enable_high_accuracy: app_config.location_cfg.enable_high_accuracy,
                timeout_ms: app_config.location_cfg.location_timeout_ms,
                maximum_age_ms: app_config.location_cfg.location_maximum_age_ms,
            },
            sample_interval: Duration::from_millis(app_config.location_cfg.sample_interval_ms),
            movement_threshold_meters: app_config.location_cfg.movement_threshold_meters,
            max_sample_accuracy_meters: app_config.location_cfg.max_sample_accuracy_meters,
            request_timeout: app_config.request_timeout,
            max_allowed_req_size: app_config.max_allowed_req_size,
        }
    }

    pub fn vehicle_class(&self, vehicle_class_id: &VehicleClassId) -> Result<VehicleClass, AppError> {
        self.vehicle_classes
            .get(vehicle_class_id)
            .cloned()
            .ok_or_else(|| AppError::VehicleClassNotFound(vehicle_class_id.inner()))
    }

    /// A tracker over the injected location provider, used both for one-shot
    /// pickup fixes and the continuous pickup watch.
    pub fn position_tracker(&self, passenger_id: &PassengerId) -> PositionTracker {
        PositionTracker::new(
            self.location_provider.to_owned(),
            passenger_id.to_owned(),
            self.location_options.to_owned(),
            self.sample_interval,
            self.movement_threshold_meters,
        )
    }
}
