/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
#![allow(clippy::expect_used)]

use crate::common::types::*;
use crate::common::utils::distance_between_in_meters;
use crate::tools::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

// GPS jitter suppression threshold (10 m / 0.01 km).
pub const DEFAULT_MOVEMENT_THRESHOLD_METERS: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct LocationOptions {
    pub enable_high_accuracy: bool,
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
}

/// One-shot device position source, injected so tests can script fixes. The
/// continuous watch is owned by [`PositionTracker`], which samples this
/// provider on an interval.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(
        &self,
        passenger_id: &PassengerId,
        options: &LocationOptions,
    ) -> Result<Position, AppError>;
}

pub type OnPosition = Arc<dyn Fn(Position) + Send + Sync>;
pub type OnError = Arc<dyn Fn(AppError) + Send + Sync>;

struct DeliveryState {
    active: bool,
    last_delivered: Option<Point>,
}

/// Samples a passenger's device position and delivers filtered updates.
///
/// At most one watch is active per tracker. The delivery flag and every
/// callback share one mutex, so `stop_watching` is effective before the next
/// sample fires: once it returns, no further callback runs.
pub struct PositionTracker {
    provider: Arc<dyn LocationProvider>,
    passenger_id: PassengerId,
    options: LocationOptions,
    sample_interval: Duration,
    movement_threshold_meters: f64,
    delivery: Arc<Mutex<DeliveryState>>,
    watch: Mutex<Option<JoinHandle<()>>>,
}

impl PositionTracker {
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        passenger_id: PassengerId,
        options: LocationOptions,
        sample_interval: Duration,
        movement_threshold_meters: f64,
    ) -> PositionTracker {
        PositionTracker {
            provider,
            passenger_id,
            options,
            sample_interval,
            movement_threshold_meters,
            delivery: Arc::new(Mutex::new(DeliveryState {
                active: false,
                last_delivered: None,
            })),
            watch: Mutex::new(None),
        }
    }

    /// One-shot position fix, bounded by the configured timeout.
    pub async fn current_position(&self) -> Result<Position, AppError> {
        tokio::time::timeout(
            Duration::from_millis(self.options.timeout_ms),
            self.provider
                .current_position(&self.passenger_id, &self.options),
        )
        .await
        .map_err(|_| {
            AppError::LocationUnavailable(format!(
                "No position fix within {}ms",
                self.options.timeout_ms
            ))
        })?
    }

    /// Begins continuous sampling. Idempotent: a second call while a watch is
    /// active does not start another one.
    ///
    /// The first sampled position is always delivered; afterwards a sample is
    /// only delivered when its haversine distance from the last delivered
    /// position exceeds the movement threshold.
    pub fn start_watching(&self, on_position: OnPosition, on_error: OnError) {
        let mut watch = self.watch.lock().expect("tracker watch lock poisoned");
        if watch.is_some() {
            return;
        }

        {
            let mut delivery = self.delivery.lock().expect("tracker delivery lock poisoned");
            delivery.active = true;
            delivery.last_delivered = None;
        }

        let provider = self.provider.to_owned();
        let passenger_id = self.passenger_id.to_owned();
        let options = self.options.to_owned();
        let delivery = self.delivery.to_owned();
        let threshold = self.movement_threshold_meters;
        let sample_interval = self.sample_interval;

        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(sample_interval);
            loop {
                timer.tick().await;
                match provider.current_position(&passenger_id, &options).await {
                    Ok(position) => {
                        let mut state =
                            delivery.lock().expect("tracker delivery lock poisoned");
                        if !state.active {
                            break;
                        }
                        let moved_enough = state
                            .last_delivered
                            .as_ref()
                            .map(|last| {
                                distance_between_in_meters(last, &position.point) > threshold
                            })
                            .unwrap_or(true);
                        if moved_enough {
                            state.last_delivered = Some(position.point.to_owned());
                            on_position(position);
                        }
                    }
                    Err(err) => {
                        let state = delivery.lock().expect("tracker delivery lock poisoned");
                        if !state.active {
                            break;
                        }
                        on_error(err);
                    }
                }
            }
        });

        *watch = Some(handle);
    }

    /// Cancels the active watch. Idempotent; safe to call during teardown.
    pub fn stop_watching(&self) {
        let mut watch = self.watch.lock().expect("tracker watch lock poisoned");
        if let Some(handle) = watch.take() {
            {
                let mut delivery = self.delivery.lock().expect("tracker delivery lock poisoned");
                delivery.active = false;
            }
            handle.abort();
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watch
            .lock()
            .expect("tracker watch lock poisoned")
            .is_some()
    }
}

impl Drop for PositionTracker {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

/// Freshest raw GPS sample per passenger, fed by the device update endpoint.
#[derive(Debug, Clone)]
pub struct DeviceSample {
    pub point: Point,
    pub accuracy: Accuracy,
    pub captured_at: TimeStamp,
}

#[derive(Default)]
pub struct DeviceLocationStore {
    samples: RwLock<FxHashMap<PassengerId, DeviceSample>>,
}

impl DeviceLocationStore {
    pub fn new() -> DeviceLocationStore {
        DeviceLocationStore::default()
    }

    /// Records a sample, keeping only the freshest per passenger.
    pub async fn record(&self, passenger_id: &PassengerId, sample: DeviceSample) {
        let mut samples = self.samples.write().await;
        match samples.get(passenger_id) {
            Some(existing) if existing.captured_at > sample.captured_at => {}
            _ => {
                samples.insert(passenger_id.to_owned(), sample);
            }
        }
    }

    pub async fn latest(&self, passenger_id: &PassengerId) -> Option<DeviceSample> {
        self.samples.read().await.get(passenger_id).cloned()
    }
}

/// LocationProvider over the device feed: honours `maximum_age_ms` and, when
/// high accuracy is requested, the accuracy gate.
pub struct DeviceLocationProvider {
    store: Arc<DeviceLocationStore>,
    high_accuracy_threshold: Accuracy,
}

impl DeviceLocationProvider {
    pub fn new(
        store: Arc<DeviceLocationStore>,
        high_accuracy_threshold: Accuracy,
    ) -> DeviceLocationProvider {
        DeviceLocationProvider {
            store,
            high_accuracy_threshold,
        }
    }
}

#[async_trait]
impl LocationProvider for DeviceLocationProvider {
    async fn current_position(
        &self,
        passenger_id: &PassengerId,
        options: &LocationOptions,
    ) -> Result<Position, AppError> {
        let sample = self.store.latest(passenger_id).await.ok_or_else(|| {
            AppError::LocationUnavailable("No device position has been reported".to_string())
        })?;

        let age_ms = (Utc::now() - sample.captured_at.inner()).num_milliseconds();
        if age_ms > options.maximum_age_ms as i64 {
            return Err(AppError::LocationUnavailable(format!(
                "Last reported position is {age_ms}ms old"
            )));
        }

        if options.enable_high_accuracy && sample.accuracy > self.high_accuracy_threshold {
            return Err(AppError::LocationUnavailable(format!(
                "Device fix accuracy {} is above the {}m high accuracy gate",
                sample.accuracy.inner(),
                self.high_accuracy_threshold.inner()
            )));
        }

        Ok(Position {
            point: sample.point,
            accuracy: sample.accuracy,
            captured_at: sample.captured_at,
        })
    }
}
