/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use actix_web::web::Data;
use async_trait::async_trait;
use chrono::Utc;
use ride_booking_service::common::ledger::InMemoryWalletLedger;
use ride_booking_service::common::types::*;
use ride_booking_service::domain::action::internal::ride as internal_ride;
use ride_booking_service::domain::action::internal::wallet as internal_wallet;
use ride_booking_service::domain::action::ui::{location, payment, ride};
use ride_booking_service::domain::types::internal::ride::AssignDriverRequest;
use ride_booking_service::domain::types::internal::wallet::WalletTopupRequest;
use ride_booking_service::domain::types::ui::location::UpdateDeviceLocationRequest;
use ride_booking_service::domain::types::ui::payment::*;
use ride_booking_service::domain::types::ui::ride::*;
use ride_booking_service::environment::{
    AppConfig, AppState, LocationConfig, VehicleClassConfig, WalletSeedConfig,
};
use ride_booking_service::outbound::types::{
    PaymentFormDetails, PaymentGateway, ProviderRoute, RoutingProvider,
};
use ride_booking_service::tools::error::AppError;
use ride_booking_service::tools::logger::{LogLevel, LoggerConfig};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct FixedRoutingProvider {
    distance_meters: f64,
    duration_seconds: f64,
}

#[async_trait]
impl RoutingProvider for FixedRoutingProvider {
    async fn route(&self, _origin: &Point, _destination: &Point) -> Result<ProviderRoute, AppError> {
        Ok(ProviderRoute {
            distance_meters: self.distance_meters,
            duration_seconds: self.duration_seconds,
        })
    }
}

struct SwitchableRoutingProvider {
    distance_meters: Mutex<f64>,
}

impl SwitchableRoutingProvider {
    fn set_distance(&self, distance_meters: f64) {
        *self.distance_meters.lock().expect("distance lock") = distance_meters;
    }
}

#[async_trait]
impl RoutingProvider for SwitchableRoutingProvider {
    async fn route(&self, _origin: &Point, _destination: &Point) -> Result<ProviderRoute, AppError> {
        let distance_meters = *self.distance_meters.lock().expect("distance lock");
        Ok(ProviderRoute {
            distance_meters,
            duration_seconds: distance_meters / 10.0,
        })
    }
}

/// Replays scripted authorization outcomes, approving once exhausted.
struct ScriptedGateway {
    outcomes: Mutex<VecDeque<Result<(), String>>>,
}

impl ScriptedGateway {
    fn approving() -> ScriptedGateway {
        ScriptedGateway {
            outcomes: Mutex::new(VecDeque::new()),
        }
    }

    fn scripted(outcomes: Vec<Result<(), String>>) -> ScriptedGateway {
        ScriptedGateway {
            outcomes: Mutex::new(outcomes.into()),
        }
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn authorize(
        &self,
        _method: PaymentMethod,
        _amount: Money,
        _form: &PaymentFormDetails,
    ) -> Result<(), AppError> {
        match self.outcomes.lock().expect("gateway lock").pop_front() {
            Some(Err(reason)) => Err(AppError::ProviderDeclined(reason)),
            _ => Ok(()),
        }
    }
}

fn test_config(wallet_seeds: &[(&str, f64)]) -> AppConfig {
    AppConfig {
        port: 0,
        workers: 1,
        logger_cfg: LoggerConfig {
            level: LogLevel::OFF,
            log_to_file: false,
        },
        request_timeout: 5000,
        max_allowed_req_size: 512_000,
        routing_provider_url: "http://127.0.0.1:1/maps/computeRoute".to_string(),
        payment_gateway_url: "http://127.0.0.1:1/payments/authorize".to_string(),
        route_retry_backoff_ms: 10,
        location_cfg: LocationConfig {
            enable_high_accuracy: false,
            location_timeout_ms: 300,
            location_maximum_age_ms: 60_000,
            sample_interval_ms: 10,
            movement_threshold_meters: 10.0,
            high_accuracy_threshold_meters: 50.0,
            max_sample_accuracy_meters: 500.0,
        },
        vehicle_classes: vec![
            VehicleClassConfig {
                vehicle_class_id: "serv-x".to_string(),
                base_fare: 5.0,
                rate_per_km: 2.0,
            },
            VehicleClassConfig {
                vehicle_class_id: "serv-black".to_string(),
                base_fare: 12.0,
                rate_per_km: 3.75,
            },
        ],
        max_passenger_count: 6,
        wallet_seeds: wallet_seeds
            .iter()
            .map(|(owner_id, amount)| WalletSeedConfig {
                owner_id: owner_id.to_string(),
                amount: *amount,
            })
            .collect(),
    }
}

async fn app_state(
    routing_provider: Arc<dyn RoutingProvider>,
    payment_gateway: Arc<dyn PaymentGateway>,
    wallet_seeds: &[(&str, f64)],
) -> Data<AppState> {
    Data::new(
        AppState::new(
            test_config(wallet_seeds),
            routing_provider,
            payment_gateway,
            Arc::new(InMemoryWalletLedger::new()),
        )
        .await,
    )
}

fn point(lat: f64, lon: f64) -> Point {
    Point {
        lat: Latitude(lat),
        lon: Longitude(lon),
    }
}

fn money(amount: f64) -> Money {
    Money::from_major_f64(amount)
}

fn booking_request(pickup: Option<Point>) -> BookRideRequest {
    BookRideRequest {
        pickup,
        destination: point(-23.5614, -46.6559),
        vehicle_class_id: VehicleClassId("serv-x".to_string()),
        passenger_count: 1,
    }
}

fn passenger() -> PassengerId {
    PassengerId("passenger-1".to_string())
}

async fn book(data: &Data<AppState>) -> RideRequest {
    ride::book_ride(
        data.clone(),
        passenger(),
        booking_request(Some(point(-23.5505, -46.6333))),
    )
    .await
    .expect("booking failed")
}

async fn feed_device_position(data: &Data<AppState>, pt: Point) {
    location::update_device_location(
        data.clone(),
        passenger(),
        vec![UpdateDeviceLocationRequest {
            pt,
            ts: TimeStamp(Utc::now()),
            acc: Accuracy(5.0),
        }],
    )
    .await
    .expect("device update failed");
}

async fn wallet_amount(data: &Data<AppState>, owner: &str) -> Money {
    internal_wallet::wallet_balance(data.clone(), WalletOwnerId(owner.to_string()))
        .await
        .expect("balance read failed")
        .amount
}

#[tokio::test]
async fn booking_returns_the_expected_quote() {
    let data = app_state(
        Arc::new(FixedRoutingProvider {
            distance_meters: 5700.0,
            duration_seconds: 754.0,
        }),
        Arc::new(ScriptedGateway::approving()),
        &[],
    )
    .await;

    let ride_request = book(&data).await;

    assert_eq!(ride_request.route.distance, Kilometers(5.7));
    assert_eq!(ride_request.route.duration, Minutes(13));
    assert_eq!(ride_request.fare.exact, money(16.40));
    assert_eq!(ride_request.fare.range_min, money(15.0));
    assert_eq!(ride_request.fare.range_max, money(18.0));
    assert_eq!(ride_request.booking_status, BookingStatus::ACTIVE);
}

#[tokio::test]
async fn booking_falls_back_to_the_device_position() {
    let data = app_state(
        Arc::new(FixedRoutingProvider {
            distance_meters: 5700.0,
            duration_seconds: 754.0,
        }),
        Arc::new(ScriptedGateway::approving()),
        &[],
    )
    .await;

    let ride_request = ride::book_ride(data.clone(), passenger(), booking_request(None)).await;
    assert!(matches!(
        ride_request,
        Err(AppError::LocationUnavailable(_))
    ));

    feed_device_position(&data, point(-23.5505, -46.6333)).await;
    let ride_request = ride::book_ride(data.clone(), passenger(), booking_request(None))
        .await
        .expect("booking failed");
    assert_eq!(ride_request.pickup, point(-23.5505, -46.6333));
}

#[tokio::test]
async fn wallet_settlement_debits_the_passenger() {
    let data = app_state(
        Arc::new(FixedRoutingProvider {
            distance_meters: 15250.0,
            duration_seconds: 1800.0,
        }),
        Arc::new(ScriptedGateway::approving()),
        &[("passenger-1", 50.75)],
    )
    .await;

    let ride_request = book(&data).await;
    assert_eq!(ride_request.fare.exact, money(35.50));

    let session = payment::select_payment_method(
        data.clone(),
        ride_request.ride_request_id.clone(),
        SelectPaymentMethodRequest {
            method: PaymentMethod::Wallet,
        },
    )
    .await
    .expect("wallet settlement failed");

    assert_eq!(session.state, SettlementState::Complete);
    assert_eq!(wallet_amount(&data, "passenger-1").await, money(15.25));

    let ride_request = ride::get_ride(data.clone(), ride_request.ride_request_id).await.expect("lookup failed");
    assert_eq!(ride_request.booking_status, BookingStatus::COMPLETED);
}

#[tokio::test]
async fn insufficient_wallet_balance_keeps_method_selection_open() {
    let data = app_state(
        Arc::new(FixedRoutingProvider {
            distance_meters: 15250.0,
            duration_seconds: 1800.0,
        }),
        Arc::new(ScriptedGateway::approving()),
        &[("passenger-1", 10.0)],
    )
    .await;

    let ride_request = book(&data).await;

    let result = payment::select_payment_method(
        data.clone(),
        ride_request.ride_request_id.clone(),
        SelectPaymentMethodRequest {
            method: PaymentMethod::Wallet,
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::InsufficientWalletBalance)));
    assert_eq!(wallet_amount(&data, "passenger-1").await, money(10.0));

    let session = payment::get_payment_session(data.clone(), ride_request.ride_request_id.clone())
        .await
        .expect("session lookup failed");
    assert_eq!(session.state, SettlementState::MethodSelection);

    // A top-up unblocks the same method.
    internal_wallet::topup_wallet(
        data.clone(),
        WalletOwnerId("passenger-1".to_string()),
        WalletTopupRequest {
            amount: money(30.0),
        },
    )
    .await
    .expect("topup failed");

    let session = payment::select_payment_method(
        data.clone(),
        ride_request.ride_request_id,
        SelectPaymentMethodRequest {
            method: PaymentMethod::Wallet,
        },
    )
    .await
    .expect("settlement failed after topup");
    assert_eq!(session.state, SettlementState::Complete);
    assert_eq!(wallet_amount(&data, "passenger-1").await, money(4.50));
}

#[tokio::test]
async fn cash_with_change_returned_physically() {
    let data = app_state(
        Arc::new(FixedRoutingProvider {
            distance_meters: 5700.0,
            duration_seconds: 754.0,
        }),
        Arc::new(ScriptedGateway::approving()),
        &[("driver-7", 100.0), ("passenger-1", 5.0)],
    )
    .await;

    let ride_request = book(&data).await;
    let ride_request_id = ride_request.ride_request_id;

    let session = payment::select_payment_method(
        data.clone(),
        ride_request_id.clone(),
        SelectPaymentMethodRequest {
            method: PaymentMethod::Cash,
        },
    )
    .await
    .expect("cash selection failed");
    assert_eq!(session.state, SettlementState::AmountEntry);

    // Under-tendering is rejected and the stored session stays put.
    let rejected = payment::submit_cash_amount(
        data.clone(),
        ride_request_id.clone(),
        SubmitCashAmountRequest {
            amount_tendered: money(15.0),
        },
    )
    .await;
    assert!(matches!(rejected, Err(AppError::InvalidCashAmount(_))));
    let session = payment::get_payment_session(data.clone(), ride_request_id.clone())
        .await
        .expect("session lookup failed");
    assert_eq!(session.state, SettlementState::AmountEntry);

    let session = payment::submit_cash_amount(
        data.clone(),
        ride_request_id.clone(),
        SubmitCashAmountRequest {
            amount_tendered: money(20.0),
        },
    )
    .await
    .expect("cash entry failed");
    assert_eq!(session.state, SettlementState::DriverConfirmation);
    assert_eq!(session.change_due, Some(money(3.60)));
    assert_eq!(
        session.amount_due + session.change_due.expect("change due"),
        session.amount_tendered.expect("amount tendered")
    );

    // The driver has to be assigned before the change decision.
    let unassigned = payment::confirm_change_disposition(
        data.clone(),
        ride_request_id.clone(),
        ConfirmChangeDispositionRequest {
            disposition: ChangeDisposition::ReturnCash,
        },
    )
    .await;
    assert!(matches!(unassigned, Err(AppError::DriverNotAssigned(_))));

    internal_ride::assign_driver(
        data.clone(),
        ride_request_id.clone(),
        AssignDriverRequest {
            driver_id: DriverId("driver-7".to_string()),
        },
    )
    .await
    .expect("driver assignment failed");

    let session = payment::confirm_change_disposition(
        data.clone(),
        ride_request_id.clone(),
        ConfirmChangeDispositionRequest {
            disposition: ChangeDisposition::ReturnCash,
        },
    )
    .await
    .expect("disposition failed");
    assert_eq!(session.state, SettlementState::Complete);

    // Physically returned change never touches the ledger.
    assert_eq!(wallet_amount(&data, "driver-7").await, money(100.0));
    assert_eq!(wallet_amount(&data, "passenger-1").await, money(5.0));

    let ride_request = ride::get_ride(data.clone(), ride_request_id).await.expect("lookup failed");
    assert_eq!(ride_request.booking_status, BookingStatus::COMPLETED);
}

#[tokio::test]
async fn cash_change_credited_to_the_wallet_conserves_money() {
    let data = app_state(
        Arc::new(FixedRoutingProvider {
            distance_meters: 5700.0,
            duration_seconds: 754.0,
        }),
        Arc::new(ScriptedGateway::approving()),
        &[("driver-7", 100.0), ("passenger-1", 5.0)],
    )
    .await;

    let ride_request = book(&data).await;
    let ride_request_id = ride_request.ride_request_id;

    internal_ride::assign_driver(
        data.clone(),
        ride_request_id.clone(),
        AssignDriverRequest {
            driver_id: DriverId("driver-7".to_string()),
        },
    )
    .await
    .expect("driver assignment failed");

    payment::select_payment_method(
        data.clone(),
        ride_request_id.clone(),
        SelectPaymentMethodRequest {
            method: PaymentMethod::Cash,
        },
    )
    .await
    .expect("cash selection failed");

    payment::submit_cash_amount(
        data.clone(),
        ride_request_id.clone(),
        SubmitCashAmountRequest {
            amount_tendered: money(20.0),
        },
    )
    .await
    .expect("cash entry failed");

    let before_total =
        wallet_amount(&data, "driver-7").await + wallet_amount(&data, "passenger-1").await;

    let session = payment::confirm_change_disposition(
        data.clone(),
        ride_request_id,
        ConfirmChangeDispositionRequest {
            disposition: ChangeDisposition::CreditWallet,
        },
    )
    .await
    .expect("disposition failed");
    assert_eq!(session.state, SettlementState::Complete);
    assert_eq!(
        session.change_disposition,
        Some(ChangeDisposition::CreditWallet)
    );

    assert_eq!(wallet_amount(&data, "driver-7").await, money(96.40));
    assert_eq!(wallet_amount(&data, "passenger-1").await, money(8.60));
    assert_eq!(
        wallet_amount(&data, "driver-7").await + wallet_amount(&data, "passenger-1").await,
        before_total
    );
}

#[tokio::test]
async fn exact_cash_skips_the_driver_confirmation() {
    let data = app_state(
        Arc::new(FixedRoutingProvider {
            distance_meters: 5700.0,
            duration_seconds: 754.0,
        }),
        Arc::new(ScriptedGateway::approving()),
        &[],
    )
    .await;

    let ride_request = book(&data).await;

    payment::select_payment_method(
        data.clone(),
        ride_request.ride_request_id.clone(),
        SelectPaymentMethodRequest {
            method: PaymentMethod::Cash,
        },
    )
    .await
    .expect("cash selection failed");

    let session = payment::submit_cash_amount(
        data.clone(),
        ride_request.ride_request_id.clone(),
        SubmitCashAmountRequest {
            amount_tendered: money(16.40),
        },
    )
    .await
    .expect("cash entry failed");

    assert_eq!(session.state, SettlementState::Complete);
    assert_eq!(session.change_due, Some(Money(0)));

    let ride_request = ride::get_ride(data.clone(), ride_request.ride_request_id)
        .await
        .expect("lookup failed");
    assert_eq!(ride_request.booking_status, BookingStatus::COMPLETED);
}

#[tokio::test]
async fn declined_card_can_be_retried_from_the_form() {
    let data = app_state(
        Arc::new(FixedRoutingProvider {
            distance_meters: 5700.0,
            duration_seconds: 754.0,
        }),
        Arc::new(ScriptedGateway::scripted(vec![
            Err("Card limit exceeded".to_string()),
            Ok(()),
        ])),
        &[],
    )
    .await;

    let ride_request = book(&data).await;
    let ride_request_id = ride_request.ride_request_id;

    let session = payment::select_payment_method(
        data.clone(),
        ride_request_id.clone(),
        SelectPaymentMethodRequest {
            method: PaymentMethod::Card,
        },
    )
    .await
    .expect("card selection failed");
    assert_eq!(session.state, SettlementState::FormEntry);

    let form = PaymentFormDetails {
        card_holder_name: Some("J Passenger".to_string()),
        card_number_token: Some("tok_4242".to_string()),
        pix_key: None,
    };

    let declined =
        payment::confirm_card_payment(data.clone(), ride_request_id.clone(), form.clone()).await;
    assert!(matches!(declined, Err(AppError::ProviderDeclined(_))));

    let session = payment::get_payment_session(data.clone(), ride_request_id.clone())
        .await
        .expect("session lookup failed");
    assert_eq!(session.state, SettlementState::FormEntry);

    let session = payment::confirm_card_payment(data.clone(), ride_request_id, form)
        .await
        .expect("card retry failed");
    assert_eq!(session.state, SettlementState::Complete);
}

#[tokio::test]
async fn switching_method_reenters_selection_until_terminal() {
    let data = app_state(
        Arc::new(FixedRoutingProvider {
            distance_meters: 5700.0,
            duration_seconds: 754.0,
        }),
        Arc::new(ScriptedGateway::approving()),
        &[("passenger-1", 50.0)],
    )
    .await;

    let ride_request = book(&data).await;
    let ride_request_id = ride_request.ride_request_id;

    let session = payment::select_payment_method(
        data.clone(),
        ride_request_id.clone(),
        SelectPaymentMethodRequest {
            method: PaymentMethod::Cash,
        },
    )
    .await
    .expect("cash selection failed");
    assert_eq!(session.state, SettlementState::AmountEntry);

    let session = payment::select_payment_method(
        data.clone(),
        ride_request_id.clone(),
        SelectPaymentMethodRequest {
            method: PaymentMethod::Wallet,
        },
    )
    .await
    .expect("method switch failed");
    assert_eq!(session.state, SettlementState::Complete);

    // A terminal session is frozen.
    let frozen = payment::select_payment_method(
        data.clone(),
        ride_request_id,
        SelectPaymentMethodRequest {
            method: PaymentMethod::Cash,
        },
    )
    .await;
    assert!(matches!(frozen, Err(AppError::RideNotActive(_, _))));
}

#[tokio::test]
async fn vehicle_class_change_recomputes_the_fare() {
    let data = app_state(
        Arc::new(FixedRoutingProvider {
            distance_meters: 5700.0,
            duration_seconds: 754.0,
        }),
        Arc::new(ScriptedGateway::approving()),
        &[],
    )
    .await;

    let ride_request = book(&data).await;
    assert_eq!(ride_request.fare.exact, money(16.40));

    let ride_request = ride::update_vehicle_class(
        data.clone(),
        ride_request.ride_request_id,
        UpdateVehicleClassRequest {
            vehicle_class_id: VehicleClassId("serv-black".to_string()),
        },
    )
    .await
    .expect("class change failed");

    // 12 + 5.7 * 3.75
    assert_eq!(ride_request.fare.exact, money(33.38));
    assert_eq!(
        ride_request.fare.vehicle_class_id,
        VehicleClassId("serv-black".to_string())
    );
}

#[tokio::test]
async fn destination_change_reresolves_the_route() {
    let routing = Arc::new(SwitchableRoutingProvider {
        distance_meters: Mutex::new(5700.0),
    });
    let data = app_state(
        routing.clone(),
        Arc::new(ScriptedGateway::approving()),
        &[],
    )
    .await;

    let ride_request = book(&data).await;
    assert_eq!(ride_request.fare.exact, money(16.40));

    routing.set_distance(12_000.0);
    let ride_request = ride::update_destination(
        data.clone(),
        ride_request.ride_request_id,
        UpdateDestinationRequest {
            destination: point(-23.6821, -46.8754),
        },
    )
    .await
    .expect("destination change failed");

    assert_eq!(ride_request.route.distance, Kilometers(12.0));
    // 5 + 12 * 2
    assert_eq!(ride_request.fare.exact, money(29.0));
}

#[tokio::test]
async fn cancelled_ride_rejects_further_settlement() {
    let data = app_state(
        Arc::new(FixedRoutingProvider {
            distance_meters: 5700.0,
            duration_seconds: 754.0,
        }),
        Arc::new(ScriptedGateway::approving()),
        &[],
    )
    .await;

    let ride_request = book(&data).await;
    let ride_request_id = ride_request.ride_request_id;

    ride::cancel_ride(data.clone(), ride_request_id.clone())
        .await
        .expect("cancel failed");

    let ride_request = ride::get_ride(data.clone(), ride_request_id.clone())
        .await
        .expect("lookup failed");
    assert_eq!(ride_request.booking_status, BookingStatus::CANCELLED);

    let rejected = payment::select_payment_method(
        data.clone(),
        ride_request_id,
        SelectPaymentMethodRequest {
            method: PaymentMethod::Cash,
        },
    )
    .await;
    assert!(matches!(rejected, Err(AppError::RideNotActive(_, _))));
}

#[tokio::test]
async fn pickup_tracking_follows_the_device() {
    let data = app_state(
        Arc::new(FixedRoutingProvider {
            distance_meters: 5700.0,
            duration_seconds: 754.0,
        }),
        Arc::new(ScriptedGateway::approving()),
        &[],
    )
    .await;

    feed_device_position(&data, point(0.0, 0.0)).await;
    let ride_request = ride::book_ride(data.clone(), passenger(), booking_request(None))
        .await
        .expect("booking failed");
    let ride_request_id = ride_request.ride_request_id;
    assert_eq!(ride_request.pickup, point(0.0, 0.0));

    ride::start_pickup_tracking(data.clone(), ride_request_id.clone())
        .await
        .expect("tracking start failed");
    // Starting again is a no-op.
    ride::start_pickup_tracking(data.clone(), ride_request_id.clone())
        .await
        .expect("tracking restart failed");

    // ~1.1 km of movement, well past the jitter threshold.
    feed_device_position(&data, point(0.0, 0.01)).await;

    let mut moved = false;
    for _ in 0..100 {
        let ride_request = ride::get_ride(data.clone(), ride_request_id.clone())
            .await
            .expect("lookup failed");
        if ride_request.pickup == point(0.0, 0.01) {
            moved = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(moved, "pickup did not follow the device position");

    ride::stop_pickup_tracking(data.clone(), ride_request_id.clone())
        .await
        .expect("tracking stop failed");

    // After the stop, further movement is ignored.
    feed_device_position(&data, point(0.0, 0.05)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let ride_request = ride::get_ride(data.clone(), ride_request_id)
        .await
        .expect("lookup failed");
    assert_eq!(ride_request.pickup, point(0.0, 0.01));
}
