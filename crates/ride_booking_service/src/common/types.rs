/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{Display, EnumString};

#[derive(Deserialize, Serialize, Clone, Debug, Eq, Hash, PartialEq)]
#[macros::impl_getter]
pub struct RideRequestId(pub String);
#[derive(Deserialize, Serialize, Clone, Debug, Eq, Hash, PartialEq)]
#[macros::impl_getter]
pub struct PassengerId(pub String);
#[derive(Deserialize, Serialize, Clone, Debug, Eq, Hash, PartialEq)]
#[macros::impl_getter]
pub struct DriverId(pub String);
#[derive(Deserialize, Serialize, Clone, Debug, Eq, Hash, PartialEq)]
#[macros::impl_getter]
pub struct VehicleClassId(pub String);
#[derive(Deserialize, Serialize, Clone, Debug, Eq, Hash, PartialEq)]
#[macros::impl_getter]
pub struct WalletOwnerId(pub String);
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Copy)]
#[macros::impl_getter]
pub struct Latitude(pub f64);
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Copy)]
#[macros::impl_getter]
pub struct Longitude(pub f64);
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, PartialOrd, Copy)]
#[macros::impl_getter]
pub struct Accuracy(pub f64);
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, PartialOrd, Copy)]
#[macros::impl_getter]
pub struct Kilometers(pub f64);
#[derive(Deserialize, Serialize, Clone, Debug, Eq, PartialEq, PartialOrd, Copy)]
#[macros::impl_getter]
pub struct Minutes(pub u32);
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Hash, Ord)]
#[macros::impl_getter]
pub struct TimeStamp(pub DateTime<Utc>);

/// Monetary amount in minor currency units (cents). All ledger arithmetic is
/// integer arithmetic; the JSON representation carries major units (16.40).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Money(pub i64);

impl Money {
    pub fn from_major_f64(amount: f64) -> Money {
        Money((amount * 100.0).round() as i64)
    }

    pub fn as_major_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Rounds to the nearest whole currency unit (14.76 -> 15.00).
    pub fn round_to_unit(&self) -> Money {
        Money((self.0 as f64 / 100.0).round() as i64 * 100)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl std::ops::Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl std::ops::Neg for Money {
    type Output = Money;
    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.as_major_f64())
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.as_major_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{Error, Unexpected};

        struct MoneyVisitor;

        impl<'de> serde::de::Visitor<'de> for MoneyVisitor {
            type Value = Money;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str(
                    "a number (integer/float) or a string containing a monetary amount",
                )
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
            where
                E: Error,
            {
                Ok(Money::from_major_f64(value))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
                Ok(Money::from_major_f64(v as f64))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Money::from_major_f64(v as f64))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                value
                    .parse::<f64>()
                    .map(Money::from_major_f64)
                    .map_err(|_| Error::invalid_value(Unexpected::Str(value), &self))
            }
        }

        deserializer.deserialize_any(MoneyVisitor)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Point {
    pub lat: Latitude,
    pub lon: Longitude,
}

/// A device fix. Ephemeral: produced by the tracker, consumed immediately.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub point: Point,
    pub accuracy: Accuracy,
    pub captured_at: TimeStamp,
}

/// Normalized routing provider output, owned by the booking session.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub distance: Kilometers,
    pub duration: Minutes,
}

/// A fare tier. Static configuration, read-only to the engine.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VehicleClass {
    pub vehicle_class_id: VehicleClassId,
    pub base_fare: Money,
    pub rate_per_km: Money,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FareQuote {
    pub vehicle_class_id: VehicleClassId,
    pub exact: Money,
    pub range_min: Money,
    pub range_max: Money,
}

#[derive(
    Debug, Clone, Copy, EnumString, Display, Serialize, Deserialize, Eq, Hash, PartialEq,
)]
pub enum PaymentMethod {
    #[strum(serialize = "WALLET")]
    #[serde(rename = "WALLET")]
    Wallet,
    #[strum(serialize = "CARD")]
    #[serde(rename = "CARD")]
    Card,
    #[strum(serialize = "PIX")]
    #[serde(rename = "PIX")]
    Pix,
    #[strum(serialize = "CASH")]
    #[serde(rename = "CASH")]
    Cash,
}

#[derive(
    Debug, Clone, Copy, EnumString, Display, Serialize, Deserialize, Eq, Hash, PartialEq,
)]
pub enum ChangeDisposition {
    #[strum(serialize = "RETURN_CASH")]
    #[serde(rename = "RETURN_CASH")]
    ReturnCash,
    #[strum(serialize = "CREDIT_WALLET")]
    #[serde(rename = "CREDIT_WALLET")]
    CreditWallet,
}

/// Observable resting states of a settlement. Balance checks and provider
/// confirmation happen inside a single transition and are never persisted.
#[derive(
    Debug, Clone, Copy, EnumString, Display, Serialize, Deserialize, Eq, Hash, PartialEq,
)]
pub enum SettlementState {
    #[strum(serialize = "METHOD_SELECTION")]
    #[serde(rename = "METHOD_SELECTION")]
    MethodSelection,
    #[strum(serialize = "FORM_ENTRY")]
    #[serde(rename = "FORM_ENTRY")]
    FormEntry,
    #[strum(serialize = "AMOUNT_ENTRY")]
    #[serde(rename = "AMOUNT_ENTRY")]
    AmountEntry,
    #[strum(serialize = "DRIVER_CONFIRMATION")]
    #[serde(rename = "DRIVER_CONFIRMATION")]
    DriverConfirmation,
    #[strum(serialize = "COMPLETE")]
    #[serde(rename = "COMPLETE")]
    Complete,
}

impl SettlementState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SettlementState::Complete)
    }
}

#[derive(Debug, Clone, Copy, EnumString, Display, Serialize, Deserialize, Eq, Hash, PartialEq)]
pub enum BookingStatus {
    ACTIVE,
    COMPLETED,
    CANCELLED,
}

/// Routing provider failure taxonomy. NOT_FOUND and INVALID_REQUEST are
/// deterministic and must not be retried.
#[derive(
    Debug, Clone, Copy, EnumString, Display, Serialize, Deserialize, Eq, Hash, PartialEq,
)]
pub enum RoutingStatus {
    #[strum(serialize = "NOT_FOUND")]
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    #[strum(serialize = "NO_RESULTS_AVAILABLE")]
    #[serde(rename = "NO_RESULTS_AVAILABLE")]
    NoResultsAvailable,
    #[strum(serialize = "PROVIDER_ERROR")]
    #[serde(rename = "PROVIDER_ERROR")]
    ProviderError,
    #[strum(serialize = "INVALID_REQUEST")]
    #[serde(rename = "INVALID_REQUEST")]
    InvalidRequest,
    #[strum(serialize = "SERVICE_UNAVAILABLE")]
    #[serde(rename = "SERVICE_UNAVAILABLE")]
    ServiceUnavailable,
}

impl RoutingStatus {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RoutingStatus::ProviderError | RoutingStatus::ServiceUnavailable
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub method: PaymentMethod,
    pub amount_due: Money,
    pub amount_tendered: Option<Money>,
    pub change_due: Option<Money>,
    pub change_disposition: Option<ChangeDisposition>,
    pub state: SettlementState,
}

impl PaymentSession {
    pub fn new(method: PaymentMethod, amount_due: Money, state: SettlementState) -> PaymentSession {
        PaymentSession {
            method,
            amount_due,
            amount_tendered: None,
            change_due: None,
            change_disposition: None,
            state,
        }
    }
}

/// The booking session record, mutable until its settlement completes.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RideRequest {
    pub ride_request_id: RideRequestId,
    pub passenger_id: PassengerId,
    pub driver_id: Option<DriverId>,
    pub pickup: Point,
    pub destination: Point,
    pub vehicle_class_id: VehicleClassId,
    pub passenger_count: u32,
    pub route: Route,
    pub fare: FareQuote,
    pub booking_status: BookingStatus,
    pub payment_session: Option<PaymentSession>,
    // Monotonic counter implementing last-write-wins for route resolution.
    #[serde(skip)]
    pub route_epoch: u64,
    pub created_at: TimeStamp,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct APISuccess {
    result: String,
}

impl Default for APISuccess {
    fn default() -> Self {
        Self {
            result: "Success".to_string(),
        }
    }
}
