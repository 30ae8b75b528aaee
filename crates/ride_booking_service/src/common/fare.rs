/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;

// Display range spread around the exact fare.
const FARE_RANGE_SPREAD: f64 = 0.1;

/// Computes the fare quote for a vehicle class over a trip distance.
///
/// `exact = base_fare + distance * rate_per_km`, rounded to cents. The
/// display range is `exact ± 10%`, rounded to the nearest whole currency
/// unit and clamped so it always contains `exact`.
///
/// Pure and synchronous. A negative distance or an unregistered vehicle
/// class is a caller contract violation, validated at the API boundary.
pub fn quote(vehicle_class: &VehicleClass, distance: Kilometers) -> FareQuote {
    let Kilometers(distance_km) = distance;
    debug_assert!(
        distance_km >= 0.0,
        "fare quote requested for a negative distance"
    );

    let exact = Money::from_major_f64(
        vehicle_class.base_fare.as_major_f64()
            + distance_km * vehicle_class.rate_per_km.as_major_f64(),
    );

    let range_min = Money::from_major_f64(exact.as_major_f64() * (1.0 - FARE_RANGE_SPREAD))
        .round_to_unit()
        .min(exact);
    let range_max = Money::from_major_f64(exact.as_major_f64() * (1.0 + FARE_RANGE_SPREAD))
        .round_to_unit()
        .max(exact);

    FareQuote {
        vehicle_class_id: vehicle_class.vehicle_class_id.to_owned(),
        exact,
        range_min,
        range_max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle_class(id: &str, base_fare: f64, rate_per_km: f64) -> VehicleClass {
        VehicleClass {
            vehicle_class_id: VehicleClassId(id.to_string()),
            base_fare: Money::from_major_f64(base_fare),
            rate_per_km: Money::from_major_f64(rate_per_km),
        }
    }

    #[test]
    fn serv_x_over_5_7_km() {
        let fare = quote(&vehicle_class("serv-x", 5.0, 2.0), Kilometers(5.7));
        assert_eq!(fare.exact, Money(1640));
        assert_eq!(fare.range_min, Money(1500));
        assert_eq!(fare.range_max, Money(1800));
    }

    #[test]
    fn zero_distance_quotes_the_base_fare() {
        let fare = quote(&vehicle_class("serv-x", 5.0, 2.0), Kilometers(0.0));
        assert_eq!(fare.exact, Money(500));
    }

    #[test]
    fn exact_fare_never_undercuts_the_base_fare() {
        let vc = vehicle_class("serv-pop", 7.5, 1.85);
        for distance in [0.0, 0.001, 0.4, 2.0, 11.3, 147.9] {
            let fare = quote(&vc, Kilometers(distance));
            assert!(fare.exact >= vc.base_fare, "distance {distance}");
        }
    }

    #[test]
    fn exact_fare_is_monotonic_in_distance() {
        let vc = vehicle_class("serv-x", 5.0, 2.0);
        let mut previous = Money(0);
        for distance in [0.0, 0.5, 1.0, 2.5, 5.7, 5.71, 12.0, 60.0] {
            let fare = quote(&vc, Kilometers(distance));
            assert!(fare.exact >= previous, "distance {distance}");
            previous = fare.exact;
        }
    }

    #[test]
    fn range_always_contains_the_exact_fare() {
        // Sub-5-unit fares are where nearest-unit rounding would cross the
        // exact fare without clamping.
        let classes = [
            vehicle_class("serv-mini", 0.4, 0.1),
            vehicle_class("serv-x", 5.0, 2.0),
            vehicle_class("serv-black", 12.0, 3.75),
        ];
        for vc in &classes {
            for distance in [0.0, 0.2, 1.0, 5.7, 33.3] {
                let fare = quote(vc, Kilometers(distance));
                assert!(
                    fare.range_min <= fare.exact && fare.exact <= fare.range_max,
                    "class {:?} distance {distance}: {:?}",
                    vc.vehicle_class_id,
                    fare
                );
            }
        }
    }

    #[test]
    fn recompute_reflects_a_class_change() {
        let distance = Kilometers(5.7);
        let economy = quote(&vehicle_class("serv-x", 5.0, 2.0), distance);
        let premium = quote(&vehicle_class("serv-black", 12.0, 3.75), distance);
        assert!(premium.exact > economy.exact);
        assert_eq!(premium.vehicle_class_id, VehicleClassId("serv-black".into()));
    }
}
