#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveTime, TimeZone, Utc};
use ride_dispatch::engine::clock::ManualClock;
use ride_dispatch::engine::external::InMemoryPaymentLedger;
use ride_dispatch::engine::lifecycle::{self, RequestedTrip, TripRequest};
use ride_dispatch::engine::registry::{
    self, NewAssignment, NewCity, NewDriver, NewVehicle, NewZone,
};
use ride_dispatch::engine::shift;
use ride_dispatch::models::fleet::{ApprovalStatus, VehicleCategory, VehicleStatus};
use ride_dispatch::models::location::GeoPoint;
use ride_dispatch::models::trip::Trip;
use ride_dispatch::state::{AppState, DispatchSettings};
use uuid::Uuid;

pub const TENANT: Uuid = Uuid::from_u128(0x7E4A_0001);

/// Inside the test city and its central zone.
pub const PICKUP: GeoPoint = GeoPoint {
    lat: 12.97,
    lng: 77.59,
};
pub const DROP: GeoPoint = GeoPoint {
    lat: 13.02,
    lng: 77.64,
};
/// Inside the test city, outside every zone.
pub const SUBURB: GeoPoint = GeoPoint {
    lat: 13.12,
    lng: 77.74,
};
pub const FAR_AWAY: GeoPoint = GeoPoint {
    lat: 28.61,
    lng: 77.21,
};

pub fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

fn square(center: GeoPoint, half: f64) -> Vec<GeoPoint> {
    vec![
        GeoPoint::new(center.lat - half, center.lng - half),
        GeoPoint::new(center.lat - half, center.lng + half),
        GeoPoint::new(center.lat + half, center.lng + half),
        GeoPoint::new(center.lat + half, center.lng - half),
    ]
}

/// One city with one zone, one active tenant, and a clock frozen at
/// 2026-03-10 `hour`:`minute` UTC.
pub struct World {
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
    pub ledger: Arc<InMemoryPaymentLedger>,
    pub city_id: Uuid,
    pub zone_id: Uuid,
}

impl World {
    pub fn at(hour: u32, minute: u32) -> Self {
        Self::with_settings(hour, minute, DispatchSettings::default())
    }

    pub fn with_settings(hour: u32, minute: u32, settings: DispatchSettings) -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 3, 10, hour, minute, 0)
            .unwrap();
        let clock = Arc::new(ManualClock::at(start));
        let ledger = Arc::new(InMemoryPaymentLedger::new());
        let state = Arc::new(
            AppState::new(settings)
                .with_clock(clock.clone())
                .with_payment_ledger(ledger.clone()),
        );

        let city = registry::register_city(
            &state,
            NewCity {
                name: "Bengaluru".to_string(),
                boundary: square(PICKUP, 0.3),
                zones: vec![NewZone {
                    name: "Central".to_string(),
                    boundary: square(PICKUP, 0.05),
                }],
            },
        )
        .unwrap();
        registry::set_tenant_city(&state, TENANT, city.id, true).unwrap();

        Self {
            state,
            clock,
            ledger,
            city_id: city.id,
            zone_id: city.zone_ids[0],
        }
    }

    /// Approved driver with an approved, active vehicle assigned for the given window.
    pub async fn driver_with_window(
        &self,
        category: VehicleCategory,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Uuid {
        let driver = registry::register_driver(
            &self.state,
            NewDriver {
                name: "Test Driver".to_string(),
                approval_status: ApprovalStatus::Approved,
            },
        )
        .unwrap();
        let vehicle = registry::register_vehicle(
            &self.state,
            NewVehicle {
                registration_no: format!("KA-{}", &driver.id.simple().to_string()[..6]),
                category,
                approval_status: ApprovalStatus::Approved,
                status: VehicleStatus::Active,
            },
        )
        .unwrap();
        registry::register_assignment(
            &self.state,
            NewAssignment {
                driver_id: driver.id,
                vehicle_id: vehicle.id,
                start_time: start,
                end_time: end,
                created_by: None,
            },
        )
        .await
        .unwrap();

        driver.id
    }

    /// Driver with a full-day assignment and an ONLINE shift at the pickup.
    pub async fn online_driver(&self, category: VehicleCategory) -> Uuid {
        let driver_id = self
            .driver_with_window(category, hm(0, 0), hm(0, 0))
            .await;
        shift::start_shift(&self.state, driver_id, TENANT, PICKUP)
            .await
            .unwrap();
        driver_id
    }

    pub async fn request(&self, category: VehicleCategory) -> RequestedTrip {
        lifecycle::request_trip(
            &self.state,
            Uuid::new_v4(),
            TripRequest {
                tenant_id: TENANT,
                pickup: PICKUP,
                drop: DROP,
                vehicle_category: category,
            },
        )
        .await
        .unwrap()
    }

    pub fn trip(&self, trip_id: Uuid) -> Trip {
        let trip = self.state.trip(trip_id).unwrap();
        assert_eq!(
            trip.driver_id.is_some(),
            trip.status.has_driver(),
            "driver binding out of step with status {}",
            trip.status
        );
        assert_eq!(trip.driver_id.is_some(), trip.vehicle_id.is_some());
        trip
    }
}
