//! Contracts the dispatch core needs from collaborators it does not own,
//! with in-memory implementations used by the service and the tests.

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::fare::{FareBreakdown, Payment, PaymentStatus};
use crate::models::fleet::VehicleCategory;
use crate::models::trip::Trip;

pub trait TenantDirectory: Send + Sync {
    fn is_tenant_active_in_city(&self, tenant_id: Uuid, city_id: Uuid) -> bool;

    fn set_tenant_city_active(&self, tenant_id: Uuid, city_id: Uuid, active: bool);
}

pub trait FareEngine: Send + Sync {
    fn compute_fare(
        &self,
        trip: &Trip,
        distance_km: f64,
        duration_minutes: f64,
    ) -> Result<FareBreakdown, AppError>;
}

/// Must be idempotent per trip: a second call returns the first payment.
pub trait PaymentLedger: Send + Sync {
    fn create_pending_payment(
        &self,
        trip_id: Uuid,
        amount: f64,
        currency: &str,
        at: DateTime<Utc>,
    ) -> Result<Payment, AppError>;

    fn payment_for_trip(&self, trip_id: Uuid) -> Option<Payment>;
}

#[derive(Default)]
pub struct InMemoryTenantDirectory {
    active: DashSet<(Uuid, Uuid)>,
}

impl InMemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TenantDirectory for InMemoryTenantDirectory {
    fn is_tenant_active_in_city(&self, tenant_id: Uuid, city_id: Uuid) -> bool {
        self.active.contains(&(tenant_id, city_id))
    }

    fn set_tenant_city_active(&self, tenant_id: Uuid, city_id: Uuid, active: bool) {
        if active {
            self.active.insert((tenant_id, city_id));
        } else {
            self.active.remove(&(tenant_id, city_id));
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FareRates {
    pub base_fare: f64,
    pub per_km: f64,
    pub per_minute: f64,
    pub tax_percent: f64,
    pub minimum_fare: Option<f64>,
}

impl Default for FareRates {
    fn default() -> Self {
        Self {
            base_fare: 30.0,
            per_km: 10.0,
            per_minute: 1.0,
            tax_percent: 5.0,
            minimum_fare: None,
        }
    }
}

/// Base + distance + time, taxed, with per city/category overrides.
pub struct TariffFareEngine {
    default_rates: FareRates,
    overrides: DashMap<(Uuid, VehicleCategory), FareRates>,
}

impl TariffFareEngine {
    pub fn new(default_rates: FareRates) -> Self {
        Self {
            default_rates,
            overrides: DashMap::new(),
        }
    }

    pub fn set_rates(&self, city_id: Uuid, category: VehicleCategory, rates: FareRates) {
        self.overrides.insert((city_id, category), rates);
    }

    fn rates_for(&self, trip: &Trip) -> FareRates {
        self.overrides
            .get(&(trip.city_id, trip.vehicle_category))
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| self.default_rates.clone())
    }
}

impl Default for TariffFareEngine {
    fn default() -> Self {
        Self::new(FareRates::default())
    }
}

fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

impl FareEngine for TariffFareEngine {
    fn compute_fare(
        &self,
        trip: &Trip,
        distance_km: f64,
        duration_minutes: f64,
    ) -> Result<FareBreakdown, AppError> {
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(AppError::BadRequest(format!(
                "distance_km must be a non-negative number, got {distance_km}"
            )));
        }
        if !duration_minutes.is_finite() || duration_minutes < 0.0 {
            return Err(AppError::BadRequest(format!(
                "duration_minutes must be a non-negative number, got {duration_minutes}"
            )));
        }

        let rates = self.rates_for(trip);

        let base_fare = rates.base_fare;
        let distance_fare = distance_km * rates.per_km;
        let time_fare = duration_minutes * rates.per_minute;
        let surge_amount = 0.0;
        let discount_amount = 0.0;

        let subtotal = base_fare + distance_fare + time_fare + surge_amount - discount_amount;
        let tax_amount = subtotal * rates.tax_percent / 100.0;
        let mut final_fare = subtotal + tax_amount;
        if let Some(minimum) = rates.minimum_fare {
            final_fare = final_fare.max(minimum);
        }

        Ok(FareBreakdown {
            trip_id: trip.id,
            base_fare: round_money(base_fare),
            distance_fare: round_money(distance_fare),
            time_fare: round_money(time_fare),
            surge_amount,
            discount_amount,
            tax_amount: round_money(tax_amount),
            final_fare: round_money(final_fare),
        })
    }
}

#[derive(Default)]
pub struct InMemoryPaymentLedger {
    payments: DashMap<Uuid, Payment>,
}

impl InMemoryPaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.payments.len()
    }
}

impl PaymentLedger for InMemoryPaymentLedger {
    fn create_pending_payment(
        &self,
        trip_id: Uuid,
        amount: f64,
        currency: &str,
        at: DateTime<Utc>,
    ) -> Result<Payment, AppError> {
        let payment = self
            .payments
            .entry(trip_id)
            .or_insert_with(|| Payment {
                id: Uuid::new_v4(),
                trip_id,
                amount,
                currency: currency.to_string(),
                status: PaymentStatus::Pending,
                created_at: at,
            })
            .value()
            .clone();

        Ok(payment)
    }

    fn payment_for_trip(&self, trip_id: Uuid) -> Option<Payment> {
        self.payments.get(&trip_id).map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{
        FareEngine, FareRates, InMemoryPaymentLedger, InMemoryTenantDirectory, PaymentLedger,
        TariffFareEngine, TenantDirectory,
    };
    use crate::error::AppError;
    use crate::models::fleet::VehicleCategory;
    use crate::models::location::GeoPoint;
    use crate::models::trip::{Trip, TripStatus};

    fn trip(category: VehicleCategory) -> Trip {
        Trip {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            rider_id: Uuid::new_v4(),
            driver_id: None,
            vehicle_id: None,
            city_id: Uuid::from_u128(7),
            zone_id: None,
            pickup: GeoPoint::new(12.97, 77.59),
            drop: GeoPoint::new(12.99, 77.61),
            vehicle_category: category,
            status: TripStatus::PickedUp,
            requested_at: Utc::now(),
            assigned_at: None,
            picked_up_at: None,
            completed_at: None,
            cancelled_at: None,
            fare_amount: None,
        }
    }

    #[test]
    fn default_tariff_matches_simple_formula() {
        let engine = TariffFareEngine::default();
        let fare = engine
            .compute_fare(&trip(VehicleCategory::Cab), 10.0, 20.0)
            .unwrap();

        assert_eq!(fare.base_fare, 30.0);
        assert_eq!(fare.distance_fare, 100.0);
        assert_eq!(fare.time_fare, 20.0);
        assert_eq!(fare.tax_amount, 7.5);
        assert_eq!(fare.final_fare, 157.5);
    }

    #[test]
    fn city_override_and_minimum_fare_apply() {
        let engine = TariffFareEngine::default();
        engine.set_rates(
            Uuid::from_u128(7),
            VehicleCategory::Bike,
            FareRates {
                base_fare: 10.0,
                per_km: 5.0,
                per_minute: 0.0,
                tax_percent: 0.0,
                minimum_fare: Some(40.0),
            },
        );

        let fare = engine
            .compute_fare(&trip(VehicleCategory::Bike), 2.0, 5.0)
            .unwrap();
        assert_eq!(fare.final_fare, 40.0);

        let cab = engine
            .compute_fare(&trip(VehicleCategory::Cab), 2.0, 5.0)
            .unwrap();
        assert_eq!(cab.base_fare, 30.0);
    }

    #[test]
    fn negative_distance_is_rejected() {
        let engine = TariffFareEngine::default();
        let result = engine.compute_fare(&trip(VehicleCategory::Cab), -1.0, 5.0);
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn payment_is_created_once_per_trip() {
        let ledger = InMemoryPaymentLedger::new();
        let trip_id = Uuid::new_v4();

        let first = ledger
            .create_pending_payment(trip_id, 120.0, "INR", Utc::now())
            .unwrap();
        let second = ledger
            .create_pending_payment(trip_id, 999.0, "INR", Utc::now())
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.amount, 120.0);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn tenant_activation_is_per_city() {
        let directory = InMemoryTenantDirectory::new();
        let (tenant, city, other_city) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        directory.set_tenant_city_active(tenant, city, true);
        assert!(directory.is_tenant_active_in_city(tenant, city));
        assert!(!directory.is_tenant_active_in_city(tenant, other_city));

        directory.set_tenant_city_active(tenant, city, false);
        assert!(!directory.is_tenant_active_in_city(tenant, city));
    }
}
