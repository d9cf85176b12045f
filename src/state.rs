use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::engine::clock::{Clock, SystemClock};
use crate::engine::external::{
    FareEngine, InMemoryPaymentLedger, InMemoryTenantDirectory, PaymentLedger, TariffFareEngine,
    TenantDirectory,
};
use crate::engine::locks::KeyedLocks;
use crate::error::AppError;
use crate::geo::GeoResolver;
use crate::models::assignment::DriverVehicleAssignment;
use crate::models::event::DispatchEvent;
use crate::models::fare::FareBreakdown;
use crate::models::fleet::{DriverProfile, Vehicle};
use crate::models::location::LocationRecord;
use crate::models::offer::DispatchAttempt;
use crate::models::otp::TripOtp;
use crate::models::shift::DriverShift;
use crate::models::trip::Trip;
use crate::observability::metrics::Metrics;

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub offer_timeout: Duration,
    pub otp_ttl: Duration,
    pub geofence_enabled: bool,
    pub currency: String,
    pub event_buffer_size: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            offer_timeout: Duration::seconds(45),
            otp_ttl: Duration::minutes(5),
            geofence_enabled: false,
            currency: "INR".to_string(),
            event_buffer_size: 1024,
        }
    }
}

pub struct AppState {
    pub settings: DispatchSettings,
    pub trips: DashMap<Uuid, Trip>,
    pub attempts: DashMap<Uuid, DispatchAttempt>,
    pub shifts: DashMap<Uuid, DriverShift>,
    pub assignments: DashMap<Uuid, DriverVehicleAssignment>,
    pub drivers: DashMap<Uuid, DriverProfile>,
    pub vehicles: DashMap<Uuid, Vehicle>,
    /// Keyed by trip id; one live code per trip.
    pub otps: DashMap<Uuid, TripOtp>,
    /// Keyed by trip id.
    pub fare_breakdowns: DashMap<Uuid, FareBreakdown>,
    /// Keyed by driver id. Append-only.
    pub location_history: DashMap<Uuid, Vec<LocationRecord>>,
    pub geo: GeoResolver,
    pub tenants: Arc<dyn TenantDirectory>,
    pub fares: Arc<dyn FareEngine>,
    pub payments: Arc<dyn PaymentLedger>,
    pub clock: Arc<dyn Clock>,
    pub trip_locks: KeyedLocks,
    pub driver_locks: KeyedLocks,
    /// Serializes assignment intake so overlap checks see every window.
    pub assignment_intake: Mutex<()>,
    pub events_tx: broadcast::Sender<DispatchEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(settings: DispatchSettings) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(settings.event_buffer_size.max(1));

        Self {
            settings,
            trips: DashMap::new(),
            attempts: DashMap::new(),
            shifts: DashMap::new(),
            assignments: DashMap::new(),
            drivers: DashMap::new(),
            vehicles: DashMap::new(),
            otps: DashMap::new(),
            fare_breakdowns: DashMap::new(),
            location_history: DashMap::new(),
            geo: GeoResolver::new(),
            tenants: Arc::new(InMemoryTenantDirectory::new()),
            fares: Arc::new(TariffFareEngine::default()),
            payments: Arc::new(InMemoryPaymentLedger::new()),
            clock: Arc::new(SystemClock),
            trip_locks: KeyedLocks::new(),
            driver_locks: KeyedLocks::new(),
            assignment_intake: Mutex::new(()),
            events_tx,
            metrics: Metrics::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_fare_engine(mut self, fares: Arc<dyn FareEngine>) -> Self {
        self.fares = fares;
        self
    }

    pub fn with_payment_ledger(mut self, payments: Arc<dyn PaymentLedger>) -> Self {
        self.payments = payments;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn publish(&self, event: DispatchEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Most recently started shift of the driver that has not ended.
    pub fn open_shift_of(&self, driver_id: Uuid) -> Option<DriverShift> {
        self.shifts
            .iter()
            .filter(|entry| entry.driver_id == driver_id && entry.is_open())
            .max_by_key(|entry| entry.started_at)
            .map(|entry| entry.value().clone())
    }

    /// Assignment of the driver covering `now`. When back-to-back windows
    /// touch at `now`, the one running longer wins.
    pub fn covering_assignment(
        &self,
        driver_id: Uuid,
        now: DateTime<Utc>,
    ) -> Option<DriverVehicleAssignment> {
        self.assignments
            .iter()
            .filter(|entry| entry.driver_id == driver_id && entry.covers(now))
            .max_by_key(|entry| entry.expected_end_at(now))
            .map(|entry| entry.value().clone())
    }

    pub fn trip(&self, trip_id: Uuid) -> Result<Trip, AppError> {
        self.trips
            .get(&trip_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("trip {trip_id} not found")))
    }
}
