use dashmap::DashMap;
use geo::{Contains, LineString, Point, Polygon};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::location::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

/// Builds a closed polygon from a ring of lat/lng vertices.
pub fn polygon_from_ring(ring: &[GeoPoint]) -> Result<Polygon<f64>, AppError> {
    if ring.len() < 3 {
        return Err(AppError::BadRequest(
            "boundary needs at least 3 vertices".to_string(),
        ));
    }
    if let Some(bad) = ring.iter().find(|p| !p.is_valid()) {
        return Err(AppError::BadRequest(format!(
            "invalid boundary vertex ({}, {})",
            bad.lat, bad.lng
        )));
    }

    let exterior: LineString<f64> = ring.iter().map(|p| (p.lng, p.lat)).collect();
    Ok(Polygon::new(exterior, vec![]))
}

fn contains(boundary: &Polygon<f64>, point: &GeoPoint) -> bool {
    boundary.contains(&Point::new(point.lng, point.lat))
}

#[derive(Debug, Clone)]
pub struct Zone {
    pub id: Uuid,
    pub name: String,
    pub boundary: Polygon<f64>,
}

#[derive(Debug, Clone)]
pub struct City {
    pub id: Uuid,
    pub name: String,
    pub boundary: Polygon<f64>,
    pub zones: Vec<Zone>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CitySummary {
    pub id: Uuid,
    pub name: String,
    pub zone_ids: Vec<Uuid>,
}

impl From<&City> for CitySummary {
    fn from(city: &City) -> Self {
        Self {
            id: city.id,
            name: city.name.clone(),
            zone_ids: city.zones.iter().map(|z| z.id).collect(),
        }
    }
}

/// City and zone lookup by point-in-polygon.
#[derive(Default)]
pub struct GeoResolver {
    cities: DashMap<Uuid, City>,
}

impl GeoResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_city(&self, city: City) {
        self.cities.insert(city.id, city);
    }

    pub fn has_city(&self, city_id: Uuid) -> bool {
        self.cities.contains_key(&city_id)
    }

    pub fn city_count(&self) -> usize {
        self.cities.len()
    }

    /// City boundaries are expected not to overlap. When they do, the
    /// lowest city id wins.
    pub fn resolve_city(&self, point: &GeoPoint) -> Result<Uuid, AppError> {
        let mut matches: Vec<Uuid> = self
            .cities
            .iter()
            .filter(|entry| contains(&entry.value().boundary, point))
            .map(|entry| *entry.key())
            .collect();
        matches.sort_unstable();

        if matches.len() > 1 {
            warn!(
                lat = point.lat,
                lng = point.lng,
                matches = matches.len(),
                "point falls inside overlapping city boundaries"
            );
        }

        matches.first().copied().ok_or(AppError::OutOfServiceArea)
    }

    pub fn resolve_zone(&self, city_id: Uuid, point: &GeoPoint) -> Option<Uuid> {
        let city = self.cities.get(&city_id)?;
        let mut zones: Vec<Uuid> = city
            .zones
            .iter()
            .filter(|zone| contains(&zone.boundary, point))
            .map(|zone| zone.id)
            .collect();
        zones.sort_unstable();
        zones.first().copied()
    }

    pub fn is_point_in_city(&self, city_id: Uuid, point: &GeoPoint) -> bool {
        self.cities
            .get(&city_id)
            .is_some_and(|city| contains(&city.boundary, point))
    }
}
