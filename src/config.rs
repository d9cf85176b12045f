use std::env;

use crate::engine::external::FareRates;
use crate::error::AppError;
use crate::state::DispatchSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub event_buffer_size: usize,
    pub offer_timeout_secs: i64,
    pub offer_sweep_interval_ms: u64,
    pub otp_ttl_minutes: i64,
    pub geofence_enabled: bool,
    pub payment_currency: String,
    pub fare_base: f64,
    pub fare_per_km: f64,
    pub fare_per_minute: f64,
    pub fare_tax_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") | Err(_) => LogFormat::Compact,
            Ok(other) => {
                return Err(AppError::Internal(format!(
                    "invalid LOG_FORMAT: {other}, expected compact or json"
                )));
            }
        };

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            offer_timeout_secs: parse_or_default("OFFER_TIMEOUT_SECS", 45)?,
            offer_sweep_interval_ms: parse_or_default("OFFER_SWEEP_INTERVAL_MS", 1000)?,
            otp_ttl_minutes: parse_or_default("OTP_TTL_MINUTES", 5)?,
            geofence_enabled: parse_or_default("GEOFENCE_ENABLED", false)?,
            payment_currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
            fare_base: parse_or_default("FARE_BASE", 30.0)?,
            fare_per_km: parse_or_default("FARE_PER_KM", 10.0)?,
            fare_per_minute: parse_or_default("FARE_PER_MINUTE", 1.0)?,
            fare_tax_percent: parse_or_default("FARE_TAX_PERCENT", 5.0)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.offer_timeout_secs <= 0 {
            return Err(AppError::Internal(
                "OFFER_TIMEOUT_SECS must be positive".to_string(),
            ));
        }
        if self.offer_sweep_interval_ms == 0 {
            return Err(AppError::Internal(
                "OFFER_SWEEP_INTERVAL_MS must be positive".to_string(),
            ));
        }
        if self.otp_ttl_minutes <= 0 {
            return Err(AppError::Internal(
                "OTP_TTL_MINUTES must be positive".to_string(),
            ));
        }
        if self.event_buffer_size == 0 {
            return Err(AppError::Internal(
                "EVENT_BUFFER_SIZE must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            offer_timeout: chrono::Duration::seconds(self.offer_timeout_secs),
            otp_ttl: chrono::Duration::minutes(self.otp_ttl_minutes),
            geofence_enabled: self.geofence_enabled,
            currency: self.payment_currency.clone(),
            event_buffer_size: self.event_buffer_size,
        }
    }

    pub fn fare_rates(&self) -> FareRates {
        FareRates {
            base_fare: self.fare_base,
            per_km: self.fare_per_km,
            per_minute: self.fare_per_minute,
            tax_percent: self.fare_tax_percent,
            minimum_fare: None,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
