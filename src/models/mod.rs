pub mod assignment;
pub mod event;
pub mod fare;
pub mod fleet;
pub mod location;
pub mod offer;
pub mod otp;
pub mod shift;
pub mod trip;
