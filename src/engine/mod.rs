pub mod clock;
pub mod dispatch;
pub mod eligibility;
pub mod external;
pub mod lifecycle;
pub mod locks;
pub mod registry;
pub mod shift;
pub mod sweeper;
