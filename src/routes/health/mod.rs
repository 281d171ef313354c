mod handler;
mod model;

pub use handler::{detailed, healthz, liveness, readiness};
pub use model::{ComponentHealth, HealthChecker, HealthStatus};
