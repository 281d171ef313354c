pub mod audit;
pub mod health;
pub mod menu;
pub mod metrics;
