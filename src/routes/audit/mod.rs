mod handler;
mod model;

pub use handler::list_audit_logs;
pub use model::{AuditAction, AuditQuery, AuditRecord, NewAuditRecord};
