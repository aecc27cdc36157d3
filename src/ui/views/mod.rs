mod audit_logs;
mod contacts;
mod qr_analytics;

pub use audit_logs::AuditLogsView;
pub use contacts::ContactsView;
pub use qr_analytics::QrAnalyticsView;
