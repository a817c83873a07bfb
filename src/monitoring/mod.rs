pub mod dashboard;
pub mod endpoint;
pub mod percentiles;
pub mod request_log;
pub mod service;
pub mod stream;

pub use dashboard::AnalyticsSnapshot;
pub use service::MonitoringService;
