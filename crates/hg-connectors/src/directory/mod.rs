//! CMDB-backed directory sources.

pub mod servicenow;

pub use servicenow::{ServiceNowAdapter, ServiceNowConfig};
