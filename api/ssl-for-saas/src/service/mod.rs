pub mod dns_validation_service;
pub mod internal_auth_service;
pub mod metrics_service;
pub mod pem_service;
pub mod validation_service;
