pub mod device_cert;
pub mod dispatch;
pub mod empty_bucket;
pub mod ip_lookup;
