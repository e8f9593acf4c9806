pub mod callback;
pub mod device_identity;
pub mod object_store;
pub mod resolver;
pub mod secret_store;
