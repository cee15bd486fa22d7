pub mod kv_store;
pub mod model;
pub mod pending_store;
