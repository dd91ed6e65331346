pub mod config;
pub mod credential_store;
pub mod error;
pub mod identity;
pub mod kv_client;
pub mod snapshot_repository;
pub mod storage;
