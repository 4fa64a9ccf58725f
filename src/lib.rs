pub mod clock;
pub mod config;
pub mod monitor;
pub mod response_store;
pub mod sensors;
pub mod temboo;
