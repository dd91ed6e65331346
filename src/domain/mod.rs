pub mod models;
pub mod schedule;
pub mod time_utils;
pub mod timer;
