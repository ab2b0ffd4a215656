pub mod booking;
pub mod candidate;
pub mod nurse;
pub mod patient;
pub mod principal;
