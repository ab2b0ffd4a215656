pub mod bookings;
pub mod intakes;
pub mod patients;

pub use bookings::BookingStore;
pub use intakes::IntakeLog;
pub use patients::PatientRegistry;
