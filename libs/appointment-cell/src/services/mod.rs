pub mod access;
pub mod booking;
pub mod conflict;
pub mod history;
pub mod lifecycle;
pub mod records;
pub mod roster;

pub use access::Actor;
pub use booking::AppointmentBookingService;
pub use conflict::ConflictDetectionService;
pub use history::TreatmentHistoryService;
pub use lifecycle::AppointmentLifecycleService;
pub use roster::DoctorRosterService;
