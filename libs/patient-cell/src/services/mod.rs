pub mod patient;
pub mod portal;

pub use patient::PatientService;
pub use portal::PatientPortalService;
