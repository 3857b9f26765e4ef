pub mod accounts;
pub mod dashboard;
pub mod records;
pub mod search;

pub use accounts::AccountDeletionService;
pub use dashboard::AdminDashboardService;
pub use records::AdminRecordsService;
pub use search::AdminSearchService;
