//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async functions. Reads
//! accept any executor (pool or open transaction); writes that are part of a
//! transition accept `&mut PgConnection` and are only called by
//! [`PgCaseStore`](crate::store::PgCaseStore) inside its transaction.

pub mod case_repo;
pub mod device_token_repo;
pub mod event_repo;
pub mod history_repo;
pub mod request_repo;

pub use case_repo::CaseRepo;
pub use device_token_repo::DeviceTokenRepo;
pub use event_repo::EventRepo;
pub use history_repo::HistoryRepo;
pub use request_repo::RequestRepo;
