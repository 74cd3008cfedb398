pub mod catalog_repo;
pub mod store;
pub mod transaction_repo;
pub mod user_repo;
