pub mod catalog;
pub mod error;
pub mod event;
pub mod id;
pub mod ledger;
pub mod money;
pub mod store;
pub mod transaction;
pub mod user;
