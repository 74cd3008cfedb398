pub mod admin;
pub mod api_errors;
pub mod payhip;
