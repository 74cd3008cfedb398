pub mod buyer_resolver;
pub mod normalizer;
pub mod payment_pipeline;
pub mod product_resolver;
pub mod settlement;
pub mod signature;
pub mod sweeper;
