pub mod configure;
pub mod context;
pub mod engine;
pub mod normalize;
pub mod register;
pub mod validate;
