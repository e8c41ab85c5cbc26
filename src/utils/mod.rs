pub mod cache;
pub mod locks;
pub mod middleware;
pub mod serde_helpers;
pub mod validation;
