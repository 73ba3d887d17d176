//! Share registry, its persistence, and token generation.

pub mod link;
pub mod registry;
pub mod store;

pub use link::LinkService;
pub use registry::ShareRegistry;
pub use store::ShareStore;
