//! The intelligence report pipeline: insights, data pack, completion call,
//! JSON repair, and the cache-or-generate service tying them together.

pub mod insights;
pub mod llm;
pub mod normalize;
pub mod pack;
pub mod service;
pub mod summary;

pub use service::IntelligenceDesk;
