//! Channel → thread mapping for assistant-bridge.
//!
//! Every external channel (a chat room, a DM, a CLI session) is mapped
//! one-to-one to a durable remote conversation thread. The mapping table
//! lives behind the [`MappingStore`] trait; [`ThreadStore`] layers the
//! get-or-create contract on top of it and the remote API.

pub mod mapping;
pub mod store;
pub mod thread_store;

pub use mapping::{ChannelMapping, MappingStore, MemoryMappingStore};
pub use store::JsonMappingStore;
pub use thread_store::ThreadStore;
