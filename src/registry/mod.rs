mod client;
mod types;

pub use client::{page_offset, GovRegistry, RegistryClient, PAGE_SIZE};
pub use types::Car;
