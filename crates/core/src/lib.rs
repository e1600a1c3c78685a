pub mod detection;
pub mod extraction;
pub mod pipeline;
pub mod shared;
pub mod source;
