pub mod algorithm;
pub mod crop;
pub mod error;
pub mod pipeline;
pub mod upstream;

pub use error::{FetchError, ProxyError, TransformError};
pub use pipeline::{TransformConfig, TransformParams};
pub use upstream::{collect_body, HttpUpstream, Upstream};
