//! Protocol module containing the request framer, request type, response
//! writer, and SSE frame encoders.

pub mod framer;
pub mod request;
pub mod response;
pub mod sse;

pub use framer::{FrameError, RequestFramer, MAX_BODY_BYTES, MAX_HEADER_BYTES};
pub use request::ParsedRequest;
pub use response::{Response, Status};
