//! Library surface for the wws-connector binary, split out so integration
//! tests can drive the hub and router without going through a subprocess.

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod frame_stream;
pub mod handlers;
pub mod hub;
pub mod http;
