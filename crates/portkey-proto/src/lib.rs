//! Generated protobuf types and tonic stubs for the shortener RPC surface.

pub mod shortener {
    pub mod v1 {
        tonic::include_proto!("portkey.v1");
    }
}

pub mod v1 {
    pub use crate::shortener::v1::*;
}
