//! Gateway HTTP server and API types.

mod protocol;
mod server;

pub use protocol::{
    ActivityQuery, Envelope, ExecuteParams, ExecuteResult, ListQuery, PageMeta, PageQuery,
};
pub use server::{run_gateway, GatewayState};
