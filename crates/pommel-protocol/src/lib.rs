//! Request/response types and the error taxonomy shared between
//! `pommel-daemon` (server) and `pommel-cli` (client), so the two never
//! drift apart on wire format (§6 External interfaces).

mod error;
mod types;

pub use error::ApiError;
pub use types::{
    ConfigResponse, HealthResponse, ParentRef, ReindexRequest, ReindexResponse, SearchHit, SearchRequest,
    SearchResponse, StatusResponse, SubprojectInfo, SubprojectsResponse,
};
