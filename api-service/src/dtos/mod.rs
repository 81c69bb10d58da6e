pub mod ai;
pub mod sessions;

pub use ai::{GenerateRequest, GenerateResponse, ProviderStatusResponse};
pub use sessions::{
    CreateSessionRequest, SessionListParams, SessionListResponse, SessionResponse,
    SessionSummary, UpdateSessionRequest,
};
