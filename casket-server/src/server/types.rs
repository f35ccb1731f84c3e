use casket_core::LedgerStats;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: String,
    pub(crate) backend: String,
    pub(crate) segments: usize,
    pub(crate) stats: Option<LedgerStats>,
}
