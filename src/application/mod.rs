//! Application layer wiring DTOs and services for the intelligence hub.

pub mod dtos;
pub mod services;

pub use dtos::{
    HealthStatusResponse, HubAnswer, IngestReport, ModelReport, QueryRequest, QueryResponse,
};
pub use services::{IngestionService, IntelligenceHub, ModelInventory};
