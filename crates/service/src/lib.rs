//! Advisor Service: HTTP front end of the product advisor.
//!
//! Loads the trained artifacts once and answers `POST /predict` with the
//! recommended product for one set of questionnaire answers. `GET /health`
//! reports whether the artifacts can be loaded.

pub mod config;
pub mod errors;
pub mod predictor;
pub mod request;
pub mod server;

pub use config::{LogFormat, ServiceConfig, UnknownCategoryMode};
pub use errors::ServiceError;
pub use predictor::{ModelInfo, PredictionService};
pub use request::{ErrorResponse, HealthResponse, PredictRequest, PredictResponse, QUESTION_FIELDS};
pub use server::{build_router, cors_layer, start_server, AppState, SharedState};
