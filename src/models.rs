use serde::{Deserialize, Serialize};

/// Request body for `POST /classify`.
#[derive(Debug, Deserialize)]
pub struct ClassificationRequest {
    /// Base64-encoded image bytes, standard alphabet with padding.
    pub image: String,
}

/// One ranked prediction from the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub score: f32,
}

/// JSON envelope for every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}
