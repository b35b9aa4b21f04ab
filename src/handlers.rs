use actix_web::{web, HttpResponse};

use crate::classifier::Classifier;
use crate::decode;
use crate::error::ServiceError;
use crate::models::ClassificationRequest;

// Base64 image payloads routinely exceed the 2 MiB framework default.
const JSON_BODY_LIMIT: usize = 32 * 1024 * 1024;

/// JSON extractor config: raised body limit, and extraction failures
/// (missing `image` field, wrong type, invalid JSON) surface as the
/// service's own 400 envelope instead of the framework default.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(|err, _req| ServiceError::BadRequest(err.to_string()).into())
}

/// `POST /classify`: decode the base64 image and return the model's ranked
/// label/score list.
pub async fn classify(
    classifier: web::Data<dyn Classifier>,
    request: web::Json<ClassificationRequest>,
) -> Result<HttpResponse, ServiceError> {
    let image = decode::decode_image(&request.image)?;
    let predictions = classifier.classify(&image)?;

    if let Some(top) = predictions.first() {
        tracing::info!(label = %top.label, score = top.score, "classified image");
    }

    Ok(HttpResponse::Ok().json(predictions))
}
