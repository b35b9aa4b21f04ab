mod classifier;
mod decode;
mod error;
mod handlers;
mod models;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing_subscriber::EnvFilter;

use crate::classifier::{Classifier, OnnxClassifier, TRASHNET_LABELS};

const BIND_ADDR: &str = "0.0.0.0:5005";
const MODEL_PATH: &str = "model.onnx";

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "trashnet_backend=info".into()),
        )
        .init();

    // The model loads once, before the server accepts its first request,
    // and is shared read-only across all workers.
    let classifier = match OnnxClassifier::load(MODEL_PATH, &TRASHNET_LABELS) {
        Ok(classifier) => classifier,
        Err(e) => {
            tracing::error!("{e}");
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        }
    };
    let classifier: web::Data<dyn Classifier> =
        web::Data::from(Arc::new(classifier) as Arc<dyn Classifier>);

    tracing::info!("model loaded from {MODEL_PATH}, listening on http://{BIND_ADDR}");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .app_data(classifier.clone())
            .app_data(handlers::json_config())
            .service(web::resource("/classify").route(web::post().to(handlers::classify)))
    })
    .bind(BIND_ADDR)?
    .run()
    .await
}
