use actix_cors::Cors;

use crate::config::CorsConfig;

/// CORS policy for the API. An empty origin list allows any origin.
pub fn cors(config: &CorsConfig) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);

    if config.allowed_origins.is_empty() {
        return cors.allow_any_origin();
    }
    config
        .allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}
