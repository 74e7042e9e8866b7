//! Text embedding endpoint.

use actix_web::{HttpResponse, web};
use counsel_core::error::DomainError;
use counsel_shared::{EmbedRequest, EmbedResponse};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Rate limit bucket shared by every request to this endpoint.
pub const RATE_LIMIT_BUCKET: &str = "embed";

/// Embed a piece of text.
///
/// POST /api/embed
pub async fn embed(
    state: web::Data<AppState>,
    body: web::Json<EmbedRequest>,
) -> AppResult<HttpResponse> {
    let input = body.validate().map_err(DomainError::Validation)?;

    let Some(embedder) = state.embedder.as_ref() else {
        return Err(AppError::Internal(
            "embedding provider is not configured".to_string(),
        ));
    };

    let embedding = embedder.embed(input).await?;
    tracing::debug!(
        model = %embedding.model,
        dimensions = embedding.vector.len(),
        "Embedding served"
    );

    Ok(HttpResponse::Ok().json(EmbedResponse {
        embedding: embedding.vector,
        embedding_model: embedding.model,
    }))
}

/// CORS preflight.
///
/// OPTIONS /api/embed
pub async fn preflight() -> HttpResponse {
    HttpResponse::Ok().finish()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use actix_web::http::{Method, StatusCode, header};
    use actix_web::{App, test};
    use async_trait::async_trait;
    use counsel_core::ports::{Embedding, EmbeddingError, EmbeddingProvider, RateLimitPolicy};
    use counsel_shared::ErrorResponse;
    use serde_json::json;

    use super::*;
    use crate::handlers::configure_routes;
    use crate::middleware::cors::cors_headers;

    #[derive(Default)]
    struct StubEmbedder {
        inputs: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed(&self, input: &str) -> Result<Embedding, EmbeddingError> {
            self.inputs.lock().unwrap().push(input.to_string());
            Ok(Embedding {
                vector: vec![0.125, -0.5],
                model: "stub-embedding".to_string(),
            })
        }
    }

    fn state_with(max_requests: u32, embedder: Option<Arc<StubEmbedder>>) -> AppState {
        AppState::in_memory(
            RateLimitPolicy::from_millis(60_000, max_requests),
            embedder.map(|e| e as Arc<dyn EmbeddingProvider>),
        )
    }

    fn embed_request(client: &str, body: serde_json::Value) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/embed")
            .insert_header(("x-forwarded-for", client))
            .set_json(body)
    }

    #[actix_web::test]
    async fn test_embed_returns_vector_and_model() {
        let embedder = Arc::new(StubEmbedder::default());
        let app = test::init_service(
            App::new()
                .wrap(cors_headers())
                .app_data(web::Data::new(state_with(20, Some(embedder.clone()))))
                .configure(configure_routes),
        )
        .await;

        let resp = test::call_service(
            &app,
            embed_request("203.0.113.7", json!({"input": "  tenant rights in Ohio "})).to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
        assert_eq!(resp.headers().get("x-ratelimit-remaining").unwrap(), "19");
        let body: EmbedResponse = test::read_body_json(resp).await;
        assert_eq!(body.embedding, vec![0.125, -0.5]);
        assert_eq!(body.embedding_model, "stub-embedding");
        assert_eq!(
            *embedder.inputs.lock().unwrap(),
            vec!["tenant rights in Ohio".to_string()]
        );
    }

    #[actix_web::test]
    async fn test_invalid_bodies_are_bad_requests() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with(20, Some(Arc::default()))))
                .configure(configure_routes),
        )
        .await;

        let blank = embed_request("203.0.113.7", json!({"input": "   "})).to_request();
        let resp = test::call_service(&app, blank).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert!(!body.error.is_empty());

        let oversized =
            embed_request("203.0.113.7", json!({"input": "x".repeat(8001)})).to_request();
        let resp = test::call_service(&app, oversized).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let missing = embed_request("203.0.113.7", json!({"text": "hello"})).to_request();
        let resp = test::call_service(&app, missing).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let malformed = test::TestRequest::post()
            .uri("/api/embed")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{\"input\": ")
            .to_request();
        let resp = test::call_service(&app, malformed).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert!(body.error.starts_with("Invalid request body"));
    }

    #[actix_web::test]
    async fn test_rate_limit_is_per_forwarded_client() {
        let app = test::init_service(
            App::new()
                .wrap(cors_headers())
                .app_data(web::Data::new(state_with(2, Some(Arc::default()))))
                .configure(configure_routes),
        )
        .await;

        for _ in 0..2 {
            let req = embed_request("198.51.100.4, 10.0.0.1", json!({"input": "probate"}))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        }

        let req = embed_request("198.51.100.4", json!({"input": "probate"})).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
        let retry_after: u64 = resp
            .headers()
            .get(header::RETRY_AFTER)
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=60).contains(&retry_after));
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body, ErrorResponse::rate_limited());

        let other = embed_request("192.0.2.99", json!({"input": "probate"})).to_request();
        assert_eq!(test::call_service(&app, other).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_preflight_is_never_limited() {
        let app = test::init_service(
            App::new()
                .wrap(cors_headers())
                .app_data(web::Data::new(state_with(1, Some(Arc::default()))))
                .configure(configure_routes),
        )
        .await;

        let req = embed_request("198.51.100.4", json!({"input": "custody"})).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        for _ in 0..3 {
            let req = test::TestRequest::default()
                .method(Method::OPTIONS)
                .uri("/api/embed")
                .insert_header(("x-forwarded-for", "198.51.100.4"))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(
                resp.headers().get("access-control-allow-methods").unwrap(),
                "POST, OPTIONS"
            );
        }
    }

    #[actix_web::test]
    async fn test_missing_provider_is_internal_error() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with(20, None)))
                .configure(configure_routes),
        )
        .await;

        let req = embed_request("203.0.113.7", json!({"input": "hello"})).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body, ErrorResponse::internal_error());
    }
}
