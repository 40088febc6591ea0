//! Tests for auth module
//!
//! Covers the token codec (algorithm allow-list, reason subtypes), the
//! provider registry, the credential store (transactional supersede,
//! single-use login states) and the fail-open identity middleware.

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::auth::middleware::{identity_middleware, resolve_identity, CurrentUser};
    use crate::auth::models::{UserProfile, UserType};
    use crate::auth::providers::google;
    use crate::auth::registry::ProviderRegistry;
    use crate::auth::store::AuthStore;
    use crate::auth::token::{TokenCodec, TokenError};
    use crate::common::AppState;

    use axum::body::Body;
    use axum::extract::Extension;
    use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue, Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn setup_test_db() -> SqlitePool {
        // One connection: every connection to sqlite::memory: is its own db.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::common::migrations::run_migrations(&pool).await.unwrap();
        pool
    }

    fn test_profile(email: &str) -> UserProfile {
        UserProfile {
            email: email.to_string(),
            user_type: UserType::Normal,
        }
    }

    async fn test_state(pool: SqlitePool, secret: &str) -> Arc<AppState> {
        let mut registry = ProviderRegistry::new();
        registry
            .register(google::registration(
                "http://localhost:8080",
                "test_client_id".to_string(),
                "test_secret".to_string(),
            ))
            .unwrap();

        Arc::new(AppState {
            db: pool,
            http: reqwest::Client::new(),
            token_codec: TokenCodec::new(secret),
            registry: Arc::new(registry),
        })
    }

    // ---- token codec ----

    #[test]
    fn test_sign_verify_round_trip() {
        let codec = TokenCodec::new("test_secret_key");
        let token = codec.sign(42).unwrap();
        assert_eq!(codec.verify(&token).unwrap(), 42);
    }

    #[test]
    fn test_verify_fails_with_wrong_secret() {
        let codec = TokenCodec::new("test_secret_key");
        let token = codec.sign(42).unwrap();

        let other = TokenCodec::new("wrong_secret_key");
        assert!(matches!(
            other.verify(&token),
            Err(TokenError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_verify_rejects_non_hmac_algorithm() {
        // A token claiming RS256 must be rejected from the header alone,
        // regardless of its signature bytes.
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"id":1,"exp":9999999999}"#);
        let forged = format!("{}.{}.{}", header, payload, "c2lnbmF0dXJl");

        let codec = TokenCodec::new("test_secret_key");
        assert!(matches!(
            codec.verify(&forged),
            Err(TokenError::UnsupportedAlgorithm)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let codec = TokenCodec::new("test_secret_key");
        assert!(matches!(
            codec.verify("not-a-token"),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn test_verify_rejects_missing_id_claim() {
        use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

        let claims = serde_json::json!({ "exp": 9999999999u64 });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test_secret_key"),
        )
        .unwrap();

        let codec = TokenCodec::new("test_secret_key");
        assert!(matches!(
            codec.verify(&token),
            Err(TokenError::MissingClaim)
        ));
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

        let claims = serde_json::json!({ "id": 7, "exp": 100 });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test_secret_key"),
        )
        .unwrap();

        let codec = TokenCodec::new("test_secret_key");
        assert!(matches!(codec.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_empty_secret_is_a_codec_error() {
        let codec = TokenCodec::new("");
        assert!(matches!(codec.sign(1), Err(TokenError::MissingSecret)));
        assert!(matches!(
            codec.verify("whatever"),
            Err(TokenError::MissingSecret)
        ));
    }

    // ---- provider registry ----

    #[test]
    fn test_registry_rejects_duplicate_keys() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(google::registration(
                "http://localhost:8080",
                "a".to_string(),
                "b".to_string(),
            ))
            .unwrap();

        let duplicate = registry.register(google::registration(
            "http://localhost:8080",
            "c".to_string(),
            "d".to_string(),
        ));
        assert!(duplicate.is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(google::registration(
                "http://localhost:8080",
                "a".to_string(),
                "b".to_string(),
            ))
            .unwrap();

        assert!(registry.find("google").is_some());
        assert!(registry.find("github").is_none());
    }

    #[test]
    fn test_authorization_url_contents() {
        let registration = google::registration(
            "http://localhost:8080",
            "test_client_id".to_string(),
            "test_secret".to_string(),
        );
        let url = registration.oauth.authorization_url("attempt-state-123");

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth"));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("scope="));
        assert!(url.contains("userinfo.email"));
        assert!(url.contains("state=attempt-state-123"));
        assert!(url.contains(
            &urlencoding::encode("http://localhost:8080/oauth/2/google/callback").into_owned()
        ));
    }

    // ---- credential store ----

    #[tokio::test]
    async fn test_find_or_create_user_creates_once() {
        let pool = setup_test_db().await;
        let store = AuthStore::new(pool.clone());

        let first = store
            .find_or_create_user(&test_profile("new@example.com"))
            .await
            .unwrap();
        let second = store
            .find_or_create_user(&test_profile("new@example.com"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.password, "");
        assert_eq!(first.user_type, UserType::Normal);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_replace_credential_supersedes_prior_rows() {
        let pool = setup_test_db().await;
        let store = AuthStore::new(pool.clone());
        let user = store
            .find_or_create_user(&test_profile("seen@example.com"))
            .await
            .unwrap();

        // Seed two stale rows for the same (provider, version, user).
        for token in ["stale-1", "stale-2"] {
            sqlx::query(
                r#"
                INSERT INTO oauth_tokens
                    (version, provider, access_token, refresh_token, expiry, last_refresh, user_id)
                VALUES (2, 'google', ?, 'r', '2020-01-01T00:00:00Z', '2020-01-01T00:00:00Z', ?)
                "#,
            )
            .bind(token)
            .bind(user.id)
            .execute(&pool)
            .await
            .unwrap();
        }

        store
            .replace_credential(
                "google",
                2,
                user.id,
                "fresh-access",
                "fresh-refresh",
                chrono::Utc::now(),
            )
            .await
            .unwrap();

        let rows = store.credentials_for_user("google", 2, user.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].access_token, "fresh-access");
        assert_eq!(rows[0].refresh_token, "fresh-refresh");
        assert_eq!(rows[0].user_id, user.id);
    }

    #[tokio::test]
    async fn test_unseen_email_creates_exactly_one_user_and_credential() {
        let pool = setup_test_db().await;
        let store = AuthStore::new(pool.clone());

        let user = store
            .find_or_create_user(&test_profile("fresh@example.com"))
            .await
            .unwrap();
        store
            .replace_credential("google", 2, user.id, "a", "r", chrono::Utc::now())
            .await
            .unwrap();

        let users: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        let tokens: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM oauth_tokens")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users.0, 1);
        assert_eq!(tokens.0, 1);

        let rows = store.credentials_for_user("google", 2, user.id).await.unwrap();
        assert_eq!(rows[0].user_id, user.id);
    }

    #[tokio::test]
    async fn test_login_state_is_single_use() {
        let pool = setup_test_db().await;
        let store = AuthStore::new(pool);

        let state = store.issue_login_state("google").await.unwrap();
        assert!(store.consume_login_state(&state, "google").await.unwrap());
        // Replay of the same state fails.
        assert!(!store.consume_login_state(&state, "google").await.unwrap());
    }

    #[tokio::test]
    async fn test_login_state_provider_and_expiry_checks() {
        let pool = setup_test_db().await;
        let store = AuthStore::new(pool.clone());

        let state = store.issue_login_state("google").await.unwrap();
        // Issued for google, presented on another provider's callback.
        assert!(!store.consume_login_state(&state, "github").await.unwrap());

        // An expired state is never accepted.
        sqlx::query("INSERT INTO oauth_states (state, provider, expires_at) VALUES (?, 'google', 0)")
            .bind("long-gone")
            .execute(&pool)
            .await
            .unwrap();
        assert!(!store.consume_login_state("long-gone", "google").await.unwrap());
    }

    // ---- identity resolution ----

    fn bearer_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[tokio::test]
    async fn test_resolve_identity_valid_token() {
        let pool = setup_test_db().await;
        let store = AuthStore::new(pool.clone());
        let user = store
            .find_or_create_user(&test_profile("authed@example.com"))
            .await
            .unwrap();

        let state = test_state(pool, "test_secret_key").await;
        let token = state.token_codec.sign(user.id).unwrap();

        let resolved = resolve_identity(&state, &bearer_headers(&format!("Bearer {}", token))).await;
        assert_eq!(resolved.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_resolve_identity_is_anonymous_without_header() {
        let pool = setup_test_db().await;
        let state = test_state(pool, "test_secret_key").await;
        assert!(resolve_identity(&state, &HeaderMap::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_identity_requires_exact_bearer_prefix() {
        let pool = setup_test_db().await;
        let store = AuthStore::new(pool.clone());
        let user = store
            .find_or_create_user(&test_profile("prefix@example.com"))
            .await
            .unwrap();

        let state = test_state(pool, "test_secret_key").await;
        let token = state.token_codec.sign(user.id).unwrap();

        // Lowercase scheme and missing space are both anonymous, not errors.
        assert!(resolve_identity(&state, &bearer_headers(&format!("bearer {}", token)))
            .await
            .is_none());
        assert!(resolve_identity(&state, &bearer_headers(&format!("Bearer{}", token)))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_resolve_identity_unknown_user_is_anonymous() {
        let pool = setup_test_db().await;
        let state = test_state(pool, "test_secret_key").await;
        let token = state.token_codec.sign(9999).unwrap();

        assert!(resolve_identity(&state, &bearer_headers(&format!("Bearer {}", token)))
            .await
            .is_none());
    }

    // ---- middleware fail-open behavior ----

    async fn probe(Extension(current): Extension<CurrentUser>) -> String {
        match current.0 {
            Some(user) => user.email,
            None => "anonymous".to_string(),
        }
    }

    fn probe_app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/probe", get(probe))
            .layer(axum::middleware::from_fn(identity_middleware))
            .layer(Extension(state))
    }

    #[tokio::test]
    async fn test_invalid_token_request_still_proceeds() {
        // Fail-open is deliberate: a bad token must never reject the
        // request at this layer.
        let pool = setup_test_db().await;
        let app = probe_app(test_state(pool, "test_secret_key").await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/probe")
                    .header(AUTHORIZATION, "Bearer garbage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"anonymous");
    }

    #[tokio::test]
    async fn test_wrong_secret_token_request_still_proceeds() {
        let pool = setup_test_db().await;
        let store = AuthStore::new(pool.clone());
        let user = store
            .find_or_create_user(&test_profile("victim@example.com"))
            .await
            .unwrap();

        let attacker = TokenCodec::new("attacker_secret");
        let forged = attacker.sign(user.id).unwrap();

        let app = probe_app(test_state(pool, "test_secret_key").await);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/probe")
                    .header(AUTHORIZATION, format!("Bearer {}", forged))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"anonymous");
    }

    #[tokio::test]
    async fn test_valid_token_resolves_request_identity() {
        let pool = setup_test_db().await;
        let store = AuthStore::new(pool.clone());
        let user = store
            .find_or_create_user(&test_profile("resolved@example.com"))
            .await
            .unwrap();

        let state = test_state(pool, "test_secret_key").await;
        let token = state.token_codec.sign(user.id).unwrap();

        let app = probe_app(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/probe")
                    .header(AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"resolved@example.com");
    }

    // ---- login flow over the router ----

    fn oauth_app(state: Arc<AppState>) -> Router {
        crate::auth::oauth_routes().layer(Extension(state))
    }

    #[tokio::test]
    async fn test_login_redirects_with_client_id_scopes_and_state() {
        let pool = setup_test_db().await;
        let app = oauth_app(test_state(pool, "test_secret_key").await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/oauth/2/google/login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(axum::http::header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(location.contains("client_id=test_client_id"));
        assert!(location.contains("scope="));
        assert!(location.contains("state="));
    }

    #[tokio::test]
    async fn test_callback_with_mismatched_state_is_corrupted_state() {
        let pool = setup_test_db().await;
        let state = test_state(pool.clone(), "test_secret_key").await;

        // A state was issued, but the callback presents a different one.
        AuthStore::new(pool).issue_login_state("google").await.unwrap();

        let app = oauth_app(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/oauth/2/google/callback?state=bogus&code=valid-looking-code")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Corrupted state");
    }

    #[tokio::test]
    async fn test_callback_for_unregistered_provider() {
        let pool = setup_test_db().await;
        let state = test_state(pool.clone(), "test_secret_key").await;

        // State issuance is store-level, so a valid state can exist for a
        // provider nobody registered.
        let login_state = AuthStore::new(pool)
            .issue_login_state("github")
            .await
            .unwrap();

        let app = oauth_app(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!(
                        "/oauth/2/github/callback?state={}&code=x",
                        login_state
                    ))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "auth not configured for \"github\"");
    }

    #[tokio::test]
    async fn test_login_with_non_numeric_version_is_invalid_callback() {
        let pool = setup_test_db().await;
        let app = oauth_app(test_state(pool, "test_secret_key").await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/oauth/two/google/login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Invalid callback");
    }
}
