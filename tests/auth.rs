mod common;

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use event_manager::config::AuthConfig;
use event_manager::service::auth::{jwt::JwksVerifier, Authenticator};

use common::*;

const ISSUER: &str = "https://issuer.example.com/";
const KID: &str = "test-key";
const MODULUS: &str = "vME7MGplODh34lsVBzHhGBoEQPO1cUwqpbUcoGfeTtpFLgdLKe8ijwxxSlAR4IGU6CW--vtxO_Ou7WdpXRa-NcheG5Ui4DyV-UlVOvrp1eIiI4WZ4A9mk-X76uk5D3E3DTFeizJNn-DxHCFYw-ERDpvdaUzV_KK4lVMffGbI3uZ1pY116yX8Rrp1oaLciQjqaUag4viAcWd9uCukmjkQYhytmqDdmzDoGnjlRoclhRI-9iBPsyiKNkNGRJJSeL71zP7pv4yPjIUxWJLjVl_tDUBEocy_oDQlX6652Xm5KMpQkTpkxHz1aJvQIiTiYB29K4TR56-3ibfhjdj2vAsiKw";

fn token(kid: &str, issuer: &str) -> String {
    let mut header = Header::new(jsonwebtoken::Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let claims = json!({
        "sub": "auth0|alice",
        "email": "alice@example.com",
        "iss": issuer,
        "exp": 4_000_000_000u64
    });
    let key = EncodingKey::from_rsa_pem(include_bytes!("fixtures/jwt_test_key.pem")).unwrap();
    encode(&header, &claims, &key).unwrap()
}

async fn jwks_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keys": [
                {"kty": "RSA", "kid": KID, "use": "sig", "alg": "RS256", "n": MODULUS, "e": "AQAB"},
                {"kty": "EC", "kid": "ec-key", "crv": "P-256", "x": "abc", "y": "def"}
            ]
        })))
        .mount(&server)
        .await;
    server
}

fn authenticator(ctx: &TestContext, jwks_url: String, ttl: u64) -> Authenticator {
    let config = AuthConfig {
        jwks_url,
        issuer: ISSUER.to_string(),
        audience: None,
        cache_ttl_secs: ttl,
    };
    Authenticator::Jwks(JwksVerifier::new(&config, Arc::new(ctx.clock.clone())))
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

#[actix_rt::test]
async fn valid_token_reaches_protected_routes() {
    let server = jwks_server().await;
    let ctx = TestContext::new();
    let app = ctx
        .app_with(authenticator(&ctx, format!("{}/.well-known/jwks.json", server.uri()), 3600))
        .await;

    let req = actix_web::test::TestRequest::get()
        .uri("/users")
        .insert_header(bearer(&token(KID, ISSUER)))
        .to_request();
    let page = expect(actix_web::test::call_service(&app, req).await, 200).await;
    assert_eq!(page["total"], 0);
}

#[actix_rt::test]
async fn missing_or_malformed_token_is_401() {
    let server = jwks_server().await;
    let ctx = TestContext::new();
    let app = ctx
        .app_with(authenticator(&ctx, format!("{}/.well-known/jwks.json", server.uri()), 3600))
        .await;

    let resp = get(&app, "/users").await;
    assert_eq!(resp.status().as_u16(), 401);
    assert_eq!(resp.headers().get("WWW-Authenticate").unwrap(), "Bearer");

    let req = actix_web::test::TestRequest::get()
        .uri("/events")
        .insert_header(("Authorization", "Bearer not.a.jwt"))
        .to_request();
    expect(actix_web::test::call_service(&app, req).await, 401).await;

    let req = actix_web::test::TestRequest::get()
        .uri("/events")
        .insert_header(bearer(&token(KID, "https://someone-else.example.com/")))
        .to_request();
    expect(actix_web::test::call_service(&app, req).await, 401).await;
}

#[actix_rt::test]
async fn unknown_key_id_is_401() {
    let server = jwks_server().await;
    let ctx = TestContext::new();
    let app = ctx
        .app_with(authenticator(&ctx, format!("{}/.well-known/jwks.json", server.uri()), 3600))
        .await;

    let req = actix_web::test::TestRequest::get()
        .uri("/users")
        .insert_header(bearer(&token("rotated-away", ISSUER)))
        .to_request();
    let err = expect(actix_web::test::call_service(&app, req).await, 401).await;
    assert_eq!(err["detail"], "Invalid token: key not found");
}

#[actix_rt::test]
async fn unreachable_provider_is_503() {
    let ctx = TestContext::new();
    let app = ctx
        .app_with(authenticator(&ctx, "http://127.0.0.1:1/jwks.json".to_string(), 3600))
        .await;

    let req = actix_web::test::TestRequest::get()
        .uri("/users")
        .insert_header(bearer(&token(KID, ISSUER)))
        .to_request();
    let err = expect(actix_web::test::call_service(&app, req).await, 503).await;
    assert_eq!(err["detail"], "Identity provider unavailable");
}

#[actix_rt::test]
async fn public_routes_skip_authentication() {
    let ctx = TestContext::new();
    let app = ctx
        .app_with(authenticator(&ctx, "http://127.0.0.1:1/jwks.json".to_string(), 3600))
        .await;

    expect(get(&app, "/health").await, 200).await;
    expect(get(&app, "/invitations/some-token").await, 404).await;
}

#[actix_rt::test]
async fn keys_are_cached_until_ttl() {
    let server = jwks_server().await;
    let ctx = TestContext::new();
    let verifier = match authenticator(&ctx, format!("{}/.well-known/jwks.json", server.uri()), 60) {
        Authenticator::Jwks(verifier) => verifier,
        Authenticator::Disabled => unreachable!(),
    };
    let token = token(KID, ISSUER);

    let identity = verifier.verify(&token).await.unwrap();
    assert_eq!(identity.subject, "auth0|alice");
    assert_eq!(identity.email.as_deref(), Some("alice@example.com"));
    verifier.verify(&token).await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    ctx.clock.advance(Duration::seconds(61));
    verifier.verify(&token).await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[actix_rt::test]
async fn disabled_mode_acts_as_dev_user() {
    let ctx = TestContext::new();
    let app = ctx.app().await;
    let user = create_user(&app, "dev@example.com").await;
    expect(delete(&app, &format!("/users/{}", id_of(&user))).await, 200).await;
}
