use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use log::debug;
use serde::Serialize;

use crate::errors::ApiError;

pub const DEV_USER_ID: &str = "dev-user-id";
pub const DEV_USER_EMAIL: &str = "dev@example.com";

/// The caller behind a request, as asserted by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub subject: String,
    pub email: Option<String>,
}

impl Identity {
    pub fn dev() -> Self {
        Self {
            subject: DEV_USER_ID.to_string(),
            email: Some(DEV_USER_EMAIL.to_string()),
        }
    }
}

impl FromRequest for Identity {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Identity>()
                .cloned()
                .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into())),
        )
    }
}

#[derive(Clone)]
pub enum Authenticator {
    /// Local development: every request runs as [`Identity::dev`].
    Disabled,
    Jwks(jwt::JwksVerifier),
}

impl Authenticator {
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<Identity, ApiError> {
        match self {
            Authenticator::Disabled => Ok(Identity::dev()),
            Authenticator::Jwks(verifier) => {
                let token = jwt::parse_bearer(authorization)?;
                verifier.verify(token).await
            }
        }
    }
}

/// Rejects requests without a valid bearer token and stores the caller's
/// [`Identity`] in the request extensions.
pub struct AuthMiddleware {
    pub authenticator: Authenticator,
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            authenticator: self.authenticator.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    authenticator: Authenticator,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let authenticator = self.authenticator.clone();
        let authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Box::pin(async move {
            match authenticator.authenticate(authorization.as_deref()).await {
                Ok(identity) => {
                    debug!("authenticated {}", identity.subject);
                    req.extensions_mut().insert(identity);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(err) => {
                    debug!("rejected {} {}: {err}", req.method(), req.path());
                    let response = err.error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

pub mod jwt {
    use std::collections::HashMap;
    use std::sync::Arc;

    use chrono::{DateTime, Duration, Utc};
    use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
    use log::{error, info, warn};
    use serde::Deserialize;
    use tokio::sync::RwLock;

    use super::Identity;
    use crate::clock::Clock;
    use crate::config::AuthConfig;
    use crate::errors::ApiError;

    #[derive(Debug, Deserialize)]
    pub struct Claims {
        pub sub: String,
        #[serde(default)]
        pub email: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    struct JwksResponse {
        keys: Vec<JwkEntry>,
    }

    #[derive(Debug, Deserialize)]
    struct JwkEntry {
        kid: Option<String>,
        kty: String,
        n: Option<String>,
        e: Option<String>,
    }

    struct JwksCache {
        keys: HashMap<String, DecodingKey>,
        fetched_at: Option<DateTime<Utc>>,
    }

    /// Verifies RS256 bearer tokens against the provider's JWKS. Keys are
    /// cached for `ttl` as measured by the injected clock; an unknown `kid`
    /// forces one refetch.
    #[derive(Clone)]
    pub struct JwksVerifier {
        jwks_url: String,
        issuer: String,
        audience: Option<String>,
        ttl: Duration,
        http: reqwest::Client,
        clock: Arc<dyn Clock>,
        cache: Arc<RwLock<JwksCache>>,
    }

    pub fn parse_bearer(authorization: Option<&str>) -> Result<&str, ApiError> {
        let value =
            authorization.ok_or_else(|| ApiError::Unauthorized("Missing bearer token".into()))?;
        let (scheme, token) = value
            .split_once(' ')
            .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header".into()))?;
        if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
            return Err(ApiError::Unauthorized("Invalid authorization header".into()));
        }
        Ok(token.trim())
    }

    impl JwksVerifier {
        pub fn new(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
            Self {
                jwks_url: config.jwks_url.clone(),
                issuer: config.issuer.clone(),
                audience: config.audience.clone(),
                ttl: Duration::seconds(i64::try_from(config.cache_ttl_secs).unwrap_or(i64::MAX)),
                http: reqwest::Client::new(),
                clock,
                cache: Arc::new(RwLock::new(JwksCache {
                    keys: HashMap::new(),
                    fetched_at: None,
                })),
            }
        }

        pub async fn verify(&self, token: &str) -> Result<Identity, ApiError> {
            let header = decode_header(token)
                .map_err(|_| ApiError::Unauthorized("Invalid token header".into()))?;
            if header.alg != Algorithm::RS256 {
                return Err(ApiError::Unauthorized("Unsupported token algorithm".into()));
            }
            let kid = header
                .kid
                .ok_or_else(|| ApiError::Unauthorized("Token has no key id".into()))?;
            let key = self.get_key(&kid).await?;

            let mut validation = Validation::new(Algorithm::RS256);
            validation.set_issuer(&[self.issuer.as_str()]);
            match &self.audience {
                Some(audience) => validation.set_audience(&[audience.as_str()]),
                None => validation.validate_aud = false,
            }

            let data = decode::<Claims>(token, &key, &validation).map_err(|err| {
                warn!("rejected bearer token: {err}");
                ApiError::Unauthorized(format!("Invalid token: {err}"))
            })?;
            Ok(Identity {
                subject: data.claims.sub,
                email: data.claims.email,
            })
        }

        pub async fn get_key(&self, kid: &str) -> Result<DecodingKey, ApiError> {
            {
                let cache = self.cache.read().await;
                if self.is_fresh(&cache) {
                    if let Some(key) = cache.keys.get(kid) {
                        return Ok(key.clone());
                    }
                }
            }

            self.refresh().await?;

            let cache = self.cache.read().await;
            cache
                .keys
                .get(kid)
                .cloned()
                .ok_or_else(|| ApiError::Unauthorized("Invalid token: key not found".into()))
        }

        fn is_fresh(&self, cache: &JwksCache) -> bool {
            match cache.fetched_at {
                Some(at) => self.clock.now() - at < self.ttl,
                None => false,
            }
        }

        async fn refresh(&self) -> Result<(), ApiError> {
            info!("fetching JWKS from {}", self.jwks_url);
            let unavailable = || ApiError::ServiceUnavailable("Identity provider unavailable".into());

            let response = self
                .http
                .get(&self.jwks_url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|err| {
                    error!("JWKS fetch failed: {err}");
                    unavailable()
                })?;
            let jwks: JwksResponse = response.json().await.map_err(|err| {
                error!("JWKS parse failed: {err}");
                unavailable()
            })?;

            let mut keys = HashMap::new();
            for entry in jwks.keys {
                if entry.kty != "RSA" {
                    continue;
                }
                let (Some(kid), Some(n), Some(e)) = (entry.kid, entry.n, entry.e) else {
                    continue;
                };
                match DecodingKey::from_rsa_components(&n, &e) {
                    Ok(key) => {
                        keys.insert(kid, key);
                    }
                    Err(err) => warn!("skipping JWKS key {kid}: {err}"),
                }
            }

            let mut cache = self.cache.write().await;
            cache.keys = keys;
            cache.fetched_at = Some(self.clock.now());
            Ok(())
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_rt::test]
    async fn disabled_mode_injects_dev_identity() {
        let identity = Authenticator::Disabled.authenticate(None).await.unwrap();
        assert_eq!(identity.subject, "dev-user-id");
        assert_eq!(identity.email.as_deref(), Some("dev@example.com"));
    }
}
