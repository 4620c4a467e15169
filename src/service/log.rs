use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use colored::Colorize;
use env_logger::{Builder, Env};
use futures_util::future::LocalBoxFuture;
use log::{info, warn, Level};
use std::future::{ready, Ready};
use std::io::Write;
use std::time::Instant;

/// Logs every request line and the status it ended with.
pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggerMiddlewareService { service }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let line = format!("{} {}", req.method(), redact(req.path()));
        info!("server request: {line}");
        let started = Instant::now();
        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            let elapsed = started.elapsed().as_millis();
            if res.status().is_server_error() {
                warn!("server response: {line} {} ({elapsed} ms)", res.status());
            } else {
                info!("server response: {line} {} ({elapsed} ms)", res.status());
            }
            Ok(res)
        })
    }
}

/// Raw invitation tokens travel in the path of `GET /invitations/{token}`.
fn redact(path: &str) -> String {
    match path.strip_prefix("/invitations/") {
        Some(rest) if !rest.is_empty() => "/invitations/***".to_string(),
        _ => path.to_string(),
    }
}

/// Installs the global logger; `RUST_LOG` overrides the default `info` level.
pub fn init_logger() {
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let level = match record.level() {
                Level::Error => "ERROR".red().bold(),
                Level::Warn => "WARN".yellow().bold(),
                Level::Info => "INFO".green().bold(),
                Level::Debug => "DEBUG".blue().bold(),
                Level::Trace => "TRACE".magenta().bold(),
            };
            writeln!(buf, "{level} [{}] {}", record.target(), record.args())
        })
        .try_init();
}
