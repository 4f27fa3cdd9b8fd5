// Application server configuration and setup

use std::{net::SocketAddr, time::Duration};
use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    extract::DefaultBodyLimit,
    error_handling::HandleErrorLayer,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER},
        HeaderName, HeaderValue, Method,
    },
};
use tower::{ServiceBuilder, timeout::TimeoutLayer};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tokio::{signal, net::TcpListener};
use listenfd::ListenFd;
use anyhow::{Context, Result};

use crate::api::{
    auth::routes::auth_routes,
    chat::routes::chat_routes,
    file::routes::file_routes,
    home::routes::home_routes,
    logs::routes::logs_routes,
    middleware::{
        rate_limit_middleware, request_logger,
        rate_limiter::{RATE_LIMIT_LIMIT_HEADER, RATE_LIMIT_REMAINING_HEADER},
    },
    ml_threats::routes::ml_threat_routes,
    token::routes::token_routes,
};
use crate::config::{environment::EnvironmentVariables, state::AppState};
use crate::utils::{
    error_handler::handle_global_error,
    response_handler::response_wrapper,
};

/// Cross-origin policy: only the configured origins, credentials allowed
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .with_context(|| format!("Invalid allowed origin '{origin}'"))
        })
        .collect::<Result<_>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
        .expose_headers([
            RETRY_AFTER,
            HeaderName::from_static(RATE_LIMIT_LIMIT_HEADER),
            HeaderName::from_static(RATE_LIMIT_REMAINING_HEADER),
        ])
        .max_age(Duration::from_secs(60 * 60)))
}

/// Creates and configures the application router with all middleware layers
pub fn create_app(state: AppState) -> Result<Router> {
    let env: &EnvironmentVariables = &state.environment;
    let cors: CorsLayer = cors_layer(&env.allowed_origins)?;
    let timeout: Duration = Duration::from_secs(env.default_timeout_seconds);
    let body_limit: usize = env.max_request_body_size;

    let router: Router = Router::new()
        .merge(home_routes())
        // Account and token routes share the /auth prefix
        .nest("/auth", auth_routes().merge(token_routes()))
        .nest("/chat", chat_routes())
        .nest("/file", file_routes())
        .merge(logs_routes())
        .merge(ml_threat_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                // Logged before CORS so answered preflights are recorded too
                .layer(from_fn_with_state(state.clone(), request_logger))
                .layer(cors)
                .layer(from_fn(response_wrapper))
                .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
                .layer(HandleErrorLayer::new(handle_global_error))
                .layer(TimeoutLayer::new(timeout))
                .layer(DefaultBodyLimit::max(body_limit))
        )
        .with_state(state);

    Ok(router)
}

/// Creates the log and upload directories when they are missing
pub async fn ensure_directories(env: &EnvironmentVariables) -> Result<()> {
    for dir in [&*env.log_dir, &*env.upload_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory '{dir}'"))?;
    }
    Ok(())
}

/// Sets up the TCP listener from environment or binds to new address
pub async fn setup_listener(env: &EnvironmentVariables) -> Result<TcpListener> {
    let mut listenfd: ListenFd = ListenFd::from_env();

    let listener: TcpListener = match listenfd.take_tcp_listener(0)? {
        Some(std_listener) => {
            std_listener.set_nonblocking(true)?;
            TcpListener::from_std(std_listener)?
        }
        None => {
            let addr: String = format!("{}:{}", env.host, env.port);
            TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?
        }
    };

    Ok(listener)
}

/// Human-readable URLs for the bound address
pub fn startup_urls(addr: SocketAddr) -> Vec<String> {
    if addr.ip().is_unspecified() {
        vec![
            format!("http://127.0.0.1:{}", addr.port()),
            format!("http://localhost:{}", addr.port()),
        ]
    } else {
        vec![format!("http://{addr}")]
    }
}

/// Builds the app, serves it and blocks until a shutdown signal arrives
pub async fn run(state: AppState) -> Result<()> {
    ensure_directories(&state.environment).await?;
    state.init_services().await?;

    let listener: TcpListener = setup_listener(&state.environment).await?;
    let app: Router = create_app(state)?;

    println!("✅ Server running at:");
    for url in startup_urls(listener.local_addr()?) {
        println!("   → {url}");
    }

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

/// Handles graceful shutdown signals (Ctrl+C and TERM)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install TERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate: std::future::Pending<()> = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Shutting down via Ctrl+C"),
        _ = terminate => tracing::info!("Shutting down via TERM signal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspecified_address_lists_loopback_urls() {
        let urls = startup_urls("0.0.0.0:8000".parse().unwrap());
        assert_eq!(urls, vec!["http://127.0.0.1:8000", "http://localhost:8000"]);

        let urls = startup_urls("127.0.0.1:9000".parse().unwrap());
        assert_eq!(urls, vec!["http://127.0.0.1:9000"]);
    }

    #[test]
    fn cors_rejects_invalid_origins() {
        assert!(cors_layer(&["http://localhost:3000".to_string()]).is_ok());
        assert!(cors_layer(&["bad\norigin".to_string()]).is_err());
    }
}
