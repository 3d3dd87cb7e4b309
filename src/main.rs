//! 게시글(post)을 메모리에 보관하고 JSON 스냅샷으로 저장하는 교육용 포럼 서버입니다.
//!
//! API:
//!
//! - `GET /`: 환영 메시지
//! - `GET /echo/echo?message=...`: 메시지를 그대로 돌려줌 (`echo` 는 에러)
//! - `POST /post/create`: 게시글 생성 `{"sender", "title", "content"}`
//! - `GET /posts/list`: 게시글 목록 (최신순, content 제외)
//! - `DELETE /clear`: 전체 상태 초기화
//!
//! 실행 방법:
//!
//! ```bash
//! cargo run
//! FORUM_STORE=memory PORT=4000 cargo run
//! ```

mod config;
mod error;
mod forum;
mod handlers;
mod persistence;


use std::{error::Error, sync::Arc, time::Duration};

use axum::{
    extract::{MatchedPath, Request},
    routing::{delete, get, post},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::{Backend, Config},
    forum::Forum,
    persistence::{FileStore, MemoryStore, Persistence, RemoteStore},
};

/// 🏁 main()

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,tower_http=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    // 저장소 종류에 따라 Forum<P> 의 타입이 달라지므로 여기서 분기
    match &config.backend {
        Backend::File(path) => serve(&config, FileStore::new(path)).await,
        Backend::Remote(url) => {
            let store = RemoteStore::new(url, config.remote_timeout())?;
            serve(&config, store).await
        }
        Backend::Memory => serve(&config, MemoryStore).await,
    }
}

/// Loads the persisted forum, binds the listener and runs until a shutdown signal.
async fn serve<P: Persistence>(config: &Config, persistence: P) -> Result<(), Box<dyn Error>> {
    let forum = Arc::new(Forum::load(persistence).await?);

    let listener = TcpListener::bind(config.addr()).await?;
    tracing::info!("server started at http://{}", listener.local_addr()?);

    axum::serve(listener, app(forum, config.request_timeout))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down server gracefully");
    Ok(())
}

/// 🧭 라우터 구성
///
/// Having a function that produces our app makes it easy to call it from tests
/// without having to create an HTTP server.
fn app<P: Persistence>(forum: Arc<Forum<P>>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/echo/echo", get(handlers::echo))
        .route("/post/create", post(handlers::post_create::<P>))
        .route("/posts/list", get(handlers::posts_list::<P>))
        .route("/clear", delete(handlers::clear::<P>))
        // 정의되지 않은 경로는 404
        .fallback(handlers::not_found)
        .layer((
            TraceLayer::new_for_http().make_span_with(|req: &Request| {
                let method = req.method();
                let uri = req.uri();
                let matched_path = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|matched| matched.as_str());

                tracing::debug_span!("request", %method, %uri, matched_path)
            }),
            CorsLayer::permissive(),
            TimeoutLayer::new(request_timeout),
        ))
        .with_state(forum)
}

// 🧠 종료 신호 처리

async fn shutdown_signal() {
    // Ctrl+C (SIGINT)
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    // UNIX 환경: SIGTERM
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
