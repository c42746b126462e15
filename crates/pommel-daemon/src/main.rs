//! Binary entry point for `pommeld`. Wiring lives in the library so
//! integration tests can build an `AppState`/`Router` without a real
//! network listener or filesystem watcher.

use pommel_daemon::config::PommelConfig;
use pommel_daemon::{build_state, resolve_project_root, spawn_background_tasks};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let root = resolve_project_root();
    let config = PommelConfig::load(&root)?;
    log::info!("starting pommeld for {} on port {}", root.display(), config.server.port);

    let port = config.server.port;
    let (state, watcher) = build_state(&root, config)?;
    spawn_background_tasks(&state, watcher);

    let app = pommel_daemon::routes::router(state);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    log::info!("listening on http://127.0.0.1:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
