#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;

    use timetable_tool::http_api;
    use tracing::info;
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr: SocketAddr = std::env::var("TIMETABLE_HTTP_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;

    let state = initial_state()?;
    info!(%addr, "timetable HTTP API listening");
    http_api::serve(addr, state).await?;
    Ok(())
}

/// With `TIMETABLE_SQLITE_PATH` set, the stored snapshot is loaded and every
/// committed change is saved back to the same database.
#[cfg(all(feature = "http_api", feature = "sqlite"))]
fn initial_state() -> Result<timetable_tool::http_api::AppState, Box<dyn std::error::Error>> {
    use std::sync::Arc;
    use timetable_tool::http_api::AppState;
    use timetable_tool::{SqliteTimetableStore, Timetable, TimetableStore};

    let Ok(path) = std::env::var("TIMETABLE_SQLITE_PATH") else {
        return Ok(AppState::new(Timetable::new()));
    };
    let store = Arc::new(SqliteTimetableStore::new(&path)?);
    let timetable = store.load_timetable()?.unwrap_or_default();
    tracing::info!(%path, entries = timetable.len(), "loaded timetable snapshot");
    Ok(AppState::with_store(timetable, store))
}

#[cfg(all(feature = "http_api", not(feature = "sqlite")))]
fn initial_state() -> Result<timetable_tool::http_api::AppState, Box<dyn std::error::Error>> {
    Ok(timetable_tool::http_api::AppState::new(
        timetable_tool::Timetable::new(),
    ))
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
