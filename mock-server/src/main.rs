use mock_server::{MockState, Space};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;

    let state = MockState::new();
    state
        .set_spaces(vec![
            Space::sample(98305, "DOC", "Documentation"),
            Space::sample(98306, "ENG", "Engineering"),
        ])
        .await;

    tracing::info!(%addr, session = state.session_id(), "mock confluence listening");
    mock_server::serve(listener, state).await
}
