use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mock_server=info,tower_http=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let username = std::env::var("MOCK_USERNAME").unwrap_or_else(|_| mock_server::DEFAULT_USERNAME.to_string());
    let password = std::env::var("MOCK_PASSWORD").unwrap_or_else(|_| mock_server::DEFAULT_PASSWORD.to_string());

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, %username, "listening");
    mock_server::serve(listener, mock_server::app_with_credentials(&username, &password)).await
}
