use crate::config::AppConfig;

pub async fn handle(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env();
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    crate::server::serve(config).await
}
