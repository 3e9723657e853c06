use actix_web::{App, HttpServer, Scope};
use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct HttpServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    pub port: u16,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

impl HttpServerConfig {
    //runs until the server stops; signals are handled by the caller
    pub async fn run_server<F>(&self, scopes: F) -> anyhow::Result<()>
    where
        F: Fn() -> Vec<Scope> + Send + Clone + 'static,
    {
        let address = (self.bind_address.as_str(), self.port);

        let server = HttpServer::new(move || {
            scopes()
                .into_iter()
                .fold(App::new().wrap(tracing_actix_web::TracingLogger::default()), |app, scope| {
                    app.service(scope)
                })
        })
        .workers(1)
        .disable_signals()
        .bind(address)
        .with_context(|| format!("Error binding HTTP server to {}:{}", self.bind_address, self.port))?;

        tracing::info!("HTTP server listening on {}:{}", self.bind_address, self.port);

        server
            .run()
            .await
            .with_context(|| format!("Error running HTTP server on port {}", self.port))
    }
}
