use tracing::error;

use rudis::server::RedisServer;

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt().try_init();

    let server = match RedisServer::new(std::env::args()) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "invalid command line");
            std::process::exit(2);
        }
    };

    if let Err(e) = server.run().await {
        error!(error = %e, "server terminated");
        std::process::exit(1);
    }
}
