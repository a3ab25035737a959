//! Interactive mode for the server.

use dialoguer::{Confirm, Input};

use crate::ServerConfig;

/// Prompts for bind address and port, then delegates to
/// [`super::run_server`].
///
/// The prompts are pre-filled from `BIND_ADDR` and `PORT`.
///
/// # Errors
///
/// Returns an error if the server fails to bind.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    let defaults = ServerConfig::from_env();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default(defaults.bind_addr.clone())
        .interact_text()
        .unwrap_or(defaults.bind_addr);

    let port: u16 = Input::new()
        .with_prompt("Port")
        .default(defaults.port)
        .interact_text()
        .unwrap_or(defaults.port);

    if !Confirm::new()
        .with_prompt(format!("Serve aviation RPC on {bind_addr}:{port}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server(ServerConfig { bind_addr, port }).await
}
