mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use risk_gate::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
