pub mod config;
pub mod encoding;
pub mod entities;
pub mod events;
#[cfg(test)]
mod test_main;

use config::Config;
use entities::ResponsePayload;
use events::process_lambda_event;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;

pub async fn handler(event: LambdaEvent<Value>) -> Result<ResponsePayload, Error> {
    let config = Config::from_env()?;
    let response = process_lambda_event(event, &config).await?;
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        // disable printing the name of the module in every log line.
        .with_target(false)
        // disabling time is handy because the host adds the ingestion time.
        .without_time()
        .init();
    run(service_fn(handler)).await
}
