use starknet_rpc::controllers::starknetrpc_controller::{self, State};
use starknet_rpc::util::{config::OperatorConfig, telemetry};

mod handlers;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init().await;

    let config = OperatorConfig::from_env();

    // Initialize Kubernetes controller state
    let state = State::new(config.clone());
    let controller = starknetrpc_controller::run(state.clone());
    let server = server::start_server(state, &config.bind_address);

    // Both runtimes implements graceful shutdown, so poll until both are done
    tokio::join!(controller, server).1?;
    Ok(())
}
