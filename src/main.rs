use std::{path::PathBuf, sync::Arc};

use bridge_connector::{
    rpc::HttpConnector, BridgeFactory, ConnectionState, ConnectionStateMachine, ConnectorConfig,
    NetworkRegistry, NetworkResolver, ProviderGateway, RpcWallet, Snapshot,
};
use clap::{Parser, Subcommand};
use eyre::OptionExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Parent/child chain bridge connector
#[derive(Parser, Debug)]
#[command(name = "bridge-connector")]
#[command(
    about = "Detects the wallet's network and initializes the token bridge",
    long_about = None
)]
struct Args {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint acting as the wallet
    #[arg(long, global = true)]
    wallet_rpc: Option<String>,

    /// UI route (`#info` shows the informational view)
    #[arg(long, global = true)]
    route: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to the wallet and keep the bridge in sync with it
    Connect {
        /// Exit once detection settles
        #[arg(long)]
        once: bool,
    },
    /// Ask the wallet to switch to a known network
    Switch {
        #[arg(long)]
        chain_id: u64,
    },
    /// List known networks
    Networks,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => ConnectorConfig::load(path)?,
        None => ConnectorConfig::default(),
    };
    if let Some(url) = args.wallet_rpc {
        config.wallet_rpc_url = Some(url);
    }
    if let Some(route) = args.route {
        config.route = Some(route);
    }
    let registry = config.registry()?;

    match args.command.unwrap_or(Command::Connect { once: false }) {
        Command::Connect { once } => connect(&config, registry, once).await,
        Command::Switch { chain_id } => switch(&config, &registry, chain_id).await,
        Command::Networks => {
            list_networks(registry);
            Ok(())
        }
    }
}

async fn open_wallet(config: &ConnectorConfig) -> eyre::Result<ProviderGateway> {
    let Some(url) = &config.wallet_rpc_url else {
        return Ok(ProviderGateway::absent());
    };

    let wallet = RpcWallet::new(HttpConnector::connect_http(url)?);
    if let Err(err) = wallet.sync().await {
        tracing::warn!(%err, "wallet did not initialize");
    }
    wallet.watch(config.poll_interval());
    tracing::info!("using wallet at {}", url);

    Ok(ProviderGateway::injected(wallet))
}

async fn connect(
    config: &ConnectorConfig,
    registry: NetworkRegistry,
    once: bool,
) -> eyre::Result<()> {
    let gateway = open_wallet(config).await?;
    let machine = ConnectionStateMachine::new(
        gateway,
        NetworkResolver::new(registry),
        BridgeFactory::new(Arc::new(HttpConnector)),
        config.machine_options(),
    );

    let mut updates = machine.subscribe();
    let driver = tokio::spawn(machine.clone().run());

    loop {
        tokio::select! {
            changed = updates.changed() => {
                changed?;
                let snapshot = updates.borrow_and_update().clone();
                render(&snapshot);
                if once && snapshot.state != ConnectionState::Detecting {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    driver.abort();
    Ok(())
}

fn render(snapshot: &Snapshot) {
    let chain = snapshot.active_chain_id.as_deref().unwrap_or("-");
    match (&snapshot.bridge, &snapshot.failure) {
        (Some(bridge), _) => println!(
            "[{}] {} on chain {}: {} ({}) -> {} ({}), l1 signer {}, l2 signer {}",
            snapshot.generation,
            snapshot.state,
            chain,
            bridge.network().name,
            bridge.network().chain_id,
            bridge.partner().name,
            bridge.partner().chain_id,
            bridge.l1_signer().address(),
            bridge.l2_signer().address(),
        ),
        (None, Some(failure)) => {
            println!("[{}] {} on chain {}: {}", snapshot.generation, snapshot.state, chain, failure)
        }
        (None, None) => println!("[{}] {} on chain {}", snapshot.generation, snapshot.state, chain),
    }
}

async fn switch(
    config: &ConnectorConfig,
    registry: &NetworkRegistry,
    chain_id: u64,
) -> eyre::Result<()> {
    let network = registry
        .get(chain_id)
        .ok_or_eyre("network is not in the registry")?;
    let gateway = open_wallet(config).await?;

    match gateway.request_network_switch(network).await {
        Some(result) => println!("wallet accepted switch to {}: {}", network.name, result),
        None => println!("wallet did not switch to {}", network.name),
    }
    Ok(())
}

fn list_networks(registry: NetworkRegistry) {
    let resolver = NetworkResolver::new(registry);
    for network in resolver.registry().iter() {
        let mode = resolver
            .classify_id(network.chain_id)
            .orientation()
            .map(|orientation| orientation.to_string())
            .unwrap_or_else(|| "unsupported".to_string());
        println!(
            "{:>8}  {:<18} partner {:>8}  {:<10}  {}",
            network.chain_id, network.name, network.partner_chain_id, mode, network.rpc_url
        );
    }
}
