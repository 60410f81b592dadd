use std::sync::Arc;

use alloy::{
    node_bindings::Anvil,
    primitives::{address, ChainId},
};
use bridge_connector::{
    machine::MachineOptions,
    rpc::{HttpConnector, RpcClient},
    BridgeFactory, ConnectionState, ConnectionStateMachine, Network, NetworkRegistry,
    NetworkResolver, ProviderGateway, RpcWallet, TokenBridgeAddresses,
};
use eyre::OptionExt;
use serde_json::json;

const TOKEN_BRIDGE: TokenBridgeAddresses = TokenBridgeAddresses {
    l1_address: address!("0000000000000000000000000000000000000b01"),
    l2_address: address!("0000000000000000000000000000000000000b02"),
};

fn local_network(
    chain_id: ChainId,
    partner_chain_id: ChainId,
    is_rollup_chain: bool,
    rpc_url: String,
) -> Network {
    Network {
        chain_id,
        name: format!("local-{chain_id}"),
        is_rollup_chain,
        partner_chain_id,
        rpc_url,
        explorer_url: None,
        token_bridge: TOKEN_BRIDGE,
    }
}

#[tokio::test]
#[ignore = "requires the anvil binary"]
async fn connects_both_ways_against_anvil() -> eyre::Result<()> {
    let l1 = Anvil::new().chain_id(31337).try_spawn()?;
    let l2 = Anvil::new().chain_id(31338).try_spawn()?;

    for (node, router) in [(&l1, TOKEN_BRIDGE.l1_address), (&l2, TOKEN_BRIDGE.l2_address)] {
        let rpc = HttpConnector::connect_http(&node.endpoint())?;
        rpc.request("anvil_setCode", json!([router, "0x6080604052"])).await?;
    }

    let registry = NetworkRegistry::new([
        local_network(31337, 31338, false, l1.endpoint()),
        local_network(31338, 31337, true, l2.endpoint()),
    ])?;

    for (node, expected) in [
        (&l1, ConnectionState::DepositReady),
        (&l2, ConnectionState::WithdrawalReady),
    ] {
        let wallet = RpcWallet::new(HttpConnector::connect_http(&node.endpoint())?);
        wallet.sync().await?;

        let machine = ConnectionStateMachine::new(
            ProviderGateway::injected(wallet),
            NetworkResolver::new(registry.clone()),
            BridgeFactory::new(Arc::new(HttpConnector)),
            MachineOptions::default(),
        );
        assert_eq!(machine.detect().await, expected);

        let bridge = machine.snapshot().bridge.ok_or_eyre("bridge not built")?;
        assert_eq!(bridge.l1_signer().chain_id(), 31337);
        assert_eq!(bridge.l2_signer().chain_id(), 31338);
        assert_eq!(bridge.l1_signer().address(), l1.addresses()[0]);
    }

    Ok(())
}
