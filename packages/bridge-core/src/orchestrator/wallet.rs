use std::{
    collections::HashMap,
    fmt::Display,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use ethers::{
    contract::abigen,
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, U256, transaction::eip2718::TypedTransaction},
};
use tracing::{debug, info, warn};

use crate::{
    error::{BridgeError, BridgeResult},
    models::{
        model::{Chain, FeeData, Gas},
        traits::{BridgeCall, ClaimCall, WalletHandle},
    },
    registry::chain_registry::ChainRegistry,
};

abigen!(
    BridgeContract,
    r#"[
        function bridge(address token, uint256 amount, uint32 destinationNetwork, address destinationAddress) external payable
        function claim(address originalTokenAddress, uint256 amount, uint32 originalNetwork, uint32 destinationNetwork, address destinationAddress, bytes32[] smtProof, uint32 index, uint256 globalExitRootNum, bytes32 mainnetExitRoot, bytes32 rollupExitRoot) external
    ]"#
);

abigen!(
    ERC20Contract,
    r#"[
        function balanceOf(address account) external view returns (uint256)
        function allowance(address owner, address spender) external view returns (uint256)
        function approve(address spender, uint256 amount) external returns (bool)
    ]"#
);

type Client = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Maps provider and contract errors, recognising a declined signature.
fn wallet_error<E: Display>(e: E) -> BridgeError {
    let message = e.to_string();
    let lower = message.to_lowercase();
    if lower.contains("user rejected") || lower.contains("user denied") || lower.contains("4001") {
        BridgeError::UserRejected
    } else {
        BridgeError::Wallet(message)
    }
}

/// Local-key wallet holding one signer client per registered chain.
///
/// "Switching network" selects which chain the wallet considers itself
/// connected to; every call still goes to the client of the chain it names.
pub struct EthersWallet {
    address: Address,
    clients: HashMap<u64, Arc<Client>>,
    connected: AtomicU64,
}

impl EthersWallet {
    pub fn new(private_key: &str, chains: &ChainRegistry) -> BridgeResult<Self> {
        let wallet: LocalWallet = private_key
            .trim_start_matches("0x")
            .parse()
            .map_err(|e| BridgeError::Wallet(format!("invalid private key: {}", e)))?;
        let address = wallet.address();

        let mut clients = HashMap::new();
        for chain in chains.all() {
            let provider = Provider::<Http>::try_from(chain.rpc_url.as_str()).map_err(|e| {
                BridgeError::Wallet(format!("invalid RPC URL for {}: {}", chain.name, e))
            })?;
            let signer = wallet.clone().with_chain_id(chain.chain_id);
            clients.insert(
                chain.chain_id,
                Arc::new(SignerMiddleware::new(provider, signer)),
            );
        }

        info!(
            "🔑 Wallet {:?} ready on {} chains",
            address,
            clients.len()
        );
        Ok(Self {
            address,
            clients,
            connected: AtomicU64::new(chains.l1().chain_id),
        })
    }

    fn client(&self, chain: &Chain) -> BridgeResult<Arc<Client>> {
        self.clients.get(&chain.chain_id).cloned().ok_or_else(|| {
            BridgeError::RegistryMismatch(format!("no client for chain {}", chain.chain_id))
        })
    }

    fn bridge_contract(&self, chain: &Chain) -> BridgeResult<BridgeContract<Client>> {
        Ok(BridgeContract::new(chain.bridge_contract, self.client(chain)?))
    }
}

impl WalletHandle for EthersWallet {
    async fn account(&self) -> BridgeResult<Address> {
        Ok(self.address)
    }

    async fn chain_id(&self) -> BridgeResult<u64> {
        Ok(self.connected.load(Ordering::SeqCst))
    }

    async fn switch_network(&self, chain: &Chain) -> BridgeResult<()> {
        self.client(chain)?;
        self.connected.store(chain.chain_id, Ordering::SeqCst);
        info!("🔀 Switched to {} ({})", chain.name, chain.chain_id);
        Ok(())
    }

    async fn native_balance(&self, chain: &Chain, owner: Address) -> BridgeResult<U256> {
        self.client(chain)?
            .get_balance(owner, None)
            .await
            .map_err(wallet_error)
    }

    async fn erc20_balance(
        &self,
        chain: &Chain,
        token: Address,
        owner: Address,
    ) -> BridgeResult<U256> {
        ERC20Contract::new(token, self.client(chain)?)
            .balance_of(owner)
            .call()
            .await
            .map_err(wallet_error)
    }

    async fn erc20_allowance(
        &self,
        chain: &Chain,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> BridgeResult<U256> {
        ERC20Contract::new(token, self.client(chain)?)
            .allowance(owner, spender)
            .call()
            .await
            .map_err(wallet_error)
    }

    async fn fee_data(&self, chain: &Chain) -> BridgeResult<FeeData> {
        let client = self.client(chain)?;
        let gas_price = client.get_gas_price().await.map_err(wallet_error)?;

        match client.estimate_eip1559_fees(None).await {
            Ok((max_fee_per_gas, max_priority_fee_per_gas)) => Ok(FeeData {
                gas_price: Some(gas_price),
                max_fee_per_gas: Some(max_fee_per_gas),
                max_priority_fee_per_gas: Some(max_priority_fee_per_gas),
            }),
            Err(e) => {
                debug!("{} has no EIP-1559 fee data: {}", chain.name, e);
                Ok(FeeData {
                    gas_price: Some(gas_price),
                    ..Default::default()
                })
            }
        }
    }

    async fn estimate_bridge_gas(&self, call: &BridgeCall) -> BridgeResult<U256> {
        let gas = self
            .bridge_contract(&call.chain)?
            .bridge(
                call.token_address,
                call.amount,
                call.destination_network,
                call.destination_address,
            )
            .value(call.value)
            .from(self.address)
            .estimate_gas()
            .await
            .map_err(wallet_error)?;

        debug!("⛽ Bridge gas estimate on {}: {}", call.chain.name, gas);
        Ok(gas)
    }

    async fn send_approve(
        &self,
        chain: &Chain,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> BridgeResult<String> {
        let erc20 = ERC20Contract::new(token, self.client(chain)?);
        let call = erc20.approve(spender, amount);
        let pending = call.send().await.map_err(wallet_error)?;
        let tx_hash = format!("{:?}", pending.tx_hash());

        info!("⏳ Approval {} sent, waiting for confirmation...", tx_hash);
        match pending.await.map_err(wallet_error)? {
            Some(receipt) if receipt.status == Some(0.into()) => Err(BridgeError::Wallet(
                format!("approval {} reverted", tx_hash),
            )),
            Some(_) => Ok(tx_hash),
            None => {
                warn!("⚠️ Approval {} dropped from mempool", tx_hash);
                Err(BridgeError::Wallet(format!("approval {} dropped", tx_hash)))
            }
        }
    }

    async fn send_bridge(&self, call: &BridgeCall, gas: &Gas) -> BridgeResult<String> {
        let contract = self.bridge_contract(&call.chain)?;
        let mut tx = contract
            .bridge(
                call.token_address,
                call.amount,
                call.destination_network,
                call.destination_address,
            )
            .value(call.value)
            .gas(gas.gas_limit());

        tx = match *gas {
            Gas::Legacy { gas_price, .. } => tx.legacy().gas_price(gas_price),
            Gas::Eip1559 {
                max_fee_per_gas, ..
            } => {
                if let TypedTransaction::Eip1559(inner) = &mut tx.tx {
                    inner.max_fee_per_gas = Some(max_fee_per_gas);
                }
                tx
            }
        };

        let pending = tx.send().await.map_err(wallet_error)?;
        Ok(format!("{:?}", pending.tx_hash()))
    }

    async fn send_claim(&self, call: &ClaimCall) -> BridgeResult<String> {
        let contract = self.bridge_contract(&call.chain)?;
        let smt_proof: Vec<[u8; 32]> = call
            .smt_proof
            .iter()
            .map(|hash| hash.to_fixed_bytes())
            .collect();

        let tx = contract.claim(
            call.origin_token_address,
            call.amount,
            call.origin_network,
            call.destination_network,
            call.destination_address,
            smt_proof,
            call.index,
            call.global_exit_root_num,
            call.main_exit_root.to_fixed_bytes(),
            call.rollup_exit_root.to_fixed_bytes(),
        );

        let pending = tx.send().await.map_err(wallet_error)?;
        Ok(format!("{:?}", pending.tx_hash()))
    }
}
