//! Ronin JSON-RPC client.
//!
//! Reads go through one shared HTTP provider. Every broadcast builds a legacy
//! transaction with an explicit nonce, gas limit, gas price and chain id, and
//! is signed by the sending account's own key before it leaves the process.

use alloy::network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolCall;
use reqwest::Url;
use async_trait::async_trait;
use slp_payout_core::{ClaimAuthorization, Transaction};

use super::gateway::{ChainGateway, GatewayError, ReceiptStatus};
use crate::config::NetworkConfig;

sol! {
    #[sol(rpc)]
    interface ISmoothLovePotion {
        function balanceOf(address owner) external view returns (uint256);
        function transfer(address to, uint256 value) external returns (bool);
        function checkpoint(address owner, uint256 amount, uint256 createdAt, bytes signature) external returns (uint256);
    }
}

fn rpc_error(method: &'static str, err: impl std::fmt::Display) -> GatewayError {
    GatewayError::Rpc {
        method,
        reason: err.to_string(),
    }
}

pub struct RoninRpcClient {
    rpc_url: Url,
    reader: DynProvider,
    slp_contract: Address,
    chain_id: u64,
    gas_limit: u64,
    gas_price: u128,
}

impl RoninRpcClient {
    pub fn new(network: &NetworkConfig, slp_contract: Address) -> Result<Self, GatewayError> {
        let rpc_url: Url = network
            .rpc_url
            .parse()
            .map_err(|e| GatewayError::Setup(format!("RPC url '{}': {}", network.rpc_url, e)))?;
        let reader = ProviderBuilder::new().connect_http(rpc_url.clone()).erased();

        tracing::info!(
            "RoninRpcClient initialized: {} (chain id {}, SLP {})",
            rpc_url,
            network.chain_id,
            slp_contract
        );

        Ok(Self {
            rpc_url,
            reader,
            slp_contract,
            chain_id: network.chain_id,
            gas_limit: network.gas_limit,
            gas_price: u128::from(network.gas_price_wei),
        })
    }

    async fn broadcast(
        &self,
        method: &'static str,
        call_data: Vec<u8>,
        signer: &PrivateKeySigner,
        nonce: u64,
    ) -> Result<TxHash, GatewayError> {
        let wallet = EthereumWallet::from(signer.clone());
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(self.rpc_url.clone());

        let request = TransactionRequest::default()
            .with_from(signer.address())
            .with_to(self.slp_contract)
            .with_input(Bytes::from(call_data))
            .with_nonce(nonce)
            .with_chain_id(self.chain_id)
            .with_gas_limit(self.gas_limit)
            .with_gas_price(self.gas_price);

        let pending = provider
            .send_transaction(request)
            .await
            .map_err(|e| GatewayError::Broadcast(format!("{} with nonce {}: {}", method, nonce, e)))?;
        let tx_hash = *pending.tx_hash();

        tracing::debug!(
            "Broadcast {} from {} nonce={} hash={}",
            method,
            signer.address(),
            nonce,
            tx_hash
        );
        Ok(tx_hash)
    }
}

#[async_trait]
impl ChainGateway for RoninRpcClient {
    async fn get_balance(&self, address: Address) -> Result<u64, GatewayError> {
        let slp = ISmoothLovePotion::new(self.slp_contract, self.reader.clone());
        let balance: U256 = slp
            .balanceOf(address)
            .call()
            .await
            .map_err(|e| rpc_error("balanceOf", e))?;

        u64::try_from(balance).map_err(|_| GatewayError::Overflow {
            address,
            value: balance.to_string(),
        })
    }

    async fn get_nonce(&self, address: Address) -> Result<u64, GatewayError> {
        self.reader
            .get_transaction_count(address)
            .await
            .map_err(|e| rpc_error("eth_getTransactionCount", e))
    }

    async fn submit_transfer(
        &self,
        tx: &Transaction,
        signer: &PrivateKeySigner,
        nonce: u64,
    ) -> Result<TxHash, GatewayError> {
        let call = ISmoothLovePotion::transferCall {
            to: tx.to_address,
            value: U256::from(tx.amount),
        };
        self.broadcast("transfer", call.abi_encode(), signer, nonce).await
    }

    async fn submit_claim(
        &self,
        owner: Address,
        authorization: &ClaimAuthorization,
        signer: &PrivateKeySigner,
        nonce: u64,
    ) -> Result<TxHash, GatewayError> {
        let call = ISmoothLovePotion::checkpointCall {
            owner,
            amount: U256::from(authorization.amount),
            createdAt: U256::from(authorization.timestamp),
            signature: authorization.signature.clone(),
        };
        self.broadcast("checkpoint", call.abi_encode(), signer, nonce).await
    }

    async fn get_receipt(&self, tx_hash: TxHash) -> Result<Option<ReceiptStatus>, GatewayError> {
        let receipt = self
            .reader
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| rpc_error("eth_getTransactionReceipt", e))?;

        Ok(receipt.map(|r| {
            if r.status() {
                ReceiptStatus::Success
            } else {
                ReceiptStatus::Reverted
            }
        }))
    }
}
