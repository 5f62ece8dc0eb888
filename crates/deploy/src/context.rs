//! Run context threaded through every step of a deployment.

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, Bytes},
};
use anyhow::Result;

use crate::{
    DeployedContract, NetworkClient,
    client::{Receipt, TxHash, encode_call},
};

/// The network session of a run: the client and the resolved deploying account.
pub struct RunContext<'a, C> {
    pub client: &'a C,
    pub deployer: Address,
}

impl<C> Clone for RunContext<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for RunContext<'_, C> {}

impl<'a, C: NetworkClient> RunContext<'a, C> {
    pub fn new(client: &'a C, deployer: Address) -> Self {
        Self { client, deployer }
    }

    /// Submit `signature(args)` against a deployed contract without waiting.
    pub async fn submit(
        &self,
        contract: &DeployedContract,
        signature: &str,
        args: Vec<DynSolValue>,
    ) -> Result<TxHash> {
        let calldata: Bytes = encode_call(signature, args);
        self.client
            .transact(self.deployer, contract.address, calldata)
            .await
    }

    /// Call `signature(args)` on a deployed contract and wait for confirmation.
    pub async fn transact(
        &self,
        contract: &DeployedContract,
        signature: &str,
        args: Vec<DynSolValue>,
    ) -> Result<Receipt> {
        let tx = self.submit(contract, signature, args).await?;
        tracing::debug!(
            contract = %contract.name,
            function = %signature,
            tx = %tx,
            "Waiting for confirmation"
        );
        self.client.confirm(tx).await
    }
}
