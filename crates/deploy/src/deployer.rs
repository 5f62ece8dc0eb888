//! Contract creation.

use alloy_core::{dyn_abi::DynSolValue, primitives::Address};
use anyhow::Context;
use derive_more::Deref;

use crate::{
    DeploymentTarget, NetworkClient, RunContext, RunError,
    client::TxHash,
};

/// A contract created during this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    /// Logical name of the target.
    pub name: String,
    /// On-chain address.
    pub address: Address,
    /// Hash of the creation transaction.
    pub tx_hash: TxHash,
}

/// Contracts created so far, in creation order.
#[derive(Debug, Clone, Default, Deref)]
pub struct DeployedContracts(Vec<DeployedContract>);

impl DeployedContracts {
    pub fn get(&self, name: &str) -> Option<&DeployedContract> {
        self.0.iter().find(|c| c.name == name)
    }

    pub fn address_of(&self, name: &str) -> Option<Address> {
        self.get(name).map(|c| c.address)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub(crate) fn push(&mut self, contract: DeployedContract) {
        self.0.push(contract);
    }
}

/// Create `target` and wait until the network confirms it.
///
/// Every creation dependency must already be in `deployed`.
pub async fn deploy_target<C: NetworkClient>(
    ctx: RunContext<'_, C>,
    target: &DeploymentTarget,
    deployed: &DeployedContracts,
) -> Result<DeployedContract, RunError> {
    let failure = |source: anyhow::Error| RunError::DeploymentFailure {
        target: target.name.clone(),
        source,
    };

    if let Some(missing) = target
        .dependencies()
        .into_iter()
        .find(|dep| !deployed.contains(dep))
    {
        return Err(failure(anyhow::anyhow!(
            "dependency {} is not deployed",
            missing
        )));
    }

    let args = target
        .args
        .iter()
        .map(|arg| arg.resolve(ctx.deployer, |name| deployed.address_of(name)))
        .collect::<anyhow::Result<Vec<DynSolValue>>>()
        .map_err(failure)?;

    tracing::info!(
        name = %target.name,
        contract = %target.contract,
        args = args.len(),
        "Deploying contract..."
    );

    let tx_hash = ctx
        .client
        .deploy(ctx.deployer, &target.contract, args)
        .await
        .map_err(failure)?;

    let receipt = ctx.client.confirm(tx_hash).await.map_err(failure)?;

    let address = receipt
        .contract_address
        .with_context(|| format!("Receipt of {} has no contract address", tx_hash))
        .map_err(failure)?;

    tracing::info!(name = %target.name, address = %address, tx = %tx_hash, "Contract deployed");

    Ok(DeployedContract {
        name: target.name.clone(),
        address,
        tx_hash,
    })
}
