//! Cross-linking of contracts that reference each other.
//!
//! Mutually dependent contracts cannot learn each other's address at construction
//! time. They are created first, then told about their peers with one configuration
//! transaction per [`LinkEdge`](crate::LinkEdge).

use alloy_core::dyn_abi::DynSolValue;

use crate::{DeployedContracts, LinkGroup, NetworkClient, RunContext, RunError};

/// Execute every edge of `group` in order.
///
/// Each transaction is confirmed before the next one is submitted.
pub async fn link_group<C: NetworkClient>(
    ctx: RunContext<'_, C>,
    group: &LinkGroup,
    deployed: &DeployedContracts,
) -> Result<(), RunError> {
    for edge in &group.edges {
        let failure = |source: anyhow::Error| RunError::LinkFailure {
            contract: edge.contract.clone(),
            function: edge.function.clone(),
            linked: edge.linked.clone(),
            source,
        };

        let (Some(contract), Some(linked)) =
            (deployed.get(&edge.contract), deployed.get(&edge.linked))
        else {
            return Err(failure(anyhow::anyhow!(
                "both {} and {} must be deployed before linking",
                edge.contract,
                edge.linked
            )));
        };

        tracing::info!(
            contract = %contract.name,
            function = %edge.function,
            linked = %linked.name,
            address = %linked.address,
            "Linking contracts..."
        );

        let receipt = ctx
            .transact(contract, &edge.function, vec![DynSolValue::Address(linked.address)])
            .await
            .map_err(failure)?;

        tracing::info!(
            contract = %contract.name,
            function = %edge.function,
            tx = %receipt.transaction_hash,
            "Link confirmed"
        );
    }

    Ok(())
}
