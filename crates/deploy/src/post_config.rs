//! Best-effort administrator reassignment.
//!
//! Older contract versions do not expose the reassignment entry point. The step
//! probes the deployed code for the function selector first and reports a typed
//! outcome instead of an error; the run always continues.

use std::fmt;

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, Bytes},
};

use crate::{DeployedContracts, NetworkClient, PostConfigStep, RunContext, client::selector};

/// `PUSH4` opcode, used by the Solidity dispatcher to compare selectors.
const PUSH4: u8 = 0x63;

/// Why the capability could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedReason {
    /// The target is not part of this run's deployed contracts.
    NotDeployed,
    /// The deployed code does not contain the function selector.
    MissingEntryPoint,
    /// The capability probe or the call itself failed.
    CallFailed(String),
}

impl fmt::Display for UnsupportedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotDeployed => write!(f, "target is not deployed"),
            Self::MissingEntryPoint => write!(f, "entry point not found in deployed code"),
            Self::CallFailed(e) => write!(f, "call failed: {}", e),
        }
    }
}

/// Result of the post-configuration step. Every variant lets the run continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostConfigOutcome {
    /// No new administrator was requested.
    Skipped { admin: Address },
    /// The administrator was reassigned.
    Transferred { admin: Address },
    /// The capability is not available; `admin` is the deployer.
    Unsupported {
        admin: Address,
        reason: UnsupportedReason,
    },
}

impl PostConfigOutcome {
    /// The administrator in effect after the step.
    pub fn admin(&self) -> Address {
        match self {
            Self::Skipped { admin }
            | Self::Transferred { admin }
            | Self::Unsupported { admin, .. } => *admin,
        }
    }
}

/// Whether `code` dispatches on `selector`.
///
/// Walks the bytecode opcode by opcode so push operands are never mistaken for
/// instructions.
pub fn code_supports(code: &[u8], selector: [u8; 4]) -> bool {
    let mut pc = 0;
    while pc < code.len() {
        let op = code[pc];
        if op == PUSH4 && code.get(pc + 1..pc + 5) == Some(&selector[..]) {
            return true;
        }
        // PUSH1..PUSH32 carry 1..32 bytes of immediate data.
        pc += match op {
            0x60..=0x7f => (op - 0x5f) as usize + 1,
            _ => 1,
        };
    }
    false
}

async fn probe<C: NetworkClient>(
    ctx: RunContext<'_, C>,
    address: Address,
    function: &str,
) -> anyhow::Result<bool> {
    let code: Bytes = ctx.client.code_at(address).await?;
    Ok(code_supports(&code, selector(function)))
}

/// Try to hand administration of `step.target` over to `step.new_admin`.
///
/// Never fails: anything that goes wrong downgrades to
/// [`PostConfigOutcome::Unsupported`] with the deployer kept as administrator.
pub async fn apply<C: NetworkClient>(
    ctx: RunContext<'_, C>,
    step: &PostConfigStep,
    deployed: &DeployedContracts,
) -> PostConfigOutcome {
    let Some(new_admin) = step.new_admin else {
        tracing::info!(
            target_contract = %step.target,
            "No administrator requested, keeping the deployer"
        );
        return PostConfigOutcome::Skipped {
            admin: ctx.deployer,
        };
    };

    let outcome = match deployed.get(&step.target) {
        None => Err(UnsupportedReason::NotDeployed),
        Some(contract) => match probe(ctx, contract.address, &step.function).await {
            Err(e) => Err(UnsupportedReason::CallFailed(format!("{:#}", e))),
            Ok(false) => Err(UnsupportedReason::MissingEntryPoint),
            Ok(true) => ctx
                .transact(contract, &step.function, vec![DynSolValue::Address(new_admin)])
                .await
                .map_err(|e| UnsupportedReason::CallFailed(format!("{:#}", e))),
        },
    };

    match outcome {
        Ok(receipt) => {
            tracing::info!(
                target_contract = %step.target,
                function = %step.function,
                admin = %new_admin,
                tx = %receipt.transaction_hash,
                "Administrator reassigned"
            );
            PostConfigOutcome::Transferred { admin: new_admin }
        }
        Err(reason) => {
            tracing::warn!(
                target_contract = %step.target,
                function = %step.function,
                requested_admin = %new_admin,
                admin = %ctx.deployer,
                reason = %reason,
                "Administrator reassignment not supported, keeping the deployer"
            );
            PostConfigOutcome::Unsupported {
                admin: ctx.deployer,
                reason,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_supports_dispatcher_selector() {
        let sel = selector("transferAdmin(address)");
        // PUSH1 0xe0, SHR, DUP1, PUSH4 <sel>, EQ
        let mut code = vec![0x60, 0xe0, 0x1c, 0x80, PUSH4];
        code.extend_from_slice(&sel);
        code.push(0x14);

        assert!(code_supports(&code, sel));
    }

    #[test]
    fn test_code_supports_ignores_push_data() {
        let sel = [0xde, 0xad, 0xbe, 0xef];
        // PUSH5 whose data happens to contain PUSH4 <sel>.
        let code = vec![0x64, PUSH4, 0xde, 0xad, 0xbe, 0xef, 0x00];

        assert!(!code_supports(&code, sel));
    }

    #[test]
    fn test_code_supports_empty_and_truncated() {
        let sel = [0x01, 0x02, 0x03, 0x04];
        assert!(!code_supports(&[], sel));
        assert!(!code_supports(&[PUSH4, 0x01, 0x02], sel));
    }

    #[test]
    fn test_outcome_admin() {
        let deployer = Address::repeat_byte(1);
        let target = Address::repeat_byte(2);

        assert_eq!(PostConfigOutcome::Skipped { admin: deployer }.admin(), deployer);
        assert_eq!(PostConfigOutcome::Transferred { admin: target }.admin(), target);
        assert_eq!(
            PostConfigOutcome::Unsupported {
                admin: deployer,
                reason: UnsupportedReason::MissingEntryPoint
            }
            .admin(),
            deployer
        );
    }
}
