//! Deployment plan: what gets created, in which order, and how it is wired.
//!
//! A plan is a list of [`DeploymentTarget`]s, a list of [`LinkGroup`]s and an
//! optional [`PostConfigStep`]. Creation dependencies must form a DAG; link
//! edges may be circular since they run after both endpoints exist.

use std::collections::{BTreeSet, HashMap};

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, U256},
};
use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{RunError, record::DEPLOYER_FIELD};

/// Default name and symbol of the demo party.
pub const DEFAULT_PARTY_NAME: &str = "Demo Party";
pub const DEFAULT_PARTY_SYMBOL: &str = "DP";

/// Default administrator reassignment entry point.
pub const DEFAULT_ADMIN_FUNCTION: &str = "transferAdmin(address)";

/// A single constructor argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConstructorArg {
    String(String),
    Address(Address),
    Uint(U256),
    Bool(bool),
    /// The deploying account.
    Deployer,
    /// The address of another target. Implies a creation dependency.
    Contract(String),
}

impl ConstructorArg {
    /// Resolve the argument into an ABI value.
    pub fn resolve(
        &self,
        deployer: Address,
        lookup: impl Fn(&str) -> Option<Address>,
    ) -> anyhow::Result<DynSolValue> {
        Ok(match self {
            Self::String(s) => DynSolValue::String(s.clone()),
            Self::Address(a) => DynSolValue::Address(*a),
            Self::Uint(v) => DynSolValue::Uint(*v, 256),
            Self::Bool(b) => DynSolValue::Bool(*b),
            Self::Deployer => DynSolValue::Address(deployer),
            Self::Contract(name) => DynSolValue::Address(
                lookup(name).with_context(|| format!("{} is not deployed yet", name))?,
            ),
        })
    }
}

/// A contract to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTarget {
    /// Logical name, used as the key in the deployment record.
    pub name: String,
    /// Compiled contract (artifact) name.
    pub contract: String,
    /// Ordered constructor arguments.
    #[serde(default)]
    pub args: Vec<ConstructorArg>,
    /// Targets that must be deployed before this one.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl DeploymentTarget {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            contract: name.clone(),
            name,
            args: Vec::new(),
            depends_on: Vec::new(),
        }
    }

    /// Use a different artifact than the logical name.
    pub fn contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = contract.into();
        self
    }

    pub fn arg(mut self, arg: ConstructorArg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// All creation dependencies: explicit ones plus contract arguments.
    pub fn dependencies(&self) -> BTreeSet<&str> {
        self.depends_on
            .iter()
            .map(String::as_str)
            .chain(self.args.iter().filter_map(|arg| match arg {
                ConstructorArg::Contract(name) => Some(name.as_str()),
                _ => None,
            }))
            .collect()
    }
}

/// "`contract` must be told `linked`'s address", done by calling `function(address)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEdge {
    pub contract: String,
    pub function: String,
    pub linked: String,
}

impl LinkEdge {
    pub fn new(
        contract: impl Into<String>,
        function: impl Into<String>,
        linked: impl Into<String>,
    ) -> Self {
        Self {
            contract: contract.into(),
            function: function.into(),
            linked: linked.into(),
        }
    }
}

/// Edges executed together, in order, once all their endpoints are deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkGroup {
    pub edges: Vec<LinkEdge>,
}

impl LinkGroup {
    /// Every target taking part in the group.
    pub fn participants(&self) -> BTreeSet<&str> {
        self.edges
            .iter()
            .flat_map(|e| [e.contract.as_str(), e.linked.as_str()])
            .collect()
    }
}

/// Optional administrator reassignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostConfigStep {
    /// Target on which the entry point is called.
    pub target: String,
    /// Solidity signature of the entry point, e.g. `transferAdmin(address)`.
    pub function: String,
    /// The address that should become administrator. Nothing is sent if unset.
    pub new_admin: Option<Address>,
}

impl PostConfigStep {
    /// Name of the administrator field in the extended record, e.g. `ElectionAdmin`.
    pub fn record_field(&self) -> String {
        format!("{}Admin", self.target)
    }
}

/// Everything a run deploys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    pub targets: Vec<DeploymentTarget>,
    #[serde(default)]
    pub links: Vec<LinkGroup>,
    #[serde(default)]
    pub post_config: Option<PostConfigStep>,
}

impl DeploymentPlan {
    /// The election suite: Auth and Admin linked to each other, then Party and Election.
    pub fn election(
        party_name: impl Into<String>,
        party_symbol: impl Into<String>,
        election_admin: Option<Address>,
    ) -> Self {
        Self {
            targets: vec![
                DeploymentTarget::new("Auth"),
                DeploymentTarget::new("Admin"),
                DeploymentTarget::new("Party")
                    .arg(ConstructorArg::String(party_name.into()))
                    .arg(ConstructorArg::String(party_symbol.into()))
                    .arg(ConstructorArg::Deployer),
                DeploymentTarget::new("Election").contract("ElectionContract"),
            ],
            links: vec![LinkGroup {
                edges: vec![
                    LinkEdge::new("Auth", "setAdminContract(address)", "Admin"),
                    LinkEdge::new("Admin", "setAuthContract(address)", "Auth"),
                ],
            }],
            post_config: Some(PostConfigStep {
                target: "Election".to_string(),
                function: DEFAULT_ADMIN_FUNCTION.to_string(),
                new_admin: election_admin,
            }),
        }
    }

    /// Check names and references, and return the creation order.
    ///
    /// The order is a topological sort of the creation dependencies that keeps
    /// the declaration order whenever it is free to.
    pub fn creation_order(&self) -> Result<Vec<&DeploymentTarget>, RunError> {
        let mut by_name: HashMap<&str, usize> = HashMap::new();
        for (i, target) in self.targets.iter().enumerate() {
            if by_name.insert(target.name.as_str(), i).is_some() {
                return Err(RunError::InvalidPlan(format!(
                    "duplicate target name {}",
                    target.name
                )));
            }
        }

        // Target names share the record's key space with the extended fields.
        let reserved = std::iter::once(DEPLOYER_FIELD.to_string())
            .chain(self.post_config.as_ref().map(PostConfigStep::record_field));
        for field in reserved {
            if by_name.contains_key(field.as_str()) {
                return Err(RunError::InvalidPlan(format!(
                    "target name {} is reserved for the deployment record",
                    field
                )));
            }
        }

        let known = |name: &str, what: &str| -> Result<(), RunError> {
            if by_name.contains_key(name) {
                Ok(())
            } else {
                Err(RunError::InvalidPlan(format!(
                    "{} references unknown target {}",
                    what, name
                )))
            }
        };

        for target in &self.targets {
            for dep in target.dependencies() {
                known(dep, &target.name)?;
                if dep == target.name {
                    return Err(RunError::InvalidPlan(format!(
                        "{} depends on itself",
                        target.name
                    )));
                }
            }
        }
        for group in &self.links {
            if group.edges.is_empty() {
                return Err(RunError::InvalidPlan("empty link group".to_string()));
            }
            for edge in &group.edges {
                known(&edge.contract, "link edge")?;
                known(&edge.linked, "link edge")?;
            }
        }
        if let Some(step) = &self.post_config {
            known(&step.target, "post-configuration step")?;
        }

        let mut placed = vec![false; self.targets.len()];
        let mut order = Vec::with_capacity(self.targets.len());

        while order.len() < self.targets.len() {
            let next = self.targets.iter().enumerate().find(|(i, target)| {
                !placed[*i]
                    && target
                        .dependencies()
                        .iter()
                        .all(|dep| placed[by_name[dep]])
            });

            match next {
                Some((i, target)) => {
                    placed[i] = true;
                    order.push(target);
                }
                None => {
                    let stuck: Vec<&str> = self
                        .targets
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| !placed[*i])
                        .map(|(_, t)| t.name.as_str())
                        .collect();
                    return Err(RunError::InvalidPlan(format!(
                        "creation dependency cycle between {}",
                        stuck.join(", ")
                    )));
                }
            }
        }

        Ok(order)
    }
}

impl Default for DeploymentPlan {
    fn default() -> Self {
        Self::election(DEFAULT_PARTY_NAME, DEFAULT_PARTY_SYMBOL, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names<'a>(order: &[&'a DeploymentTarget]) -> Vec<&'a str> {
        order.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_election_plan_order() {
        let plan = DeploymentPlan::default();
        let order = plan.creation_order().unwrap();

        assert_eq!(names(&order), vec!["Auth", "Admin", "Party", "Election"]);
        assert_eq!(order[3].contract, "ElectionContract");
    }

    #[test]
    fn test_dependencies_reorder_targets() {
        let plan = DeploymentPlan {
            targets: vec![
                DeploymentTarget::new("Registry").arg(ConstructorArg::Contract("Token".into())),
                DeploymentTarget::new("Vault").depends_on("Registry"),
                DeploymentTarget::new("Token"),
            ],
            links: vec![],
            post_config: None,
        };

        let order = plan.creation_order().unwrap();

        assert_eq!(names(&order), vec!["Token", "Registry", "Vault"]);
    }

    #[test]
    fn test_creation_cycle_is_rejected() {
        let plan = DeploymentPlan {
            targets: vec![
                DeploymentTarget::new("A").depends_on("B"),
                DeploymentTarget::new("B").arg(ConstructorArg::Contract("A".into())),
            ],
            links: vec![],
            post_config: None,
        };

        let err = plan.creation_order().unwrap_err();

        assert!(matches!(err, RunError::InvalidPlan(ref msg) if msg.contains("cycle")));
    }

    #[test]
    fn test_circular_links_are_allowed() {
        // Auth <-> Admin is circular at the link level only.
        assert!(DeploymentPlan::default().creation_order().is_ok());
    }

    #[test]
    fn test_unknown_references_are_rejected() {
        let mut plan = DeploymentPlan::default();
        plan.links[0].edges.push(LinkEdge::new("Auth", "setVoting(address)", "Voting"));
        assert!(plan.creation_order().is_err());

        let mut plan = DeploymentPlan::default();
        plan.targets.push(DeploymentTarget::new("Auth"));
        assert!(plan.creation_order().is_err());

        let mut plan = DeploymentPlan::default();
        plan.post_config.as_mut().unwrap().target = "Nope".into();
        assert!(plan.creation_order().is_err());
    }

    #[test]
    fn test_record_field_names_are_reserved() {
        let mut plan = DeploymentPlan::default();
        plan.targets.push(DeploymentTarget::new("Deployer"));
        let err = plan.creation_order().unwrap_err();
        assert!(matches!(err, RunError::InvalidPlan(ref msg) if msg.contains("Deployer")));

        let mut plan = DeploymentPlan::default();
        plan.targets.push(DeploymentTarget::new("ElectionAdmin"));
        let err = plan.creation_order().unwrap_err();
        assert!(matches!(err, RunError::InvalidPlan(ref msg) if msg.contains("ElectionAdmin")));

        // Without a post-configuration step there is no admin field to collide with.
        let mut plan = DeploymentPlan::default();
        plan.post_config = None;
        plan.targets.push(DeploymentTarget::new("ElectionAdmin"));
        assert!(plan.creation_order().is_ok());
    }

    #[test]
    fn test_resolve_args() {
        let deployer = Address::repeat_byte(0x11);
        let token = Address::repeat_byte(0x22);
        let lookup = |name: &str| (name == "Token").then_some(token);

        assert_eq!(
            ConstructorArg::Deployer.resolve(deployer, lookup).unwrap(),
            DynSolValue::Address(deployer)
        );
        assert_eq!(
            ConstructorArg::Contract("Token".into())
                .resolve(deployer, lookup)
                .unwrap(),
            DynSolValue::Address(token)
        );
        assert!(
            ConstructorArg::Contract("Missing".into())
                .resolve(deployer, lookup)
                .is_err()
        );
    }

    #[test]
    fn test_args_from_toml() {
        let target: DeploymentTarget = toml::from_str(
            r#"
            name = "Party"
            contract = "Party"
            args = [
                { type = "string", value = "Demo Party" },
                { type = "string", value = "DP" },
                { type = "deployer" },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(
            target.args,
            vec![
                ConstructorArg::String("Demo Party".into()),
                ConstructorArg::String("DP".into()),
                ConstructorArg::Deployer,
            ]
        );
        assert!(target.depends_on.is_empty());
    }

    #[test]
    fn test_record_field_name() {
        let plan = DeploymentPlan::default();
        assert_eq!(plan.post_config.unwrap().record_field(), "ElectionAdmin");
    }
}
