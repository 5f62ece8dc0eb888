//! Run controller: sequences deployments, links, post-configuration and the record.

use alloy_core::primitives::Address;

use crate::{
    DeployedContracts, DeploymentPlan, DeploymentRecord, NetworkClient, PostConfigOutcome,
    RecordConfig, RecordSchema, RunContext, RunError, RunState, deployer::deploy_target,
    link::link_group, post_config, record::DEPLOYER_FIELD,
};

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub deployer: Address,
    pub contracts: DeployedContracts,
    pub post_config: Option<PostConfigOutcome>,
    pub record: DeploymentRecord,
    pub history: Vec<RunState>,
}

impl RunReport {
    /// Log where everything ended up.
    pub fn log_summary(&self, record_config: &RecordConfig) {
        tracing::info!("✓ Deployment complete!");
        tracing::info!("");
        tracing::info!("=== Deployed contracts ===");
        for contract in self.contracts.iter() {
            tracing::info!("{:<12} {}", contract.name, contract.address);
        }
        tracing::info!("{:<12} {}", "Deployer", self.deployer);
        if let Some(outcome) = &self.post_config {
            tracing::info!("{:<12} {}", "Admin", outcome.admin());
        }
        tracing::info!("");
        tracing::info!("Record: {}", record_config.path.display());
    }
}

/// Drives one deployment run against one network.
///
/// Every failure except an unsupported post-configuration capability stops the
/// run; nothing already mined is rolled back and no record is written.
pub struct RunController<'a, C> {
    client: &'a C,
    plan: DeploymentPlan,
    record: RecordConfig,
    account_index: usize,
    history: Vec<RunState>,
}

impl<'a, C: NetworkClient> RunController<'a, C> {
    pub fn new(client: &'a C, plan: DeploymentPlan, record: RecordConfig) -> Self {
        Self {
            client,
            plan,
            record,
            account_index: 0,
            history: vec![RunState::Start],
        }
    }

    /// Use `eth_accounts[index]` as the deploying account.
    pub fn account_index(mut self, index: usize) -> Self {
        self.account_index = index;
        self
    }

    /// States visited so far, starting with [`RunState::Start`].
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn state(&self) -> &RunState {
        self.history.last().unwrap_or(&RunState::Start)
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            self.state().allows(&next),
            "invalid transition {} -> {}",
            self.state(),
            next
        );
        tracing::debug!(from = %self.state(), to = %next, "Run state transition");
        self.history.push(next);
    }

    /// Execute the run. Each call starts again from [`RunState::Start`].
    pub async fn run(&mut self) -> Result<RunReport, RunError> {
        self.history = vec![RunState::Start];
        match self.execute().await {
            Ok(mut report) => {
                self.transition(RunState::Done);
                report.history = self.history.clone();
                Ok(report)
            }
            Err(e) => {
                tracing::error!(
                    kind = e.kind(),
                    state = %self.state(),
                    error = %error_chain(&e),
                    "Deployment run failed"
                );
                self.transition(RunState::Failed);
                Err(e)
            }
        }
    }

    async fn execute(&mut self) -> Result<RunReport, RunError> {
        let plan = self.plan.clone();
        let order = plan.creation_order()?;

        let accounts = self
            .client
            .accounts()
            .await
            .map_err(RunError::AccountResolution)?;
        let deployer = *accounts.get(self.account_index).ok_or_else(|| {
            RunError::AccountResolution(anyhow::anyhow!(
                "no account at index {} ({} available)",
                self.account_index,
                accounts.len()
            ))
        })?;
        tracing::info!(deployer = %deployer, "Deploying account resolved");
        self.transition(RunState::AccountResolved);

        let ctx = RunContext::new(self.client, deployer);
        let mut deployed = DeployedContracts::default();
        let mut linked = vec![false; plan.links.len()];

        for target in order {
            let contract = deploy_target(ctx, target, &deployed).await?;
            deployed.push(contract);
            self.transition(RunState::ContractDeployed(target.name.clone()));

            // Link groups run as soon as all their endpoints exist.
            for (i, group) in plan.links.iter().enumerate() {
                if linked[i] || !group.participants().iter().all(|p| deployed.contains(p)) {
                    continue;
                }
                link_group(ctx, group, &deployed).await?;
                linked[i] = true;
                self.transition(RunState::Linked(i));
            }
        }

        let post_config = match &plan.post_config {
            Some(step) => Some(post_config::apply(ctx, step, &deployed).await),
            None => None,
        };
        self.transition(RunState::PostConfigured);

        let record = self.build_record(deployer, &deployed, post_config.as_ref());
        record.write(&self.record.path)?;
        self.transition(RunState::RecordWritten);

        Ok(RunReport {
            deployer,
            contracts: deployed,
            post_config,
            record,
            history: Vec::new(),
        })
    }

    fn build_record(
        &self,
        deployer: Address,
        deployed: &DeployedContracts,
        post_config: Option<&PostConfigOutcome>,
    ) -> DeploymentRecord {
        let mut record = DeploymentRecord::new();
        for contract in deployed.iter() {
            record.insert(contract.name.clone(), contract.address);
        }

        if self.record.schema == RecordSchema::Extended {
            record.insert(DEPLOYER_FIELD, deployer);
            if let (Some(step), Some(outcome)) = (&self.plan.post_config, post_config) {
                record.insert(step.record_field(), outcome.admin());
            }
        }

        record
    }
}

/// Render an error followed by all of its sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
