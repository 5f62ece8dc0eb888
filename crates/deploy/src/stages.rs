//! States of a deployment run.
//!
//! The run moves forward only: Start -> AccountResolved -> (ContractDeployed | Linked)*
//! -> PostConfigured -> RecordWritten -> Done. Failed is terminal and reachable
//! from every non-terminal state.

/// A state visited by the run controller.
#[derive(Debug, Clone, PartialEq, Eq, strum::Display)]
pub enum RunState {
    #[strum(to_string = "start")]
    Start,
    #[strum(to_string = "account-resolved")]
    AccountResolved,
    #[strum(to_string = "deployed({0})")]
    ContractDeployed(String),
    /// Index of the link group in the plan.
    #[strum(to_string = "linked({0})")]
    Linked(usize),
    #[strum(to_string = "post-configured")]
    PostConfigured,
    #[strum(to_string = "record-written")]
    RecordWritten,
    #[strum(to_string = "done")]
    Done,
    #[strum(to_string = "failed")]
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `next` may follow `self`.
    pub fn allows(&self, next: &RunState) -> bool {
        use RunState::*;

        if self.is_terminal() {
            return false;
        }

        match (self, next) {
            (_, Failed) => true,
            (Start, AccountResolved) => true,
            (AccountResolved | ContractDeployed(_) | Linked(_), ContractDeployed(_) | Linked(_)) => {
                true
            }
            (AccountResolved | ContractDeployed(_) | Linked(_), PostConfigured) => true,
            (PostConfigured, RecordWritten) => true,
            (RecordWritten, Done) => true,
            _ => false,
        }
    }
}
