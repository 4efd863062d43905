use std::path::PathBuf;

use clap::Parser;

use crate::domain::{ApprovalPolicy, Principal};

/// Replays a CSV file of joint-custody ledger commands and prints the final
/// account report.
#[derive(Debug, Parser)]
#[command(name = "joint_ledger", version)]
pub struct Cli {
    /// CSV file with columns `type, caller, account, request, amount, owners`.
    pub input: PathBuf,

    /// Co-owner approvals needed before a withdrawal can execute:
    /// `unanimous`, or a positive count capped at the number of co-owners.
    #[arg(long, default_value_t = ApprovalPolicy::Unanimous)]
    pub approval_policy: ApprovalPolicy,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Write the deployment descriptor (address, signer, interface) here.
    #[arg(long, value_name = "PATH")]
    pub deployment_info: Option<PathBuf>,

    /// Principal recorded as the deployer in the deployment descriptor.
    #[arg(long, default_value = "deployer")]
    pub signer: Principal,
}
