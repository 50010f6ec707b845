//! Runs one tool call against the sandbox ledger and prints the outcome
//! record as JSON.
//!
//! Usage:
//!   ledgerkit transfer_hbar --params '{"transfers":[{"accountId":"0.0.5","amount":1}]}'
//!   ledgerkit --mode return-bytes --acting-account 0.0.1001 --resolve-counterparty \
//!       delete_topic --params '{"topicId":"0.0.7"}' --meta '{"schedule":true}'

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ledgerkit_agent::config::{AgentConfig, LoggingConfig, Network, OperatingMode};
use ledgerkit_agent::context::AgentContext;
use ledgerkit_agent::directory::MirrorNodeDirectory;
use ledgerkit_agent::logging::init_logging;
use ledgerkit_agent::sandbox::{SandboxLedger, StaticSigner};
use ledgerkit_agent::service::ToolCall;
use ledgerkit_agent::Agent;
use ledgerkit_core::{AccountId, PublicKey, SystemClock, DEFAULT_FILE_CHUNK_SIZE};

#[derive(Parser)]
#[command(name = "ledgerkit")]
#[command(about = "Stage a ledger operation and resolve how it is delivered")]
struct Args {
    /// Tool to call, e.g. `transfer_hbar`
    tool: String,

    /// Tool parameters as a JSON object
    #[arg(long, default_value = "{}")]
    params: String,

    /// Meta options as a JSON object
    #[arg(long, default_value = "{}")]
    meta: String,

    /// Parameters the caller filled with defaults
    #[arg(long)]
    defaulted: Vec<String>,

    /// Fail the call after this many milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,

    #[arg(long, value_enum, env = "LEDGERKIT_MODE", default_value = "autonomous")]
    mode: OperatingMode,

    /// Schedule operations unless a call says otherwise (return-bytes mode)
    #[arg(long, env = "LEDGERKIT_SCHEDULE_BY_DEFAULT")]
    schedule_by_default: bool,

    /// Account the agent acts for
    #[arg(long, env = "LEDGERKIT_ACTING_ACCOUNT")]
    acting_account: Option<AccountId>,

    #[arg(long, env = "LEDGERKIT_OPERATOR_ACCOUNT", default_value = "0.0.2")]
    operator_account: AccountId,

    /// Operator public key (DER or raw hex)
    #[arg(long, env = "LEDGERKIT_OPERATOR_PUBLIC_KEY")]
    operator_public_key: Option<PublicKey>,

    #[arg(long, value_enum, env = "LEDGERKIT_NETWORK", default_value = "testnet")]
    network: Network,

    #[arg(long, env = "LEDGERKIT_MIRROR_NODE_URL")]
    mirror_node_url: Option<String>,

    /// Look up the acting account's key on the mirror node when scheduling
    #[arg(long)]
    resolve_counterparty: bool,

    #[arg(long, default_value_t = DEFAULT_FILE_CHUNK_SIZE)]
    file_chunk_size: usize,

    #[arg(long, env = "LEDGERKIT_LOG", default_value = "warn")]
    log_filter: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn config(&self) -> AgentConfig {
        AgentConfig {
            mode: self.mode,
            schedule_by_default: self.schedule_by_default,
            acting_account: self.acting_account,
            network: self.network,
            mirror_node_url: self.mirror_node_url.clone(),
            file_chunk_size: self.file_chunk_size,
            logging: LoggingConfig {
                enabled: true,
                json: self.log_json,
                filter: self.log_filter.clone(),
            },
            ..AgentConfig::default()
        }
    }

    fn tool_call(&self) -> anyhow::Result<ToolCall> {
        Ok(ToolCall {
            tool: self.tool.clone(),
            params: serde_json::from_str(&self.params).context("parsing --params")?,
            meta: serde_json::from_str(&self.meta).context("parsing --meta")?,
            defaulted: self.defaulted.clone(),
            deadline_ms: self.deadline_ms,
        })
    }
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let config = args.config();
    init_logging(&config.logging)?;
    let call = args.tool_call()?;

    let ledger = Arc::new(SandboxLedger::new(Arc::new(SystemClock)));
    let signer = StaticSigner::new(args.operator_account, args.operator_public_key.clone());
    let mirror_url = config.mirror_url().to_string();
    let mut ctx = AgentContext::new(config, ledger).with_signer(Arc::new(signer));
    if args.resolve_counterparty {
        ctx = ctx.with_directory(Arc::new(MirrorNodeDirectory::new(mirror_url)?));
    }

    let record = Agent::new(ctx).call(call).await;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(record.success)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}
