//! `btcvote` - command-line front-end for the BTC prediction dashboard.
//!
//!   btcvote status                      network, contracts, protocol stats
//!   btcvote dashboard [--wallet <kind>] user summary and mission checklist
//!   btcvote mint <amount>               deposit DOT, receive vDOT
//!   btcvote stake <amount> [--lock <d>] lock vDOT for voting tickets
//!   btcvote unstake <index>             release a finished stake
//!   btcvote vote <years|never>          submit a prediction (2/4/6/8/10)
//!   btcvote claim [index]               claim rewards of winning votes
//!   btcvote history                     stakes and votes
//!   btcvote watch                       poll balances until Ctrl-C
//!
//! Pages fall back to demo state when the contracts are not deployed on the
//! selected chain.

mod commands;
mod context;

use std::env;

use anyhow::{Result, bail};
use tracing::{error, info};

use btcvote_chain::WalletKind;
use btcvote_core::AppConfig;
use btcvote_core::logging::init_logging;
use btcvote_ui::panels::vote::VoteOption;

use crate::context::AppContext;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_LOCK_DAYS: u64 = 7;

#[derive(Debug, Default)]
struct ParsedArgs {
    command: Option<String>,
    positional: Vec<String>,
    wallet: Option<String>,
    lock_days: Option<u64>,
    chain_id: Option<u64>,
    rpc_url: Option<String>,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        let mut opts = ParsedArgs::default();
        let mut positional = Vec::new();
        let mut i = 0;

        while i < args.len() {
            let arg = &args[i];
            let value = args.get(i + 1);
            match arg.as_str() {
                "--help" | "-h" => opts.help = true,
                "--version" | "-V" => opts.version = true,
                "--wallet" | "-w" => {
                    opts.wallet = value.cloned();
                    i += 1;
                }
                "--lock" | "-l" => {
                    opts.lock_days = value.and_then(|v| v.parse().ok());
                    i += 1;
                }
                "--chain" | "-c" => {
                    opts.chain_id = value.and_then(|v| v.parse().ok());
                    i += 1;
                }
                "--rpc" => {
                    opts.rpc_url = value.cloned();
                    i += 1;
                }
                _ if !arg.starts_with('-') => positional.push(arg.clone()),
                _ => {}
            }
            i += 1;
        }

        if !positional.is_empty() {
            opts.command = Some(positional.remove(0));
        }
        opts.positional = positional;
        opts
    }

    fn arg(&self, index: usize, name: &str) -> Result<&str> {
        match self.positional.get(index) {
            Some(value) => Ok(value),
            None => bail!("missing <{name}>"),
        }
    }

    fn wallet_kind(&self) -> Result<WalletKind> {
        match &self.wallet {
            Some(raw) => raw.parse().map_err(anyhow::Error::msg),
            None => Ok(WalletKind::Evm),
        }
    }
}

fn parse_vote_option(raw: &str) -> Result<VoteOption> {
    if raw.eq_ignore_ascii_case("never") || raw == "永不会" {
        return Ok(VoteOption::Never);
    }
    let years: u64 = raw.trim_end_matches('y').parse()?;
    match VoteOption::from_years(years) {
        Some(option) => Ok(option),
        None => bail!("unsupported prediction {raw}; choose 2, 4, 6, 8, 10 or never"),
    }
}

fn print_usage() {
    println!(
        "btcvote {VERSION}

USAGE:
    btcvote <command> [args] [options]

COMMANDS:
    status                     Network, contracts and protocol stats
    dashboard                  User summary and mission checklist
    mint <amount>              Mint vDOT from DOT
    stake <amount>             Stake vDOT for voting tickets
    unstake <index>            Withdraw a stake after its lock period
    vote <years|never>         Predict when BTC is overtaken (2/4/6/8/10)
    claim [index]              Claim rewards for correct predictions
    history                    Stake and vote history
    watch                      Poll balances and stats until Ctrl-C

OPTIONS:
    -w, --wallet <kind>        evm (default) or substrate
    -l, --lock <days>          Lock period for stake (default 7)
    -c, --chain <id>           Chain id (default from config)
        --rpc <url>            RPC endpoint override
    -h, --help                 Show this help
    -V, --version              Show version"
    );
}

async fn run(opts: &ParsedArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let ctx = AppContext::build(config, opts.chain_id, opts.rpc_url.clone())?;
    info!(chain_id = ctx.chain_id, command = ?opts.command, "btcvote starting");

    match opts.command.as_deref() {
        Some("status") => commands::status(&ctx).await,
        Some("dashboard") | Some("home") => commands::dashboard(&ctx, opts.wallet_kind()?).await,
        Some("mint") => commands::mint(&ctx, opts.arg(0, "amount")?).await,
        Some("stake") => {
            let lock_days = opts.lock_days.unwrap_or(DEFAULT_LOCK_DAYS);
            commands::stake(&ctx, opts.arg(0, "amount")?, lock_days).await
        }
        Some("unstake") => commands::unstake(&ctx, opts.arg(0, "index")?.parse()?).await,
        Some("vote") => commands::vote(&ctx, parse_vote_option(opts.arg(0, "years")?)?).await,
        Some("claim") => {
            let index = opts.positional.first().map(|i| i.parse()).transpose()?;
            commands::claim(&ctx, index).await
        }
        Some("history") => commands::history(&ctx).await,
        Some("watch") => commands::watch(&ctx).await,
        Some(other) => bail!("unknown command: {other}"),
        None => {
            print_usage();
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let opts = ParsedArgs::parse(&args);

    if opts.help {
        print_usage();
        return;
    }
    if opts.version {
        println!("btcvote {VERSION}");
        return;
    }

    let _log_guard = match init_logging() {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("logging disabled: {e:#}");
            None
        }
    };

    if let Err(e) = run(&opts).await {
        error!(error = %e, "command failed");
        eprintln!("错误: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_command_and_flags() {
        let opts = ParsedArgs::parse(&args(&["stake", "12.5", "--lock", "30", "-c", "1284"]));
        assert_eq!(opts.command.as_deref(), Some("stake"));
        assert_eq!(opts.arg(0, "amount").unwrap(), "12.5");
        assert_eq!(opts.lock_days, Some(30));
        assert_eq!(opts.chain_id, Some(1284));
    }

    #[test]
    fn wallet_defaults_to_evm() {
        let opts = ParsedArgs::parse(&args(&["dashboard"]));
        assert_eq!(opts.wallet_kind().unwrap(), WalletKind::Evm);
        let opts = ParsedArgs::parse(&args(&["dashboard", "--wallet", "polkadot"]));
        assert_eq!(opts.wallet_kind().unwrap(), WalletKind::Substrate);
    }

    #[test]
    fn missing_positional_is_an_error() {
        let opts = ParsedArgs::parse(&args(&["mint"]));
        assert!(opts.arg(0, "amount").is_err());
    }

    #[test]
    fn vote_options_parse() {
        assert_eq!(parse_vote_option("6").unwrap(), VoteOption::SixYears);
        assert_eq!(parse_vote_option("10y").unwrap(), VoteOption::TenYears);
        assert_eq!(parse_vote_option("never").unwrap(), VoteOption::Never);
        assert!(parse_vote_option("3").is_err());
    }
}
