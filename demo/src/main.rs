// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # XRPL Token Demo
//!
//! Entry point for the `xrpl-token-demo` binary. Loads `.env`, parses CLI
//! arguments, initializes logging, and runs one command: either a single
//! ledger operation or the HTTP server (`serve`).
//!
//! Command output goes to stdout; logs go to stderr. A failed command logs
//! the error chain and exits with status 1.

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use xrpl_token_protocol::config::LedgerConfig;
use xrpl_token_protocol::ledger::{HttpFaucet, RpcConnector};
use xrpl_token_protocol::service::{
    compute_send_max, TokenService, TransferTokenOptions, TrustLineOptions, WalletService,
};
use xrpl_token_protocol::wallet::Wallet;

use cli::{Commands, ServeArgs, XrplDemoCli};
use metrics::ApiMetrics;

#[tokio::main]
async fn main() {
    let dotenv = dotenv::dotenv();

    let cli = match XrplDemoCli::try_parse() {
        Ok(cli) => cli,
        Err(e) if prints_usage(e.kind()) => {
            print!("{}", e.render());
            return;
        }
        Err(e) => e.exit(),
    };

    logging::init_logging(logging::DEFAULT_FILTER, cli.log_format);
    if let Err(e) = dotenv {
        tracing::warn!("no .env file loaded ({e}); using environment and defaults");
    }

    if let Err(e) = run(cli).await {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

/// Incomplete invocations print usage and exit cleanly rather than failing.
fn prints_usage(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::MissingRequiredArgument
            | ErrorKind::MissingSubcommand
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            | ErrorKind::InvalidSubcommand
    )
}

async fn run(cli: XrplDemoCli) -> Result<()> {
    let config = cli.ledger_config();
    tracing::debug!(node_url = %config.node_url, faucet = %config.faucet, "ledger config");
    let connector = RpcConnector::new(config.clone());

    match cli.command {
        Commands::CreateAccount => {
            let wallet = WalletService::create_account();
            println!(
                "Account created successfully!\nAddress: {}\nSecret: {}",
                wallet.classic_address(),
                wallet.seed()
            );
        }

        Commands::FundDevnetAccount { address } => {
            let faucet = HttpFaucet::for_network(config.faucet);
            WalletService::fund_account(&faucet, &address)
                .await
                .context("failed to fund account")?;
            println!(
                "Faucet funding request for {address} submitted successfully; check the balance shortly"
            );
        }

        Commands::ConfigIssuer { secret } => {
            let wallet = restore_wallet(&secret)?;
            let service = TokenService::connect(&connector).await?;
            let hash = service
                .configure_issuer(&wallet, None)
                .await
                .context("failed to configure issuer account")?;
            println!(
                "Issuer account configured successfully!\nAccount address: {}\nTransaction hash: {hash}",
                wallet.classic_address()
            );
        }

        Commands::ConfigDistributor { secret } => {
            let wallet = restore_wallet(&secret)?;
            let service = TokenService::connect(&connector).await?;
            let hash = service
                .configure_distributor(&wallet, None)
                .await
                .context("failed to configure distributor account")?;
            println!(
                "Distributor account configured successfully!\nAccount address: {}\nTransaction hash: {hash}",
                wallet.classic_address()
            );
        }

        Commands::CreateTrustline {
            secret,
            issuer,
            token,
            limit,
        } => {
            let wallet = restore_wallet(&secret)?;
            let options = TrustLineOptions {
                issuer_address: issuer,
                token_name: token,
                amount: limit,
            };
            let service = TokenService::connect(&connector).await?;
            let hash = service
                .create_trust_line(&wallet, Some(&options))
                .await
                .context("failed to create trust line")?;
            println!(
                "Trust line created successfully!\nReceiver address: {}\nIssuer address: {}\nToken name: {}\nTrust limit: {}\nTransaction hash: {hash}",
                wallet.classic_address(),
                options.issuer_address,
                options.token_name,
                options.amount
            );
        }

        Commands::TransferToken(args) => {
            let wallet = restore_wallet(&args.secret)?;
            let send_max = compute_send_max(&args.amount, args.transfer_rate)?;
            let options = TransferTokenOptions {
                receiver_address: args.receiver,
                issuer_address: args.issuer,
                token_name: args.token,
                amount: args.amount,
                send_max: Some(send_max),
            };
            let service = TokenService::connect(&connector).await?;
            let hash = service
                .transfer_token(&wallet, &options)
                .await
                .context("failed to transfer token")?;
            println!(
                "Token transferred successfully!\nSender: {}\nReceiver: {}\nToken name: {}\nAmount: {}\nTransaction hash: {hash}",
                wallet.classic_address(),
                options.receiver_address,
                options.token_name,
                options.amount
            );
        }

        Commands::FreezeTrustline(args) => {
            let wallet = restore_wallet(&args.secret)?;
            let service = TokenService::connect(&connector).await?;
            let hash = service
                .freeze_trust_line(&wallet, &args.counterparty, &args.token)
                .await
                .context("failed to freeze trust line")?;
            println!(
                "Trust line frozen successfully!\nAccount: {}\nCounterparty: {}\nToken name: {}\nTransaction hash: {hash}",
                wallet.classic_address(),
                args.counterparty,
                args.token
            );
        }

        Commands::UnfreezeTrustline(args) => {
            let wallet = restore_wallet(&args.secret)?;
            let service = TokenService::connect(&connector).await?;
            let hash = service
                .unfreeze_trust_line(&wallet, &args.counterparty, &args.token)
                .await
                .context("failed to unfreeze trust line")?;
            println!(
                "Trust line unfrozen successfully!\nAccount: {}\nCounterparty: {}\nToken name: {}\nTransaction hash: {hash}",
                wallet.classic_address(),
                args.counterparty,
                args.token
            );
        }

        Commands::GetBalance { address } => {
            let service = WalletService::connect(&connector).await?;
            let balance = service
                .get_balance(&address)
                .await
                .context("failed to get account balance")?;
            println!("XRP balance for account {address}: {balance}");
        }

        Commands::GetTokens { address } => {
            let service = TokenService::connect(&connector).await?;
            let tokens = service
                .get_token_balances(&address)
                .await
                .context("failed to get account tokens")?;
            if tokens.is_empty() {
                println!("Account {address} does not hold any tokens");
                return Ok(());
            }
            println!("Tokens held by account {address}:");
            for (i, token) in tokens.iter().enumerate() {
                println!(
                    "{}. Token: {}\n   Issuer: {}\n   Balance: {}\n   Limit: {}",
                    i + 1,
                    token.token_name,
                    token.issuer,
                    token.balance,
                    token.limit_amount
                );
            }
        }

        Commands::GetTrustlines { address } => {
            let service = TokenService::connect(&connector).await?;
            let response = service
                .get_all_trust_lines(&address)
                .await
                .context("failed to get account trust lines")?;
            if response.lines.is_empty() {
                println!("Account {address} has no trust lines");
                return Ok(());
            }
            println!("Trust lines of account {address}:");
            println!("Validated: {}\n", response.validated);
            for (i, line) in response.lines.iter().enumerate() {
                println!("{}. Trust line", i + 1);
                println!("   Counterparty address: {}", line.account);
                println!("   Currency code: {}", line.currency);
                println!("   Balance: {}", line.balance);
                println!("   Account limit: {}", line.limit);
                println!("   Counterparty limit: {}", line.limit_peer);
                println!("   Quality (receiving): {}", line.quality_in);
                println!("   Quality (sending): {}", line.quality_out);
                println!("   NoRipple: {}", line.no_ripple);
                println!("   Counterparty NoRipple: {}", line.no_ripple_peer);
                println!("   Authorized: {}", line.authorized);
                println!("   Counterparty authorized: {}", line.peer_authorized);
                println!("   Frozen: {}", line.freeze);
                println!("   Counterparty frozen: {}\n", line.freeze_peer);
            }
        }

        Commands::Serve(args) => serve(args, connector, &config).await?,
    }

    Ok(())
}

fn restore_wallet(secret: &str) -> Result<Wallet> {
    Wallet::from_seed(secret).context("failed to restore wallet from secret")
}

/// Serves the HTTP API until SIGINT or SIGTERM.
async fn serve(args: ServeArgs, connector: RpcConnector, config: &LedgerConfig) -> Result<()> {
    let metrics = Arc::new(ApiMetrics::new().context("failed to register metrics")?);
    let state = api::AppState {
        connector: Arc::new(connector),
        faucet: Arc::new(HttpFaucet::for_network(config.faucet)),
        metrics,
    };

    if !args.static_dir.is_dir() {
        tracing::warn!(
            static_dir = %args.static_dir.display(),
            "static directory not found; only the API will be served"
        );
    }
    let router = api::create_router(state, Some(args.static_dir.clone()));

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {addr}"))?;
    tracing::info!(
        node_url = %config.node_url,
        static_dir = %args.static_dir.display(),
        "web interface listening on http://localhost:{}",
        args.port
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("xrpl-token-demo stopped");
    Ok(())
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed, that signal is simply not awaited.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received, draining connections");
}
