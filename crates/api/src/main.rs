//! `portal-auth` - operator CLI for per-tenant platform tokens.
//!
//! Run with: `portal-auth <command> [args]`
//!
//! Command results go to stdout as JSON; diagnostics go to stderr through
//! `tracing`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::env;
use std::io::Read as _;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{anyhow, Context};
use chrono::Utc;
use portal_auth_app::controller::record_summary;
use portal_auth_app::utils::logging::{init_logging, log_command_execution, LogFormat};
use portal_auth_app::{dispatch, AppContext, Outcome, RequestContext};
use portal_auth_core::{EventStatus, TokenStore};
use portal_auth_domain::PortalAuthError;
use serde_json::json;

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();

    if let Err(e) = init_logging(LogFormat::from_env()) {
        eprintln!("Logging disabled: {e}");
    }
    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "config.dotenv_loaded"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "config.dotenv_failed"),
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().map(String::as_str);
    let arg = args.get(1).map(String::as_str);

    let result = match command {
        Some("help" | "--help" | "-h") | None => {
            print_help();
            Ok(true)
        }
        Some(name @ ("status" | "inspect" | "refresh" | "revoke" | "list" | "dispatch")) => {
            run(name, arg).await
        }
        Some(unknown) => {
            eprintln!("Unknown command: {unknown}");
            eprintln!();
            print_help();
            Err(anyhow!("Unknown command"))
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Command failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("portal-auth - platform token lifecycle");
    println!();
    println!("USAGE:");
    println!("    portal-auth <COMMAND> [ARG]");
    println!();
    println!("COMMANDS:");
    println!("    status <member_id>    Report whether the tenant holds a valid record");
    println!("    inspect <member_id>   Show the stored record, reporting corruption");
    println!("    refresh <member_id>   Refresh the tenant's token if it is stale");
    println!("    revoke <member_id>    Delete the tenant's record");
    println!("    list                  List tenants with a stored record");
    println!("    dispatch [JSON]       Route one request (JSON argument or stdin)");
    println!("    help                  Show this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    PORTAL_AUTH_CLIENT_ID, PORTAL_AUTH_CLIENT_SECRET, PORTAL_AUTH_TOKEN_DIR");
    println!("    PORTAL_AUTH_LOG_FORMAT=json|text, RUST_LOG");
}

/// Run one context-backed command. `Ok(false)` means the command completed
/// but reports a negative result.
async fn run(command: &str, arg: Option<&str>) -> anyhow::Result<bool> {
    let ctx = AppContext::new().context("failed to initialise application context")?;
    let started = Instant::now();

    let result = match command {
        "status" => status(&ctx, required(arg)?).await,
        "inspect" => inspect(&ctx, required(arg)?).await,
        "refresh" => refresh(&ctx, required(arg)?).await,
        "revoke" => revoke(&ctx, required(arg)?).await,
        "list" => list(&ctx).await,
        _ => dispatch_request(&ctx, arg).await,
    };

    log_command_execution(command, started.elapsed(), result.as_ref().err());
    Ok(result?)
}

fn required(arg: Option<&str>) -> Result<&str, PortalAuthError> {
    arg.filter(|a| !a.trim().is_empty())
        .ok_or_else(|| PortalAuthError::InvalidRequest("member id argument is required".into()))
}

fn now_epoch() -> i64 {
    Utc::now().timestamp()
}

fn emit(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

async fn status(ctx: &AppContext, member_id: &str) -> Result<bool, PortalAuthError> {
    let record = ctx.manager.get_token(member_id).await?;
    let authorized = record.is_some();

    let mut body = json!({ "memberId": member_id, "authorized": authorized });
    if let Some(record) = record {
        body["tenant"] = record_summary(&record);
        body["expiresIn"] = json!(record.seconds_until_expiry(now_epoch()));
    }
    emit(&body);
    Ok(authorized)
}

async fn inspect(ctx: &AppContext, member_id: &str) -> Result<bool, PortalAuthError> {
    match ctx.store.load_strict(member_id).await {
        Ok(Some(record)) => {
            let now = now_epoch();
            emit(&json!({
                "tenant": record_summary(&record),
                "expiresIn": record.seconds_until_expiry(now),
                "stale": record.is_expired(now, ctx.config.lifecycle.refresh_threshold_seconds),
            }));
            Ok(true)
        }
        Ok(None) => {
            emit(&json!({ "memberId": member_id, "stored": false }));
            Ok(false)
        }
        Err(PortalAuthError::MalformedRecord { member_id, reason }) => {
            emit(&json!({ "memberId": member_id, "stored": true, "malformed": reason }));
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

async fn refresh(ctx: &AppContext, member_id: &str) -> Result<bool, PortalAuthError> {
    let record = ctx.manager.refresh_if_needed(member_id).await?;
    emit(&json!({
        "tenant": record_summary(&record),
        "expiresIn": record.seconds_until_expiry(now_epoch()),
    }));
    Ok(true)
}

async fn revoke(ctx: &AppContext, member_id: &str) -> Result<bool, PortalAuthError> {
    ctx.manager.delete_token(member_id).await?;
    emit(&json!({ "memberId": member_id, "revoked": true }));
    Ok(true)
}

async fn list(ctx: &AppContext) -> Result<bool, PortalAuthError> {
    let members = ctx.store.member_ids().await?;
    emit(&json!({ "tenants": members }));
    Ok(true)
}

async fn dispatch_request(ctx: &AppContext, arg: Option<&str>) -> Result<bool, PortalAuthError> {
    let raw = match arg {
        Some(raw) => raw.to_string(),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map_err(|e| {
                PortalAuthError::InvalidRequest(format!("failed to read request from stdin: {e}"))
            })?;
            buf
        }
    };
    let request: RequestContext = serde_json::from_str(&raw).map_err(|e| {
        PortalAuthError::InvalidRequest(format!("request is not a JSON object of parameters: {e}"))
    })?;

    let outcome = dispatch(ctx, request).await;
    emit(&outcome.to_json());

    Ok(!matches!(
        outcome,
        Outcome::AuthorizationFailed(_) | Outcome::Event(EventStatus::Error { .. })
    ))
}
