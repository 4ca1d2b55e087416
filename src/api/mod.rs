use axum::{
    Router,
    extract::{Json, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, ValueEnum};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::{
    AllocationRule, DEFAULT_MAX_MONTHS, DEFAULT_STALL_MONTHS, Debt, Forecast, ForecastHistory,
    ForecastOutcome, ForecastSummary, Money, PlanOptions, Snowflake, Strategy, compare_extra,
    simulate,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliStrategy {
    Snowball,
    Avalanche,
    Custom,
}

impl From<CliStrategy> for Strategy {
    fn from(value: CliStrategy) -> Self {
        match value {
            CliStrategy::Snowball => Strategy::Snowball,
            CliStrategy::Avalanche => Strategy::Avalanche,
            CliStrategy::Custom => Strategy::Custom,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliAllocation {
    InterestFirst,
    Proportional,
}

impl From<CliAllocation> for AllocationRule {
    fn from(value: CliAllocation) -> Self {
        match value {
            CliAllocation::InterestFirst => AllocationRule::InterestFirst,
            CliAllocation::Proportional => AllocationRule::Proportional,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApiStrategy {
    #[serde(alias = "Snowball")]
    Snowball,
    #[serde(alias = "Avalanche")]
    Avalanche,
    #[serde(alias = "Custom")]
    Custom,
}

impl From<ApiStrategy> for CliStrategy {
    fn from(value: ApiStrategy) -> Self {
        match value {
            ApiStrategy::Snowball => CliStrategy::Snowball,
            ApiStrategy::Avalanche => CliStrategy::Avalanche,
            ApiStrategy::Custom => CliStrategy::Custom,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiAllocation {
    #[serde(alias = "interestFirst", alias = "interest_first")]
    InterestFirst,
    Proportional,
}

impl From<ApiAllocation> for CliAllocation {
    fn from(value: ApiAllocation) -> Self {
        match value {
            ApiAllocation::InterestFirst => CliAllocation::InterestFirst,
            ApiAllocation::Proportional => CliAllocation::Proportional,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ForecastPayload {
    debts: Vec<Debt>,
    strategy: Option<ApiStrategy>,
    extra_payment: Option<Money>,
    snowflakes: Vec<Snowflake>,
    max_months: Option<u32>,
    stall_months: Option<u32>,
    allocation: Option<ApiAllocation>,
    principal_cap_percent: Option<Money>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ComparePayload {
    #[serde(flatten)]
    plan: ForecastPayload,
    additional_payment: Option<Money>,
}

#[derive(Parser, Debug)]
#[command(
    name = "payoff",
    about = "Debt payoff planner (snowball, avalanche or custom order, per-bucket APRs)"
)]
struct Cli {
    #[arg(long, help = "JSON file holding the list of debts")]
    debts: PathBuf,
    #[command(flatten)]
    plan: PlanArgs,
    #[arg(
        long,
        help = "Also run the plan with this much more each month and report the savings"
    )]
    compare: Option<Money>,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[arg(long, value_enum, default_value_t = CliStrategy::Snowball)]
    strategy: CliStrategy,
    #[arg(
        long,
        visible_alias = "extra",
        default_value = "0",
        help = "Recurring extra payment each month"
    )]
    extra_payment: Money,
    #[arg(
        long = "snowflake",
        value_parser = parse_snowflake,
        help = "One-off payment as MONTH:AMOUNT or MONTH:AMOUNT:DEBT_ID, repeatable"
    )]
    snowflakes: Vec<Snowflake>,
    #[arg(long, default_value_t = DEFAULT_MAX_MONTHS)]
    max_months: u32,
    #[arg(
        long,
        default_value_t = DEFAULT_STALL_MONTHS,
        help = "Months without a falling balance before the plan is reported as stalled"
    )]
    stall_months: u32,
    #[arg(long, value_enum, default_value_t = CliAllocation::InterestFirst)]
    allocation: CliAllocation,
    #[arg(
        long,
        default_value = "5",
        help = "Interest-first rule: per-bucket principal cap in percent of starting balance"
    )]
    principal_cap_percent: Money,
}

#[derive(Debug)]
struct ApiRequest {
    debts: Vec<Debt>,
    options: PlanOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ForecastResponse {
    strategy: Strategy,
    allocation: AllocationRule,
    extra_payment: Money,
    outcome: ForecastOutcome,
    summary: ForecastSummary,
    months: ForecastHistory,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn parse_snowflake(raw: &str) -> Result<Snowflake, String> {
    let mut parts = raw.splitn(3, ':');
    let month = parts
        .next()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .ok_or_else(|| format!("snowflake `{raw}` must start with a month number"))?;
    let amount = parts
        .next()
        .and_then(|s| s.trim().parse::<Money>().ok())
        .ok_or_else(|| format!("snowflake `{raw}` needs an amount after the month"))?;
    let debt_id = parts
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    Ok(Snowflake {
        month,
        amount,
        debt_id,
    })
}

fn build_options(args: PlanArgs) -> Result<PlanOptions, String> {
    if args.extra_payment < Money::ZERO {
        return Err("--extra-payment must be >= 0".to_string());
    }

    if args.max_months == 0 {
        return Err("--max-months must be > 0".to_string());
    }

    if args.stall_months == 0 {
        return Err("--stall-months must be > 0".to_string());
    }

    if !(Money::ZERO..=dec!(100)).contains(&args.principal_cap_percent) {
        return Err("--principal-cap-percent must be between 0 and 100".to_string());
    }

    Ok(PlanOptions {
        strategy: args.strategy.into(),
        extra_payment: args.extra_payment,
        snowflakes: args.snowflakes,
        max_months: args.max_months,
        stall_months: args.stall_months,
        allocation: args.allocation.into(),
        principal_cap_rate: args.principal_cap_percent / dec!(100),
    })
}

/// Runs the `plan` command line and prints the forecast (or comparison) as JSON.
pub fn run_cli<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => return Err(e.to_string()),
    };
    println!("{}", render_cli(cli)?);
    Ok(())
}

fn render_cli(cli: Cli) -> Result<String, String> {
    let raw = fs::read_to_string(&cli.debts)
        .map_err(|e| format!("Failed to read {}: {e}", cli.debts.display()))?;
    let debts: Vec<Debt> =
        serde_json::from_str(&raw).map_err(|e| format!("Invalid debts JSON: {e}"))?;
    let options = build_options(cli.plan)?;

    match cli.compare {
        Some(additional) => {
            let comparison =
                compare_extra(&debts, &options, additional).map_err(|e| e.to_string())?;
            serde_json::to_string_pretty(&comparison)
        }
        None => {
            let forecast = simulate(&debts, &options).map_err(|e| e.to_string())?;
            serde_json::to_string_pretty(&build_forecast_response(&options, forecast))
        }
    }
    .map_err(|e| format!("Failed to serialize output: {e}"))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "payoff HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/api/health");

    axum::serve(listener, router()).await
}

fn router() -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/forecast", post(forecast_handler))
        .route("/api/compare", post(compare_handler))
        .fallback(not_found_handler)
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn forecast_handler(payload: Result<Json<ForecastPayload>, JsonRejection>) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejected_payload(rejection),
    };
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match simulate(&request.debts, &request.options) {
        Ok(forecast) => json_response(
            StatusCode::OK,
            build_forecast_response(&request.options, forecast),
        ),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

async fn compare_handler(payload: Result<Json<ComparePayload>, JsonRejection>) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejected_payload(rejection),
    };
    let Some(additional) = payload.additional_payment else {
        return error_response(StatusCode::BAD_REQUEST, "additionalPayment is required");
    };
    let request = match api_request_from_payload(payload.plan) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match compare_extra(&request.debts, &request.options, additional) {
        Ok(comparison) => json_response(StatusCode::OK, comparison),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

fn rejected_payload(rejection: JsonRejection) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        &format!("Invalid API JSON payload: {}", rejection.body_text()),
    )
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<ForecastPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ForecastPayload) -> Result<ApiRequest, String> {
    if payload.debts.is_empty() {
        return Err("debts must contain at least one debt".to_string());
    }

    let mut args = default_plan_args();
    if let Some(v) = payload.strategy {
        args.strategy = v.into();
    }
    if let Some(v) = payload.extra_payment {
        args.extra_payment = v;
    }
    if let Some(v) = payload.max_months {
        args.max_months = v;
    }
    if let Some(v) = payload.stall_months {
        args.stall_months = v;
    }
    if let Some(v) = payload.allocation {
        args.allocation = v.into();
    }
    if let Some(v) = payload.principal_cap_percent {
        args.principal_cap_percent = v;
    }
    args.snowflakes = payload.snowflakes;

    let options = build_options(args)?;
    Ok(ApiRequest {
        debts: payload.debts,
        options,
    })
}

fn default_plan_args() -> PlanArgs {
    PlanArgs {
        strategy: CliStrategy::Snowball,
        extra_payment: Money::ZERO,
        snowflakes: Vec::new(),
        max_months: DEFAULT_MAX_MONTHS,
        stall_months: DEFAULT_STALL_MONTHS,
        allocation: CliAllocation::InterestFirst,
        principal_cap_percent: dec!(5),
    }
}

fn build_forecast_response(options: &PlanOptions, forecast: Forecast) -> ForecastResponse {
    ForecastResponse {
        strategy: options.strategy,
        allocation: options.allocation,
        extra_payment: options.extra_payment,
        outcome: forecast.outcome,
        summary: forecast.summary,
        months: forecast.history,
    }
}
