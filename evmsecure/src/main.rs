// Standard library imports
use std::{env, process::ExitCode};

// Third party imports
use anyhow::{anyhow, Context, Result};
use dotenv::dotenv;
use tracing::{error, info};

// Internal imports
use evmsecure::{RequestKind, SecurityService};
use evmsecure_common::{init_tracing, AppConfig};

const USAGE: &str = "Usage: evmsecure [--json] <allowances|contract> <text...>";

struct Args {
    kind: RequestKind,
    text: String,
    json: bool,
}

fn parse_args() -> Result<Args> {
    let mut json = false;
    let mut rest = Vec::new();
    for arg in env::args().skip(1) {
        if arg == "--json" {
            json = true;
        } else {
            rest.push(arg);
        }
    }

    let mut rest = rest.into_iter();
    let kind = rest
        .next()
        .ok_or_else(|| anyhow!(USAGE))?
        .parse::<RequestKind>()
        .map_err(|e| anyhow!("{}\n{}", e, USAGE))?;
    let text = rest.collect::<Vec<_>>().join(" ");

    Ok(Args { kind, text, json })
}

async fn run(args: Args) -> Result<bool> {
    let config = AppConfig::from_env().context("Không thể tải cấu hình")?;
    let service = SecurityService::from_config(&config).context("Không thể khởi tạo service")?;

    if !args.json {
        let result = service.render(args.kind, &args.text).await;
        let ok = result.is_ok();
        let message = result.unwrap_or_else(|e| {
            error!("Yêu cầu thất bại: {}", e);
            e.user_message()
        });
        println!("{}", message);
        return Ok(ok);
    }

    let output = match args.kind {
        RequestKind::Allowances => service
            .check_allowances(&args.text)
            .await
            .map(|result| serde_json::to_string_pretty(&result)),
        RequestKind::Contract => service
            .check_contract(&args.text)
            .await
            .map(|analysis| serde_json::to_string_pretty(&analysis)),
    };

    match output {
        Ok(json) => {
            println!("{}", json?);
            Ok(true)
        }
        Err(e) => {
            error!("Yêu cầu thất bại: {}", e);
            println!("{}", serde_json::json!({ "error": e.user_message() }));
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    init_tracing();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };
    info!(request = %args.kind, "Khởi động evmsecure");

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
