use std::process::ExitCode;

use capture::CaptureConfig;
use clap::Parser;
use replay::{output_schema, replay, Args};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    if args.schema {
        return match serde_json::to_string_pretty(&output_schema()) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(why) => {
                log::error!("can not serialize schema: {}", why);
                ExitCode::FAILURE
            }
        };
    }

    let config = args.config(CaptureConfig::from_env());

    match replay(&args, config).await {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(why) => {
                log::error!("can not serialize territory: {}", why);
                ExitCode::FAILURE
            }
        },
        Err(why) => {
            log::error!("{}", why);
            ExitCode::FAILURE
        }
    }
}
