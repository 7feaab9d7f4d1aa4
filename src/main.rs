use std::process::ExitCode;

use handstream_lib::settings::types::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    handstream_lib::init_logger();

    match handstream_lib::run(Settings::from_env()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
