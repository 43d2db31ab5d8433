use std::process::ExitCode;

use clap::Parser;

use xbee_tcp_bridge::application::Application;
use xbee_tcp_bridge::cli::{Cli, Config};

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let config = match Config::try_from(cli) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let app = Application::new(&config);
    if let Err(e) = app.start() {
        log::error!("{e}");
        return ExitCode::FAILURE;
    }

    app.run();
    ExitCode::SUCCESS
}
