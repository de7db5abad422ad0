use clap::Parser;
use labelkeep::configuration::{Args, Config};
use labelkeep::controller::Controller;
use log::{error, info};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let args = Args::parse();

    info!("Importing configuration from {}", args.config_file.display());
    let config = Config::from_args(&args).unwrap_or_else(|e| {
        error!("Unable to import configuration: {}", e);
        std::process::exit(1);
    });
    info!("Configuration imported successfully");

    // storage is opened before the server runtime exists
    let controller = Controller::new(config).unwrap_or_else(|e| {
        error!("Unable to create a controller instance: {}, exiting...", e);
        std::process::exit(1);
    });

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        error!("Unable to start the async runtime: {}", e);
        std::process::exit(1);
    });
    if let Err(e) = runtime.block_on(controller.run()) {
        error!("Error occured in the controller process: {}, exiting...", e);
        std::process::exit(1);
    }
}
