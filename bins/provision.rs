use tracing::{error, info};

fn init_logging() {
    // load .env first so RUST_LOG and ENTRYWAY_* take effect
    common::env::load_dotenv();
    if common::env::env_flag("ENTRYWAY_LOG_JSON") {
        common::utils::logging::init_logging_json();
    } else {
        common::utils::logging::init_logging_default();
    }
    info!(service = "provision", event = "logger_init", "tracing subscriber initialized");
}

fn main() -> std::process::ExitCode {
    init_logging();

    let cfg = match configs::ProviderConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(service = "provision", event = "config_invalid", error = %e, "failed to load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };
    if cfg.store.data_file.is_none() {
        info!(service = "provision", "no store.data_file configured; tables exist only for this run");
    }

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "provision", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    rt.block_on(async move {
        match entryway_store::open_provider(cfg).await {
            Ok(provider) => {
                let store = &provider.config().store;
                info!(
                    service = "provision",
                    event = "done",
                    users_table = %store.users_table,
                    strategies_table = %store.strategies_table,
                    "tables provisioned"
                );
                std::process::ExitCode::SUCCESS
            }
            Err(e) => {
                error!(service = "provision", event = "provision_failed", code = e.code(), error = %e, "provisioning failed");
                std::process::ExitCode::FAILURE
            }
        }
    })
}
