#![allow(clippy::upper_case_acronyms)]

use pingora_core::apps::HttpServerOptions;
use pingora_core::listeners::tls::TlsSettings;
use pingora_core::server::configuration::Opt;
use pingora_core::server::Server;
use pingora_proxy::http_proxy_service_with_name;

use pagecycle::config::{Config, Tls};
use pagecycle::logging::init_logger;
use pagecycle::service::http::build_controller_service;

fn main() {
    // Read command-line arguments
    let opt = Opt::parse_args();

    // Load configuration with optional override
    let config = Config::load_yaml_with_opt_override(&opt).expect("Failed to load configuration");

    // Initialize logging
    let log_service = init_logger(&config.log);

    // Bind controllers to their routes
    log::info!("Loading controllers...");
    let controller_service =
        build_controller_service(&config).expect("Failed to initialize controller service");

    // Create Pingora server with optional configuration
    let mut server = Server::new_with_opt_and_conf(Some(opt), config.pingora);

    let mut http_service =
        http_proxy_service_with_name(&server.configuration, controller_service, "pagecycle");

    // Add listeners from configuration
    log::info!("Adding listeners...");
    for list_cfg in config.listeners {
        match list_cfg.tls {
            Some(Tls {
                cert_path,
                key_path,
            }) => {
                let mut settings = TlsSettings::intermediate(&cert_path, &key_path)
                    .expect("Adding TLS listener shouldn't fail");
                if list_cfg.offer_h2 {
                    settings.enable_h2();
                }
                http_service.add_tls_with_settings(&list_cfg.address.to_string(), None, settings);
            }
            None => {
                if list_cfg.offer_h2c {
                    if let Some(http_logic) = http_service.app_logic_mut() {
                        let mut http_server_options = HttpServerOptions::default();
                        http_server_options.h2c = true;
                        http_logic.server_options = Some(http_server_options);
                    }
                }
                http_service.add_tcp(&list_cfg.address.to_string());
            }
        }
    }

    log::info!("Bootstrapping...");
    server.bootstrap();

    log::info!("Bootstrapped. Adding Services...");
    if let Some(log_service) = log_service {
        server.add_service(log_service);
    }
    server.add_service(http_service);

    log::info!("Starting Server...");
    server.run_forever();
}
