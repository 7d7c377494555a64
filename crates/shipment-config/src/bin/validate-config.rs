//! Configuration validation utility
//!
//! Usage: cargo run --bin validate-config config/example.toml

use std::env;
use std::process;

use shipment_config::ConfigLoader;

fn main() {
	let args: Vec<String> = env::args().collect();

	if args.len() != 2 {
		eprintln!("Usage: {} <config-file>", args[0]);
		process::exit(1);
	}

	let config_path = &args[1];

	println!("Validating configuration file: {}", config_path);

	match ConfigLoader::new().with_file(config_path).load() {
		Ok(config) => {
			println!("Configuration is valid");
			println!("Service name: {}", config.service.name);
			println!("Listen address: {}:{}", config.service.host, config.service.port);
			println!("Shiprocket API: {}", config.shiprocket.base_url);
			println!("Credentials present: {}", config.shiprocket.has_credentials());
			println!(
				"Webhook secret present: {}",
				config.shiprocket.webhook_secret.is_some()
			);
			println!("Courier policy: {:?}", config.shiprocket.courier_policy);
		}
		Err(e) => {
			eprintln!("Configuration validation failed:");
			eprintln!("{}", e);
			process::exit(1);
		}
	}
}
