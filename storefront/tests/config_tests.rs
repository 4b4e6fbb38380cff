// tests/config_tests.rs
use intellibazar::config::{AppConfig, LogFormat};
use serial_test::serial;
use std::env;

const VARS: [&str; 6] = [
  "TOKEN_SECRET",
  "SERVER_PORT",
  "PAYPAL_CLIENT_ID",
  "PAYPAL_CLIENT_SECRET",
  "PAYPAL_CURRENCY",
  "LOG_FORMAT",
];

fn clear() {
  for var in VARS {
    env::remove_var(var);
  }
}

#[test]
#[serial]
fn reads_process_environment() {
  clear();
  env::set_var("TOKEN_SECRET", "from-env");
  env::set_var("SERVER_PORT", "9090");
  env::set_var("PAYPAL_CLIENT_ID", "client");
  env::set_var("PAYPAL_CLIENT_SECRET", "secret");
  env::set_var("PAYPAL_CURRENCY", "eur");
  env::set_var("LOG_FORMAT", "json");

  let config = AppConfig::from_env().unwrap();
  assert_eq!(config.server_port, 9090);
  assert_eq!(config.paypal.as_ref().map(|p| p.currency.as_str()), Some("EUR"));
  assert_eq!(config.log_format, LogFormat::Json);
  clear();
}

#[test]
#[serial]
fn missing_token_secret_is_a_config_error() {
  clear();
  let err = AppConfig::from_env().unwrap_err();
  assert!(err.public_message().contains("TOKEN_SECRET"));
}
