use booking_relay::{cli::Cli, config::Config, core::LaunchMethod, dispatcher::CompletionPolicy};
use clap::Parser;
use figment::Jail;
use std::net::SocketAddr;
use std::path::PathBuf;

#[test]
fn test_load_defaults_without_file() {
    Jail::expect_with(|_jail| {
        let config = Config::load(&Cli::default()).map_err(|e| e.to_string())?;
        assert_eq!(config, Config::default());
        assert_eq!(config.whatsapp.phone_number, "918013763607");
        assert_eq!(config.backend.persist_function, "save-to-sheets");
        assert_eq!(config.form.completion, CompletionPolicy::Persistence);
        Ok(())
    });
}

#[test]
fn test_load_full_valid_config() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "booking-relay.toml",
            r#"
            log_level = "debug"

            [server]
            listen_addr = "0.0.0.0:9090"

            [backend]
            base_url = "https://project.functions.example.com"
            api_key = "anon"

            [webhook]
            url = "https://hooks.example.com/booking"
            relay_destination = "https://hooks.example.com/booking"
            timeout_ms = 2000
            retry_delays_ms = [100]

            [whatsapp]
            phone_number = "15550001111"
            retry_delays_ms = [50, 50]

            [[whatsapp.launchers]]
            method = "new_window"
            command = ["xdg-open"]

            [[whatsapp.launchers]]
            method = "navigate"
            command = ["firefox", "--new-tab"]
            wait = false

            [outbox]
            path = "outbox.json"

            [form]
            require_email = true
            display_seconds = 3
            completion = "handoff"

            [metrics]
            enabled = true
            "#,
        )?;

        let cli = Cli::try_parse_from(["booking-relay", "--config", "booking-relay.toml"]).unwrap();
        let config = Config::load(&cli).map_err(|e| e.to_string())?;

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.server.listen_addr, "0.0.0.0:9090".parse::<SocketAddr>().unwrap());
        assert_eq!(config.backend.api_key.as_deref(), Some("anon"));
        assert_eq!(config.backend.relay_function, "send-appointment-email");
        assert_eq!(config.webhook.timeout_ms, 2000);
        assert_eq!(config.webhook.retry_policy().max_rounds(), 2);
        assert_eq!(config.webhook.relay_target, "n8n");
        assert_eq!(config.whatsapp.retry_policy().max_rounds(), 3);
        assert_eq!(config.whatsapp.launchers.len(), 2);
        assert_eq!(config.whatsapp.launchers[1].method, LaunchMethod::Navigate);
        assert!(config.whatsapp.launchers[0].wait);
        assert!(!config.whatsapp.launchers[1].wait);
        assert_eq!(config.outbox.path, Some(PathBuf::from("outbox.json")));
        assert!(config.form.require_email);
        assert_eq!(config.form.completion, CompletionPolicy::Handoff);
        assert!(config.metrics.enabled);
        Ok(())
    });
}

#[test]
fn test_env_overrides_file_and_cli_overrides_env() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "booking-relay.toml",
            r#"
            [webhook]
            url = "https://file.example.com/hook"

            [whatsapp]
            phone_number = "111"
            "#,
        )?;
        jail.set_env("BOOKING_RELAY_WEBHOOK__URL", "https://env.example.com/hook");
        jail.set_env("BOOKING_RELAY_FORM__REQUIRE_EMAIL", "true");

        let cli = Cli::try_parse_from([
            "booking-relay",
            "--config",
            "booking-relay.toml",
            "--phone-number",
            "333",
        ])
        .unwrap();
        let config = Config::load(&cli).map_err(|e| e.to_string())?;

        assert_eq!(config.webhook.url.as_deref(), Some("https://env.example.com/hook"));
        assert_eq!(config.whatsapp.phone_number, "333");
        assert!(config.form.require_email);
        Ok(())
    });
}

#[test]
fn test_invalid_completion_policy_is_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "booking-relay.toml",
            r#"
            [form]
            completion = "whenever"
            "#,
        )?;
        let cli = Cli::try_parse_from(["booking-relay", "--config", "booking-relay.toml"]).unwrap();
        assert!(Config::load(&cli).is_err());
        Ok(())
    });
}
