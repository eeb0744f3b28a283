use calltrack_rs::config::Config;
use secrecy::ExposeSecret;

// One test so the env-var mutations cannot race a parallel test runner.
#[test]
fn config_from_env() {
    unsafe {
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("OTEL_ENDPOINT");
        std::env::remove_var("LOG_LEVEL");
        std::env::remove_var("DISPLAY_TIMEZONE");
    }

    // DATABASE_URL is required.
    assert!(Config::from_env().is_err());

    unsafe {
        std::env::set_var("DATABASE_URL", "postgres://u:p@localhost/calltrack");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(
        config.database_url.expose_secret(),
        "postgres://u:p@localhost/calltrack"
    );
    assert!(config.otel_endpoint.is_none());
    assert_eq!(config.log_level, "info");
    assert_eq!(config.display_timezone, chrono_tz::America::Los_Angeles);

    // The secret must not leak through Debug.
    let debugged = format!("{config:?}");
    assert!(!debugged.contains("p@localhost"));

    unsafe {
        std::env::set_var("OTEL_ENDPOINT", "http://localhost:4317");
        std::env::set_var("LOG_LEVEL", "debug");
        std::env::set_var("DISPLAY_TIMEZONE", "Europe/Berlin");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.otel_endpoint.as_deref(), Some("http://localhost:4317"));
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.display_timezone, chrono_tz::Europe::Berlin);

    // An unknown timezone fails fast instead of silently falling back.
    unsafe {
        std::env::set_var("DISPLAY_TIMEZONE", "Mars/Olympus_Mons");
    }
    assert!(Config::from_env().is_err());

    unsafe {
        std::env::set_var("DISPLAY_TIMEZONE", "America/Los_Angeles");
    }
}
