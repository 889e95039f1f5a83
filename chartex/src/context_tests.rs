use super::*;
use std::io::Write;

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_verbosity_from_count() {
    assert_eq!(VerbosityLevel::from_count(0), VerbosityLevel::Normal);
    assert_eq!(VerbosityLevel::from_count(1), VerbosityLevel::Verbose);
    assert_eq!(VerbosityLevel::from_count(2), VerbosityLevel::VeryVerbose);
    assert_eq!(VerbosityLevel::from_count(7), VerbosityLevel::Trace);
    assert_eq!(VerbosityLevel::Normal.filter_directive(), "warn");
    assert_eq!(VerbosityLevel::VeryVerbose.filter_directive(), "debug");
}

#[test]
fn test_defaults_without_flags() {
    let ctx = AppContext::from_config(Config::default(), &GlobalArgs::default()).unwrap();

    assert_eq!(ctx.config, Config::default());
    assert_eq!(ctx.format, OutputFormat::Pretty);
    assert_eq!(ctx.verbosity, VerbosityLevel::Normal);
}

#[test]
fn test_config_file_is_loaded() {
    let file = config_file("network:\n  timeout: 5\nregistry:\n  plain_http: true\n");
    let args = GlobalArgs {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };

    let ctx = AppContext::build(&args).unwrap();
    assert_eq!(ctx.config.network.timeout, 5);
    assert!(ctx.config.registry.plain_http);
}

#[test]
fn test_missing_explicit_config_file_fails() {
    let args = GlobalArgs {
        config: Some(PathBuf::from("/nonexistent/chartex/config.yaml")),
        ..Default::default()
    };

    assert!(AppContext::build(&args).is_err());
}

#[test]
fn test_cli_flags_override_config_file() {
    let file = config_file("tls:\n  ca_file: /etc/file-ca.pem\nauth:\n  username: file-user\n  password_file: /etc/file-pass\n");
    let args = GlobalArgs {
        config: Some(file.path().to_path_buf()),
        username: Some("cli-user".to_string()),
        password_file: Some(PathBuf::from("/tmp/cli-pass")),
        tls_ca: Some(PathBuf::from("/tmp/cli-ca.pem")),
        tls_insecure_skip_verify: true,
        pass_credentials_all: true,
        format: OutputFormat::Json,
        verbose: 2,
        ..Default::default()
    };

    let ctx = AppContext::build(&args).unwrap();
    assert_eq!(ctx.config.auth.username.as_deref(), Some("cli-user"));
    assert_eq!(ctx.config.auth.password_file.as_deref(), Some("/tmp/cli-pass"));
    assert_eq!(ctx.config.tls.ca_file.as_deref(), Some("/tmp/cli-ca.pem"));
    assert!(ctx.config.tls.insecure_skip_verify);
    assert!(ctx.config.tls.pass_credentials_all);
    assert_eq!(ctx.format, OutputFormat::Json);
    assert_eq!(ctx.verbosity, VerbosityLevel::VeryVerbose);
}

#[test]
fn test_username_requires_password_file() {
    let args = GlobalArgs {
        username: Some("user".to_string()),
        ..Default::default()
    };

    let err = AppContext::from_config(Config::default(), &args).unwrap_err();
    assert!(err.contains("password_file"));
}

#[test]
fn test_tls_key_requires_cert() {
    let args = GlobalArgs {
        tls_key: Some(PathBuf::from("/tmp/client.key")),
        ..Default::default()
    };

    let err = AppContext::from_config(Config::default(), &args).unwrap_err();
    assert!(err.contains("cert_file"));
}

#[test]
fn test_cli_completes_pair_from_config_file() {
    let mut config = Config::default();
    config.tls.cert_file = Some("/etc/client.pem".to_string());
    config.tls.key_file = Some("/etc/client.key".to_string());

    let args = GlobalArgs {
        tls_key: Some(PathBuf::from("/tmp/other.key")),
        ..Default::default()
    };

    let ctx = AppContext::from_config(config, &args).unwrap();
    assert_eq!(ctx.config.tls.cert_file.as_deref(), Some("/etc/client.pem"));
    assert_eq!(ctx.config.tls.key_file.as_deref(), Some("/tmp/other.key"));
}

#[test]
fn test_default_config_path() {
    if let Some(path) = default_config_path() {
        assert!(path.ends_with("chartex/config.yaml"));
    }
}
