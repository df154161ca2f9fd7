use std::io::IsTerminal;
use std::path::Path;

use log::info;

use crate::config::schema::Config;
use crate::config::setup;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Loads the config file, asking the operator for the connection settings first
/// when the file does not exist yet.
pub fn load_or_setup<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if path.exists() {
        return load_config(path);
    }

    if !std::io::stdin().is_terminal() {
        return Err(ConfigError::NotInteractive(path.to_path_buf()));
    }

    println!("Configuration file not found. Let's set it up.");
    let config = setup::prompt_config()?;
    validate_config(&config)?;
    save_config(path, &config)?;
    info!("Configuration saved to {}", path.display());

    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let content = toml::to_string_pretty(config)?;

    let write_err = |e: std::io::Error| ConfigError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    };

    std::fs::write(path, content).map_err(write_err)?;

    // The file may hold the mailbox password.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .map_err(write_err)?;
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.imap.server.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "imap.server must not be empty".to_string(),
        });
    }

    if config.imap.port == 0 {
        return Err(ConfigError::Validation {
            message: "imap.port must be between 1 and 65535".to_string(),
        });
    }

    if config.imap.email.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "imap.email must not be empty".to_string(),
        });
    }

    if config.imap.mailbox.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "imap.mailbox must not be empty".to_string(),
        });
    }

    if config.imap.connect_timeout_secs == 0 || config.imap.command_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "imap timeouts must be at least one second".to_string(),
        });
    }

    if config.poll.interval_secs == 0 {
        return Err(ConfigError::Validation {
            message: "poll.interval_secs must be at least one second".to_string(),
        });
    }

    if config.presenter.program.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "presenter.program must not be empty".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::PollMode;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let config_toml = r#"
            [imap]
            server = "imap.example.com"
            email = "frame@example.com"
            password = "hunter2"
        "#;

        let config = load_config_from_str(config_toml).unwrap();
        assert_eq!(config.imap.server, "imap.example.com");
        assert_eq!(config.imap.port, 993);
        assert!(config.imap.tls);
        assert_eq!(config.imap.mailbox, "INBOX");
        assert_eq!(config.imap.search, "ALL");
        assert_eq!(config.poll.interval_secs, 30);
        assert_eq!(config.poll.mode, PollMode::Replay);
        assert_eq!(config.attachments.directory, Path::new("attachments"));
        assert_eq!(config.presenter.program, "sudo");
        assert_eq!(config.presenter.display_secs, 1);
        assert!(config.presenter.args.contains(&"{path}".to_string()));
    }

    #[test]
    fn test_load_full_config() {
        let config_toml = r#"
            [imap]
            server = "mail.local"
            port = 143
            email = "frame@mail.local"
            password_env_var = "FRAME_PASSWORD"
            tls = false
            mailbox = "Photos"
            command_timeout_secs = 5

            [poll]
            interval_secs = 120
            mode = "new-only"

            [attachments]
            directory = "/var/lib/raio"

            [presenter]
            program = "feh"
            args = ["--fullscreen", "{path}"]
            display_secs = 4
        "#;

        let config = load_config_from_str(config_toml).unwrap();
        assert_eq!(config.imap.port, 143);
        assert!(!config.imap.tls);
        assert_eq!(config.imap.password_env_var.as_deref(), Some("FRAME_PASSWORD"));
        assert_eq!(config.imap.command_timeout().as_secs(), 5);
        assert_eq!(config.poll.mode, PollMode::NewOnly);
        assert_eq!(config.poll.interval().as_secs(), 120);
        assert_eq!(config.presenter.program, "feh");
        assert_eq!(config.presenter.display_duration().as_secs(), 4);
    }

    #[test]
    fn test_missing_imap_section_is_rejected() {
        let result = load_config_from_str("[poll]\ninterval_secs = 10\n");
        assert!(matches!(result, Err(ConfigError::ParseToml(_))));
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            r#"[imap]
               server = ""
               email = "a@b.c""#,
            r#"[imap]
               server = "s"
               port = 0
               email = "a@b.c""#,
            r#"[imap]
               server = "s"
               email = "a@b.c"
               [poll]
               interval_secs = 0"#,
            r#"[imap]
               server = "s"
               email = "a@b.c"
               [presenter]
               program = " ""#,
        ];

        for case in cases {
            let result = load_config_from_str(case);
            assert!(
                matches!(result, Err(ConfigError::Validation { .. })),
                "expected validation error for {case}"
            );
        }
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = load_config_from_str(
            r#"
            [imap]
            server = "imap.example.com"
            email = "frame@example.com"
            password = "secret"
            "#,
        )
        .unwrap();

        save_config(&path, &config).unwrap();
        let reloaded = load_config(&path).unwrap();
        assert_eq!(reloaded.imap.server, "imap.example.com");
        assert_eq!(reloaded.imap.password.as_deref(), Some("secret"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/raio/config.toml");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
