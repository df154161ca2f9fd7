//! First-run interactive setup of the mailbox connection.

use std::io::{self, BufRead, Write};

use crate::config::schema::{
    AttachmentsConfig, Config, ImapConfig, PollConfig, PresenterConfig,
};
use crate::error::ConfigError;

/// Asks the operator for the connection settings on stdin.
pub fn prompt_config() -> Result<Config, ConfigError> {
    let stdin = io::stdin();
    let mut input = stdin.lock();

    let server = ask(&mut input, "Enter IMAP server (e.g., imap.example.com): ")?;
    let port = ask(&mut input, "Enter IMAP port (default 993): ")?;
    let email = ask(&mut input, "Enter your email address: ")?;
    let password =
        rpassword::prompt_password("Enter your email password: ").map_err(ConfigError::Prompt)?;

    build_config(&server, &port, &email, password.trim())
}

fn ask(input: &mut impl BufRead, prompt: &str) -> Result<String, ConfigError> {
    print!("{}", prompt);
    io::stdout().flush().map_err(ConfigError::Prompt)?;

    let mut line = String::new();
    input.read_line(&mut line).map_err(ConfigError::Prompt)?;
    Ok(line.trim().to_string())
}

fn build_config(
    server: &str,
    port: &str,
    email: &str,
    password: &str,
) -> Result<Config, ConfigError> {
    let port = if port.is_empty() {
        993
    } else {
        port.parse::<u16>().map_err(|e| ConfigError::Validation {
            message: format!("Invalid IMAP port '{}': {}", port, e),
        })?
    };

    // Port 143 is the cleartext IMAP port.
    let tls = port != 143;

    Ok(Config {
        imap: ImapConfig {
            server: server.to_string(),
            port,
            email: email.to_string(),
            password: Some(password.to_string()).filter(|p| !p.is_empty()),
            password_file: None,
            password_env_var: None,
            tls,
            accept_invalid_certs: false,
            mailbox: "INBOX".to_string(),
            search: "ALL".to_string(),
            connect_timeout_secs: 30,
            command_timeout_secs: 60,
        },
        poll: PollConfig::default(),
        attachments: AttachmentsConfig::default(),
        presenter: PresenterConfig::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_trims_answer() {
        let mut input = io::Cursor::new(b"  imap.example.com \n".to_vec());
        let answer = ask(&mut input, "").unwrap();
        assert_eq!(answer, "imap.example.com");
    }

    #[test]
    fn test_build_config_default_port() {
        let config = build_config("imap.example.com", "", "me@example.com", "pw").unwrap();
        assert_eq!(config.imap.port, 993);
        assert!(config.imap.tls);
        assert_eq!(config.imap.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_build_config_cleartext_port() {
        let config = build_config("mail.local", "143", "me@mail.local", "").unwrap();
        assert_eq!(config.imap.port, 143);
        assert!(!config.imap.tls);
        assert!(config.imap.password.is_none());
    }

    #[test]
    fn test_build_config_bad_port() {
        let result = build_config("mail.local", "imap", "me@mail.local", "pw");
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }
}
