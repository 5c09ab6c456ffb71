//! Options to configuration document.
//!
//! [`render`] is pure apart from the instance secret, which is drawn fresh
//! from the OS on every call.

use rand::RngCore;
use rand::rngs::OsRng;

use crate::document::{
    Admin, Database, Document, Instance, Log, Redis, ResolutionFlags, Secrets, Signup, Smtp,
    Transcoding, Webserver,
};
use crate::error::ConfigError;
use crate::options::{Options, port};

const SECRET_BYTES: usize = 32;

/// A fresh hex-encoded instance secret.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Render the document with a freshly generated secret.
pub fn render(options: &Options) -> Result<Document, ConfigError> {
    render_with_secret(options, generate_secret())
}

/// Render the document around a given secret.
pub fn render_with_secret(options: &Options, secret: String) -> Result<Document, ConfigError> {
    let web_port = options.web_port()?;
    let db_port = port("PT_DB_PORT", options.database.port)?;
    let smtp_port = port("PT_SMTP_PORT", options.smtp.port)?;

    let domain = options.domain.trim();
    if domain.is_empty() {
        return Err(ConfigError::invalid(
            "PT_DOMAIN",
            domain,
            "domain must be resolved before rendering",
        ));
    }

    let from_address = if options.smtp.from_address.is_empty() {
        format!("PeerTube <no-reply@{domain}>")
    } else {
        options.smtp.from_address.clone()
    };

    Ok(Document {
        webserver: Webserver {
            https: options.https,
            hostname: domain.to_string(),
            port: web_port,
        },
        secrets: Secrets { peertube: secret },
        database: Database {
            hostname: options.database.host.clone(),
            port: db_port,
            ssl: options.database.ssl,
            username: options.database.user.clone(),
            password: options.database.password.clone(),
            name: options.database.name.clone(),
        },
        redis: Redis {
            hostname: "127.0.0.1".to_string(),
            port: 6379,
        },
        smtp: Smtp {
            transport: "smtp".to_string(),
            hostname: non_blank(&options.smtp.host),
            port: smtp_port,
            username: non_blank(&options.smtp.user),
            password: non_blank(&options.smtp.password),
            tls: options.smtp.tls,
            disable_starttls: options.smtp.disable_starttls,
            from_address,
        },
        signup: Signup {
            enabled: options.signup.enabled,
            requires_approval: options.signup.requires_approval,
            requires_email_verification: options.signup.requires_email_verification,
        },
        admin: Admin {
            email: options.admin_contact(),
        },
        instance: Instance {
            name: options.instance.name.clone(),
            description: options.instance.description.clone(),
            languages: options.instance.languages.clone(),
        },
        transcoding: Transcoding {
            enabled: true,
            keep_original_file: options.encoding.keep_original,
            resolutions: ResolutionFlags::from_labels(options.encoding.resolutions.as_slice()),
        },
        log: Log {
            level: options.log_level.clone(),
        },
    })
}

fn non_blank(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Resolution;

    fn options() -> Options {
        Options::default().with_domain("video.example.org")
    }

    #[test]
    fn test_render_defaults() {
        let doc = render(&options()).unwrap();

        assert_eq!(doc.webserver.hostname, "video.example.org");
        assert_eq!(doc.webserver.port, 9000);
        assert!(!doc.webserver.https);
        assert_eq!(doc.database.port, 5432);
        assert_eq!(doc.smtp.hostname, None);
        assert_eq!(doc.smtp.username, None);
        assert_eq!(doc.smtp.from_address, "PeerTube <no-reply@video.example.org>");
        assert_eq!(doc.admin.email, "admin@video.example.org");
        assert_eq!(
            doc.transcoding.resolutions.enabled(),
            &[Resolution::R720, Resolution::R1080]
        );
    }

    #[test]
    fn test_render_is_deterministic_apart_from_secret() {
        let first = render(&options()).unwrap();
        let second = render(&options()).unwrap();
        assert_ne!(first.secrets, second.secrets);

        let a = render_with_secret(&options(), "s".into()).unwrap();
        let b = render_with_secret(&options(), "s".into()).unwrap();
        assert_eq!(a.to_yaml().unwrap(), b.to_yaml().unwrap());
    }

    #[test]
    fn test_secret_is_64_hex_chars() {
        let secret = render(&options()).unwrap().secrets.peertube;
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_sender_follows_detected_address() {
        let doc = render(&Options::default().with_domain("10.0.0.5")).unwrap();
        assert!(doc.smtp.from_address.contains("no-reply@10.0.0.5"));
    }

    #[test]
    fn test_explicit_sender_kept() {
        let mut opts = options();
        opts.smtp.from_address = "Videos <videos@example.org>".to_string();
        opts.smtp.host = "mail.example.org".to_string();

        let doc = render(&opts).unwrap();
        assert_eq!(doc.smtp.from_address, "Videos <videos@example.org>");
        assert_eq!(doc.smtp.hostname.as_deref(), Some("mail.example.org"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut opts = options();
        opts.web_port = 0;
        assert!(matches!(
            render(&opts),
            Err(ConfigError::Invalid {
                field: "PT_WEB_PORT",
                ..
            })
        ));

        let mut opts = options();
        opts.smtp.port = 65_536;
        assert!(matches!(
            render(&opts),
            Err(ConfigError::Invalid {
                field: "PT_SMTP_PORT",
                ..
            })
        ));
    }

    #[test]
    fn test_empty_domain_rejected() {
        assert!(matches!(
            render(&Options::default()),
            Err(ConfigError::Invalid {
                field: "PT_DOMAIN",
                ..
            })
        ));
    }

    #[test]
    fn test_yaml_sections() {
        let yaml = render_with_secret(&options(), "abc".into())
            .unwrap()
            .to_yaml()
            .unwrap();

        assert!(yaml.starts_with("# Generated by tubestrap"));
        for section in [
            "webserver:",
            "secrets:",
            "database:",
            "redis:",
            "smtp:",
            "signup:",
            "admin:",
            "instance:",
            "transcoding:",
            "log:",
        ] {
            assert!(yaml.contains(&format!("\n{section}")), "missing {section}");
        }
        assert!(yaml.contains("hostname: null"));
        assert!(yaml.contains("2160p: false"));
    }
}
