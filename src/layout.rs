//! Host paths touched by a provisioning run.

use std::path::{Path, PathBuf};

/// Every host path the reconciler writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Service account home
    pub home: PathBuf,
    /// Application checkout
    pub checkout: PathBuf,
    /// Rendered configuration document
    pub config_file: PathBuf,
    /// nginx site definition
    pub nginx_available: PathBuf,
    /// nginx enabled-site symlink
    pub nginx_enabled: PathBuf,
    /// systemd unit
    pub unit_file: PathBuf,
}

impl Layout {
    /// Standard Debian locations for the given home directory.
    pub fn new(home: impl AsRef<Path>) -> Self {
        Self::with_root(Path::new("/"), home)
    }

    /// Same layout with the system directories placed under `root`.
    ///
    /// `home` is taken as-is so tests can point it at a scratch directory.
    pub fn with_root(root: &Path, home: impl AsRef<Path>) -> Self {
        let home = home.as_ref().to_path_buf();
        let checkout = home.join("peertube");
        let config_file = checkout.join("config").join("production.yaml");

        Self {
            nginx_available: root.join("etc/nginx/sites-available/peertube"),
            nginx_enabled: root.join("etc/nginx/sites-enabled/peertube"),
            unit_file: root.join("etc/systemd/system/peertube.service"),
            home,
            checkout,
            config_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let layout = Layout::new("/var/www");
        assert_eq!(layout.checkout, PathBuf::from("/var/www/peertube"));
        assert_eq!(
            layout.config_file,
            PathBuf::from("/var/www/peertube/config/production.yaml")
        );
        assert_eq!(
            layout.nginx_enabled,
            PathBuf::from("/etc/nginx/sites-enabled/peertube")
        );
        assert_eq!(
            layout.unit_file,
            PathBuf::from("/etc/systemd/system/peertube.service")
        );
    }

    #[test]
    fn test_rooted_layout() {
        let layout = Layout::with_root(Path::new("/tmp/host"), "/tmp/host/home");
        assert_eq!(
            layout.nginx_available,
            PathBuf::from("/tmp/host/etc/nginx/sites-available/peertube")
        );
        assert_eq!(layout.checkout, PathBuf::from("/tmp/host/home/peertube"));
    }
}
