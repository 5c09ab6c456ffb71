//! Reconciliation steps for a PeerTube host.
//!
//! Every step is a [`declarative::Resource`]: it detects the current state
//! through the runner and converges only what differs. Steps up to the
//! configuration file are fatal; the web-facing tail is best-effort.

pub mod account;
pub mod certificate;
pub mod checkout;
pub mod config_file;
pub mod database;
pub mod dependencies;
pub mod firewall;
pub mod packages;
pub mod proxy_site;
pub mod supervisor_unit;

pub use account::ServiceAccount;
pub use certificate::Certificate;
pub use checkout::Checkout;
pub use config_file::ConfigFile;
pub use database::{Database, DatabaseRole};
pub use dependencies::Dependencies;
pub use firewall::Firewall;
pub use packages::PackageSet;
pub use proxy_site::ProxySite;
pub use supervisor_unit::SupervisorUnit;
