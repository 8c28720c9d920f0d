//! Live adapters for real external interactions.

pub mod ldap;
pub mod proxmox;

pub use ldap::LdapDirectory;
pub use proxmox::ProxmoxBackend;
