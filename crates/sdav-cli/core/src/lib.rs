pub mod config;
pub mod error;
pub mod probe;
pub mod settings;
pub mod status;
pub mod topology;

use async_trait::async_trait;
use error::{QueryError, SdavError};

/// Lifecycle operations on the virtual machines of one server group directory.
pub trait Provisioner {
    fn start(&self, target: &VmTarget) -> Result<(), SdavError>;
    fn stop(&self, target: &VmTarget) -> Result<(), SdavError>;
    fn destroy(&self, target: &VmTarget) -> Result<(), SdavError>;
    /// Runs a shell command inside an already running machine.
    fn run_in_vm(&self, target: &VmTarget, command: &str) -> Result<(), SdavError>;
    /// Opens an interactive session on the machine.
    fn ssh(&self, target: &VmTarget) -> Result<(), SdavError>;
}

/// A machine as the provisioning tool sees it: its name and the directory
/// holding the Vagrantfile that defines it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmTarget {
    pub name: String,
    pub dir: String,
}

/// Answers "which version is this node running".
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn server_version(&self, ip: &str) -> Result<String, QueryError>;
}
