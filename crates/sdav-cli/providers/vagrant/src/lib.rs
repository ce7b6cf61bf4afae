mod sh;

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use sdav_core::error::SdavError;
use sdav_core::{Provisioner, VmTarget};

/// Provisioner backed by the `vagrant` command line.
pub struct Vagrant {
    provider: String,
    project_dir: PathBuf,
    recorded: Option<RefCell<Vec<String>>>,
}

impl Vagrant {
    pub fn new(provider: impl Into<String>, project_dir: impl Into<PathBuf>) -> Vagrant {
        Vagrant {
            provider: provider.into(),
            project_dir: project_dir.into(),
            recorded: None,
        }
    }

    /// A provisioner that records commands instead of running them.
    pub fn dry_run(provider: impl Into<String>, project_dir: impl Into<PathBuf>) -> Vagrant {
        Vagrant {
            recorded: Some(RefCell::new(Vec::new())),
            ..Vagrant::new(provider, project_dir)
        }
    }

    /// Commands issued so far in dry-run mode.
    pub fn recorded(&self) -> Vec<String> {
        self.recorded
            .as_ref()
            .map(|r| r.borrow().clone())
            .unwrap_or_default()
    }

    /// Append a line to the dry-run record, keeping it in order with the
    /// commands. Does nothing when commands actually run.
    pub fn record(&self, line: impl Into<String>) {
        if let Some(recorded) = &self.recorded {
            recorded.borrow_mut().push(line.into());
        }
    }

    fn vagrantfile_dir(&self, target: &VmTarget) -> PathBuf {
        self.project_dir.join(&target.dir)
    }

    pub fn lifecycle_command(&self, action: &str, target: &VmTarget) -> String {
        format!(
            "cd {} && vagrant --provider={} {} {}",
            shell_path(&self.vagrantfile_dir(target)),
            self.provider,
            action,
            target.name
        )
    }

    pub fn remote_command(&self, target: &VmTarget, command: &str) -> String {
        format!(
            "cd {} && vagrant ssh -c '{}' {}",
            shell_path(&self.vagrantfile_dir(target)),
            command.replace('\'', r"'\''"),
            target.name
        )
    }

    pub fn ssh_command(&self, target: &VmTarget) -> String {
        format!("cd {} && vagrant ssh {}", shell_path(&self.vagrantfile_dir(target)), target.name)
    }

    fn execute(&self, cmd: String) -> Result<(), SdavError> {
        match &self.recorded {
            Some(recorded) => {
                tracing::info!(command = %cmd, "dry run");
                recorded.borrow_mut().push(cmd);
                Ok(())
            }
            None => sh::run(&cmd),
        }
    }
}

impl Provisioner for Vagrant {
    fn start(&self, target: &VmTarget) -> Result<(), SdavError> {
        self.execute(self.lifecycle_command("up", target))
    }

    fn stop(&self, target: &VmTarget) -> Result<(), SdavError> {
        self.execute(self.lifecycle_command("halt", target))
    }

    fn destroy(&self, target: &VmTarget) -> Result<(), SdavError> {
        self.execute(self.lifecycle_command("destroy", target))
    }

    fn run_in_vm(&self, target: &VmTarget, command: &str) -> Result<(), SdavError> {
        self.execute(self.remote_command(target, command))
    }

    fn ssh(&self, target: &VmTarget) -> Result<(), SdavError> {
        self.execute(self.ssh_command(target))
    }
}

fn shell_path(path: &Path) -> String {
    let raw = path.display().to_string();
    if raw.chars().all(|c| c.is_ascii_alphanumeric() || "/._-".contains(c)) {
        raw
    } else {
        format!("'{}'", raw.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> VmTarget {
        VmTarget { name: "manager".to_string(), dir: "src/s14e".to_string() }
    }

    #[test]
    fn lifecycle_commands_select_provider_and_directory() {
        let vagrant = Vagrant::new("virtualbox", ".");
        assert_eq!(
            vagrant.lifecycle_command("up", &manager()),
            "cd ./src/s14e && vagrant --provider=virtualbox up manager"
        );
    }

    #[test]
    fn remote_commands_are_quoted() {
        let vagrant = Vagrant::new("virtualbox", "/lab");
        assert_eq!(
            vagrant.remote_command(&manager(), "/usr/local/splunk/bin/splunk start"),
            "cd /lab/src/s14e && vagrant ssh -c '/usr/local/splunk/bin/splunk start' manager"
        );
        assert_eq!(
            vagrant.remote_command(&manager(), "echo 'hi'"),
            r"cd /lab/src/s14e && vagrant ssh -c 'echo '\''hi'\''' manager"
        );
    }

    #[test]
    fn directories_with_spaces_are_quoted() {
        let vagrant = Vagrant::new("libvirt", "/home/me/my lab");
        assert_eq!(
            vagrant.ssh_command(&manager()),
            "cd '/home/me/my lab/src/s14e' && vagrant ssh manager"
        );
    }

    #[test]
    fn dry_run_records_in_order() {
        let vagrant = Vagrant::dry_run("virtualbox", ".");
        vagrant.stop(&manager()).unwrap();
        vagrant.destroy(&manager()).unwrap();

        assert_eq!(
            vagrant.recorded(),
            vec![
                "cd ./src/s14e && vagrant --provider=virtualbox halt manager",
                "cd ./src/s14e && vagrant --provider=virtualbox destroy manager",
            ]
        );
    }

    #[test]
    fn notes_interleave_with_commands() {
        let vagrant = Vagrant::dry_run("virtualbox", ".");
        vagrant.start(&manager()).unwrap();
        vagrant.record("wait");
        vagrant.stop(&manager()).unwrap();

        let recorded = vagrant.recorded();
        assert_eq!(recorded.len(), 3);
        assert_eq!(recorded[1], "wait");

        let live = Vagrant::new("virtualbox", ".");
        live.record("ignored");
        assert!(live.recorded().is_empty());
    }
}
