use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use sdav_core::config::ConfigStore;
use sdav_core::settings::Settings;
use sdav_core::topology::{self, Environment, GroupSpec, Topology};
use sdav_core::{Provisioner, VmTarget};
use sdav_vagrant::Vagrant;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const CHECKER_BIN: &str = "sdav-check-manager";

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
    Destroy,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerGroup {
    #[value(name = "core_pr")]
    CorePr,
    #[value(name = "core_de")]
    CoreDe,
    Fwd,
    Hf,
    Lb,
    All,
}

impl ServerGroup {
    /// Topology groups making up this server group, in start order.
    fn members(&self) -> &'static [&'static str] {
        match self {
            ServerGroup::CorePr => &["pr_idx", "pr_sh"],
            ServerGroup::CoreDe => &["de_sh", "de_idx"],
            ServerGroup::Fwd => &["fwd"],
            ServerGroup::Hf => &["hf"],
            ServerGroup::Lb => &["lb"],
            ServerGroup::All => &[],
        }
    }

    fn needs_manager(&self) -> bool {
        matches!(self, ServerGroup::CorePr | ServerGroup::CoreDe)
    }
}

/// Groups before `all` run first, then every group. Anything after `all`
/// is ignored.
fn expand(groups: &[ServerGroup]) -> Vec<ServerGroup> {
    match groups.iter().position(|g| *g == ServerGroup::All) {
        Some(at) => {
            let mut expanded = groups[..at].to_vec();
            expanded.extend([
                ServerGroup::CoreDe,
                ServerGroup::CorePr,
                ServerGroup::Lb,
                ServerGroup::Hf,
                ServerGroup::Fwd,
            ]);
            expanded
        }
        None => groups.to_vec(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Lifecycle(Action, VmTarget),
    StartSplunk(VmTarget, &'static str),
    AwaitManager,
}

fn target(group: &GroupSpec, name: String) -> VmTarget {
    VmTarget { name, dir: group.dir.to_string() }
}

/// Machines of a topology group. Multi-instance groups get one machine per
/// configured ip; the others are a single machine named after the group.
fn machines(spec: &GroupSpec, topology: &Topology) -> Vec<VmTarget> {
    let multi =
        spec.environment == Environment::Production || topology::group_type(spec.name) == "fwd";
    if !multi {
        return vec![target(spec, spec.name.to_string())];
    }

    topology
        .group(spec.name)
        .map(|g| g.ips.as_slice())
        .unwrap_or_default()
        .iter()
        .map(|ip| target(spec, topology::vm_name(spec.name, spec.environment, ip)))
        .collect()
}

fn lifecycle_steps(action: Action, spec: &GroupSpec, vm: VmTarget) -> Vec<Step> {
    let mut steps = vec![Step::Lifecycle(action, vm.clone())];
    if action == Action::Start {
        if let Some(home) = spec.edition.splunk_home() {
            steps.push(Step::StartSplunk(vm, home));
        }
    }
    steps
}

/// Ordered steps for `action` over `groups`.
///
/// Core groups act on the manager first. When starting, the manager must
/// pass the readiness gate before any of its dependents is started.
fn plan(action: Action, groups: &[ServerGroup], topology: &Topology) -> Result<Vec<Step>> {
    let mut steps = Vec::new();

    for group in expand(groups) {
        if group.needs_manager() {
            let manager = GroupSpec::find("manager").context("manager missing from catalog")?;
            let vm = target(manager, manager.name.to_string());
            steps.extend(lifecycle_steps(action, manager, vm));
            if action == Action::Start {
                steps.push(Step::AwaitManager);
            }
        }

        for name in group.members() {
            let spec = GroupSpec::find(name)
                .with_context(|| format!("{} missing from catalog", name))?;
            for vm in machines(spec, topology) {
                steps.extend(lifecycle_steps(action, spec, vm));
            }
        }
    }

    Ok(steps)
}

fn execute(
    steps: &[Step],
    provisioner: &dyn Provisioner,
    await_manager: &dyn Fn() -> Result<()>,
) -> Result<()> {
    for step in steps {
        match step {
            Step::Lifecycle(action, vm) => {
                tracing::info!(vm = %vm.name, ?action, "vagrant");
                match action {
                    Action::Start => provisioner.start(vm)?,
                    Action::Stop => provisioner.stop(vm)?,
                    Action::Destroy => provisioner.destroy(vm)?,
                }
            }
            Step::StartSplunk(vm, home) => {
                provisioner.run_in_vm(vm, &format!("{}/bin/splunk start", home))?;
            }
            Step::AwaitManager => {
                await_manager()
                    .context("Manager is not available, dependent machines were not started")?;
            }
        }
    }
    Ok(())
}

pub fn handle_manage(
    settings: &Settings,
    settings_path: Option<&Path>,
    action: Action,
    groups: &[ServerGroup],
    dry_run: bool,
) -> Result<()> {
    let topology = ConfigStore::for_project(&settings.project_dir).topology()?;
    let steps = plan(action, groups, &topology)?;

    if dry_run {
        for line in dry_run_commands(&steps, settings)? {
            println!("{}", line);
        }
        return Ok(());
    }

    let vagrant = Vagrant::new(&settings.vagrant.provider, &settings.project_dir);
    execute(&steps, &vagrant, &|| run_checker(settings_path))
}

/// Everything `steps` would run, readiness gate included, in order.
fn dry_run_commands(steps: &[Step], settings: &Settings) -> Result<Vec<String>> {
    let vagrant = Vagrant::dry_run(&settings.vagrant.provider, &settings.project_dir);
    execute(steps, &vagrant, &|| {
        vagrant.record(format!("{} (readiness gate)", CHECKER_BIN));
        Ok(())
    })?;
    Ok(vagrant.recorded())
}

pub fn handle_connect(settings: &Settings, vm: &str) -> Result<()> {
    let spec = GroupSpec::for_vm(vm)?;
    let vagrant = Vagrant::new(&settings.vagrant.provider, &settings.project_dir);
    vagrant.ssh(&target(spec, vm.to_string()))?;
    Ok(())
}

/// The checker ships next to this binary; fall back to `PATH`.
fn checker_path() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(CHECKER_BIN)))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from(CHECKER_BIN))
}

fn run_checker(settings_path: Option<&Path>) -> Result<()> {
    let mut cmd = Command::new(checker_path());
    if let Some(path) = settings_path {
        cmd.arg("--settings").arg(path);
    }

    let status = cmd
        .status()
        .with_context(|| format!("Failed to run {}", CHECKER_BIN))?;
    if !status.success() {
        bail!("{} exited with {:?}", CHECKER_BIN, status.code());
    }
    Ok(())
}
