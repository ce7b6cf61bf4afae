use serde::Serialize;
use serde_json::Value;

use crate::error::SdavError;

pub const BASE_IP: &str = "192.168.56.";

const SPLUNK_ENTERPRISE_DIR: &str = "src/s14e";
const UNIVERSAL_FORWARDER_DIR: &str = "src/u16f";
const LOAD_BALANCER_DIR: &str = "src/l10r";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Environment {
    #[serde(rename = "")]
    None,
    #[serde(rename = "PR")]
    Production,
    #[serde(rename = "DE")]
    Development,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::None => "",
            Environment::Production => "PR",
            Environment::Development => "DE",
        }
    }
}

/// Which Splunk package a machine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edition {
    Enterprise,
    UniversalForwarder,
    None,
}

impl Edition {
    /// Install prefix inside the machine, `None` when nothing is installed.
    pub fn splunk_home(&self) -> Option<&'static str> {
        match self {
            Edition::Enterprise => Some("/usr/local/splunk"),
            Edition::UniversalForwarder => Some("/usr/local/splunkforwarder"),
            Edition::None => None,
        }
    }
}

/// How a node's web interface address is built from its ip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebUrl {
    Port(u16),
    Bare,
    None,
}

impl WebUrl {
    pub fn for_ip(&self, ip: &str) -> String {
        match self {
            WebUrl::Port(port) => format!("http://{}:{}", ip, port),
            WebUrl::Bare => format!("http://{}", ip),
            WebUrl::None => String::new(),
        }
    }
}

/// Static description of a known server group.
#[derive(Debug, Clone, Copy)]
pub struct GroupSpec {
    pub name: &'static str,
    pub environment: Environment,
    pub web: WebUrl,
    pub dir: &'static str,
    pub edition: Edition,
}

/// Known groups, in the order `info vms` lists them.
pub static CATALOG: [GroupSpec; 8] = [
    GroupSpec {
        name: "pr_idx",
        environment: Environment::Production,
        web: WebUrl::Port(8000),
        dir: SPLUNK_ENTERPRISE_DIR,
        edition: Edition::Enterprise,
    },
    GroupSpec {
        name: "pr_sh",
        environment: Environment::Production,
        web: WebUrl::Port(8000),
        dir: SPLUNK_ENTERPRISE_DIR,
        edition: Edition::Enterprise,
    },
    GroupSpec {
        name: "manager",
        environment: Environment::None,
        web: WebUrl::Port(8000),
        dir: SPLUNK_ENTERPRISE_DIR,
        edition: Edition::Enterprise,
    },
    GroupSpec {
        name: "de_sh",
        environment: Environment::Development,
        web: WebUrl::Port(8000),
        dir: SPLUNK_ENTERPRISE_DIR,
        edition: Edition::Enterprise,
    },
    GroupSpec {
        name: "de_idx",
        environment: Environment::Development,
        web: WebUrl::Port(8000),
        dir: SPLUNK_ENTERPRISE_DIR,
        edition: Edition::Enterprise,
    },
    GroupSpec {
        name: "lb",
        environment: Environment::None,
        web: WebUrl::Bare,
        dir: LOAD_BALANCER_DIR,
        edition: Edition::None,
    },
    GroupSpec {
        name: "fwd",
        environment: Environment::None,
        web: WebUrl::None,
        dir: UNIVERSAL_FORWARDER_DIR,
        edition: Edition::UniversalForwarder,
    },
    GroupSpec {
        name: "hf",
        environment: Environment::None,
        web: WebUrl::None,
        dir: SPLUNK_ENTERPRISE_DIR,
        edition: Edition::Enterprise,
    },
];

impl GroupSpec {
    pub fn find(name: &str) -> Option<&'static GroupSpec> {
        CATALOG.iter().find(|spec| spec.name == name)
    }

    /// Resolve the group a machine belongs to from its name (`pr_idx3` -> `pr_idx`).
    pub fn for_vm(vm_name: &str) -> Result<&'static GroupSpec, SdavError> {
        let group: String = vm_name.chars().filter(|c| !c.is_ascii_digit()).collect();
        GroupSpec::find(&group).ok_or_else(|| SdavError::UnknownVm(vm_name.to_string()))
    }
}

/// Group name with its environment prefix stripped.
pub fn group_type(group: &str) -> &str {
    group
        .strip_prefix("pr_")
        .or_else(|| group.strip_prefix("de_"))
        .unwrap_or(group)
}

/// Human label for a group type, as shown in the `Type` column.
pub fn type_label(group_type: &str) -> &str {
    match group_type {
        "idx" => "IDX",
        "sh" => "SH",
        "fwd" => "UF",
        "hf" => "HF",
        "lb" => "PR SH LB",
        "manager" => "Manager",
        other => other,
    }
}

/// Name of the virtual machine hosting `ip` in `group`.
///
/// Production and forwarder groups hold several machines, suffixed with the
/// last character of their ip. Every other group is a single machine named
/// after the group.
pub fn vm_name(group: &str, environment: Environment, ip: &str) -> String {
    if environment == Environment::Production || group_type(group) == "fwd" {
        match ip.chars().last() {
            Some(last) => format!("{}{}", group, last),
            None => group.to_string(),
        }
    } else {
        group.to_string()
    }
}

/// Third-octet digit used for each scalable group type.
fn ip_range(group_type: &str) -> Option<u8> {
    match group_type {
        "idx" => Some(2),
        "sh" => Some(1),
        "fwd" => Some(3),
        _ => None,
    }
}

/// Addresses for `count` instances of a scalable group.
pub fn instance_ips(group: &str, count: usize) -> Result<Vec<String>, SdavError> {
    let range = ip_range(group_type(group))
        .ok_or_else(|| SdavError::UnknownGroup(group.to_string()))?;
    Ok((1..=count).map(|n| format!("{}{}{}", BASE_IP, range, n)).collect())
}

/// Indexer site split: the first half lands on `site1`, the rest on `site2`.
pub fn site_assignment(count: usize) -> Vec<String> {
    let middle = count / 2;
    (1..=count)
        .map(|n| if n <= middle { "site1" } else { "site2" }.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub ips: Vec<String>,
    pub sites: Option<Vec<String>>,
    pub environment: Environment,
    pub web: WebUrl,
}

impl Group {
    pub fn new(name: impl Into<String>, environment: Environment, ips: Vec<String>) -> Self {
        Group {
            name: name.into(),
            ips,
            sites: None,
            environment,
            web: WebUrl::None,
        }
    }

    pub fn with_web(mut self, web: WebUrl) -> Self {
        self.web = web;
        self
    }
}

/// Ordered mapping of group name to its nodes. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    groups: Vec<Group>,
}

impl Topology {
    pub fn new() -> Self {
        Topology::default()
    }

    /// Append a group. Group names are unique.
    pub fn push(&mut self, group: Group) -> Result<(), SdavError> {
        if self.group(&group.name).is_some() {
            return Err(SdavError::Config(format!("group '{}' defined twice", group.name)));
        }
        self.groups.push(group);
        Ok(())
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Every `(group, ip)` pair, groups in insertion order then ips in list order.
    pub fn nodes(&self) -> impl Iterator<Item = (&Group, &str)> {
        self.groups
            .iter()
            .flat_map(|group| group.ips.iter().map(move |ip| (group, ip.as_str())))
    }

    pub fn node_count(&self) -> usize {
        self.groups.iter().map(|g| g.ips.len()).sum()
    }

    /// Build the topology of every catalogued group from a config document.
    /// Groups absent from the document are kept with no nodes.
    pub fn from_config(doc: &Value) -> Result<Self, SdavError> {
        let mut topology = Topology::new();
        for spec in CATALOG.iter() {
            let nodes = doc.get(spec.name).and_then(|g| g.get("nodes"));
            let ips = match nodes.and_then(|n| n.get("ips")) {
                Some(value) => string_list(value, spec.name, "ips")?,
                None => Vec::new(),
            };
            let sites = match nodes.and_then(|n| n.get("sites")) {
                Some(value) => Some(string_list(value, spec.name, "sites")?),
                None => None,
            };

            let mut group = Group::new(spec.name, spec.environment, ips).with_web(spec.web);
            group.sites = sites;
            topology.push(group)?;
        }
        Ok(topology)
    }
}

fn string_list(value: &Value, group: &str, field: &str) -> Result<Vec<String>, SdavError> {
    let items = value
        .as_array()
        .ok_or_else(|| SdavError::Config(format!("{}.nodes.{} must be a list", group, field)))?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                SdavError::Config(format!("{}.nodes.{} must only hold strings", group, field))
            })
        })
        .collect()
}
