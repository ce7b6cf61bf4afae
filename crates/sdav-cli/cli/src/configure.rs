use anyhow::Result;
use comfy_table::{Cell, Table};
use sdav_core::config::ConfigStore;
use sdav_core::error::SdavError;
use sdav_core::settings::Settings;
use sdav_core::topology::{self, Environment, GroupSpec};
use serde_json::{json, Map, Value};

pub fn handle_base_image(settings: &Settings, image: String) -> Result<()> {
    let store = ConfigStore::for_project(&settings.project_dir);

    let mut patch = Map::new();
    patch.insert("base_config".to_string(), json!({ "box": image }));
    store.write(patch)?;

    println!("\nBase image configured to {}\n", image);
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Change {
    Added(Vec<String>),
    ScaledDown,
    Unchanged,
}

/// New node list for `group` and how it differs from the previous one.
#[derive(Debug)]
struct InstancePlan {
    nodes: Value,
    change: Change,
}

fn plan_instances(group: &str, count: usize, previous: &[String]) -> Result<InstancePlan> {
    let ips = topology::instance_ips(group, count)?;

    let mut nodes = json!({ "ips": &ips });
    if group == "pr_idx" {
        nodes["sites"] = json!(topology::site_assignment(count));
    }

    let change = if ips.len() > previous.len() {
        Change::Added(ips.into_iter().filter(|ip| !previous.contains(ip)).collect())
    } else if ips.len() < previous.len() {
        Change::ScaledDown
    } else {
        Change::Unchanged
    };

    Ok(InstancePlan { nodes, change })
}

pub fn handle_instances(settings: &Settings, group: &str, count: usize) -> Result<()> {
    let spec = GroupSpec::find(group).ok_or_else(|| SdavError::UnknownGroup(group.to_string()))?;
    let store = ConfigStore::for_project(&settings.project_dir);

    let previous = store
        .topology()?
        .group(group)
        .map(|g| g.ips.clone())
        .unwrap_or_default();

    let plan = plan_instances(group, count, &previous)?;
    let mut patch = Map::new();
    patch.insert(group.to_string(), json!({ "nodes": plan.nodes }));
    store.write(patch)?;
    tracing::debug!(group, count, "instances configured");

    let mut description = topology::type_label(topology::group_type(group)).to_string();
    if spec.environment == Environment::Production {
        description = format!("Production {}", description);
    }

    match plan.change {
        Change::Added(new_ips) => {
            let mut table = Table::new();
            table.set_header(vec!["IP", "VM Name"]);
            for ip in &new_ips {
                table.add_row(vec![
                    Cell::new(ip),
                    Cell::new(topology::vm_name(group, spec.environment, ip)),
                ]);
            }
            println!("\nNew instances added to configuration:\n");
            println!("{}\n", table);
        }
        Change::ScaledDown => println!("\n{} instances scaled down\n", description),
        Change::Unchanged => println!("\n{} instances already configured.\n", description),
    }

    Ok(())
}
