use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use sdav_core::config::ConfigStore;
use sdav_core::settings::Settings;
use sdav_core::status::{FleetStatusAggregator, NodeStatusRecord};
use sdav_splunk::ManagementClient;

use crate::spinner;

pub fn handle_vms(settings: &Settings, as_json: bool) -> Result<()> {
    let spinner = spinner::create_spinner();

    spinner.set_message("Reading configuration...");
    let topology = ConfigStore::for_project(&settings.project_dir).topology()?;

    spinner.set_message(format!("Querying {} virtual machines...", topology.node_count()));
    let client = ManagementClient::new(&settings.management)?;
    let aggregator = FleetStatusAggregator::new(Box::new(client))
        .with_concurrency(settings.management.concurrency);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let records = runtime.block_on(aggregator.collect(&topology));
    spinner.finish_and_clear();

    if as_json {
        let value = serde_json::to_value(&records)?;
        println!("{}", colored_json::to_colored_json_auto(&value)?);
    } else {
        println!("{}", render_table(&records));
    }
    Ok(())
}

fn render_table(records: &[NodeStatusRecord]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["IP", "VM Name", "Type", "Env", "Web", "SPL Version"]);

    for record in records {
        table.add_row(vec![
            Cell::new(&record.ip),
            Cell::new(&record.vm_name),
            Cell::new(&record.type_label),
            Cell::new(record.environment.as_str()),
            Cell::new(&record.web_url),
            Cell::new(&record.version),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdav_core::topology::Environment;

    #[test]
    fn table_has_one_row_per_record_in_order() {
        let records = vec![
            NodeStatusRecord {
                ip: "192.168.56.10".to_string(),
                vm_name: "manager".to_string(),
                type_label: "Manager".to_string(),
                environment: Environment::None,
                web_url: "http://192.168.56.10:8000".to_string(),
                version: "9.1.0".to_string(),
            },
            NodeStatusRecord {
                ip: "192.168.56.21".to_string(),
                vm_name: "pr_idx1".to_string(),
                type_label: "IDX".to_string(),
                environment: Environment::Production,
                web_url: "http://192.168.56.21:8000".to_string(),
                version: "The server is down".to_string(),
            },
        ];

        let table = render_table(&records);
        assert_eq!(table.row_iter().count(), 2);

        let rendered = table.to_string();
        let manager = rendered.find("manager").unwrap();
        let indexer = rendered.find("pr_idx1").unwrap();
        assert!(manager < indexer);
        assert!(rendered.contains("The server is down"));
        assert!(rendered.contains("SPL Version"));
    }

    #[test]
    fn records_serialize_with_short_column_names() {
        let record = NodeStatusRecord {
            ip: "192.168.56.31".to_string(),
            vm_name: "fwd1".to_string(),
            type_label: "UF".to_string(),
            environment: Environment::None,
            web_url: String::new(),
            version: "Can't connect to the server".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "UF");
        assert_eq!(value["env"], "");
    }
}
