//! Fleet-wide version report.
//!
//! Every node of the topology is queried concurrently. Failures are folded
//! into placeholder strings per node, so the report always holds one record
//! per `(group, ip)` pair, in topology order.

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::StatusSource;
use crate::topology::{self, Environment, Topology};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStatusRecord {
    pub ip: String,
    pub vm_name: String,
    #[serde(rename = "type")]
    pub type_label: String,
    #[serde(rename = "env")]
    pub environment: Environment,
    pub web_url: String,
    pub version: String,
}

pub struct FleetStatusAggregator {
    source: Box<dyn StatusSource>,
    concurrency: Option<usize>,
}

impl FleetStatusAggregator {
    pub fn new(source: Box<dyn StatusSource>) -> Self {
        FleetStatusAggregator { source, concurrency: None }
    }

    /// Cap the number of in-flight queries. `None` queries every node at once.
    pub fn with_concurrency(mut self, limit: Option<usize>) -> Self {
        self.concurrency = limit.filter(|n| *n > 0);
        self
    }

    /// Query every node and wait for all of them before returning.
    pub async fn collect(&self, topology: &Topology) -> Vec<NodeStatusRecord> {
        let queries = topology.nodes().map(|(group, ip)| {
            let mut record = NodeStatusRecord {
                ip: ip.to_string(),
                vm_name: topology::vm_name(&group.name, group.environment, ip),
                type_label: topology::type_label(topology::group_type(&group.name)).to_string(),
                environment: group.environment,
                web_url: group.web.for_ip(ip),
                version: String::new(),
            };
            let source = self.source.as_ref();
            async move {
                record.version = match source.server_version(&record.ip).await {
                    Ok(version) => version,
                    Err(e) => {
                        tracing::debug!(
                            ip = %record.ip,
                            vm = %record.vm_name,
                            "status query failed: {}",
                            e
                        );
                        e.placeholder().to_string()
                    }
                };
                record
            }
        });

        // Both paths yield results in submission order, whatever order the
        // queries finish in.
        match self.concurrency {
            None => join_all(queries).await,
            Some(limit) => stream::iter(queries).buffered(limit).collect().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::topology::{Group, WebUrl};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeSource {
        replies: HashMap<String, (Duration, Result<String, QueryError>)>,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl FakeSource {
        fn reply(mut self, ip: &str, delay_ms: u64, reply: Result<&str, QueryError>) -> Self {
            self.replies.insert(
                ip.to_string(),
                (Duration::from_millis(delay_ms), reply.map(str::to_string)),
            );
            self
        }
    }

    #[async_trait]
    impl StatusSource for FakeSource {
        async fn server_version(&self, ip: &str) -> Result<String, QueryError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let (delay, reply) = self
                .replies
                .get(ip)
                .cloned()
                .unwrap_or((Duration::ZERO, Err(QueryError::ConnectionRefused)));
            tokio::time::sleep(delay).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            reply
        }
    }

    fn group(name: &str, environment: Environment, ips: &[&str], web: WebUrl) -> Group {
        let ips = ips.iter().map(|ip| ip.to_string()).collect();
        Group::new(name, environment, ips).with_web(web)
    }

    fn example_topology() -> Topology {
        let mut topology = Topology::new();
        let manager = group("manager", Environment::None, &["192.168.56.10"], WebUrl::Port(8000));
        topology.push(manager).unwrap();
        let indexers = group(
            "pr_idx",
            Environment::Production,
            &["192.168.56.21", "192.168.56.22"],
            WebUrl::Port(8000),
        );
        topology.push(indexers).unwrap();
        topology
    }

    fn larger_topology() -> Topology {
        let mut topology = example_topology();
        let forwarders = ["192.168.56.31", "192.168.56.32", "192.168.56.33"];
        topology.push(group("fwd", Environment::None, &forwarders, WebUrl::None)).unwrap();
        topology.push(group("lb", Environment::None, &["192.168.56.40"], WebUrl::Bare)).unwrap();
        topology
    }

    fn pairs(topology: &Topology) -> Vec<String> {
        topology.nodes().map(|(_, ip)| ip.to_string()).collect()
    }

    #[tokio::test]
    async fn manager_up_and_indexers_timing_out() {
        let source = FakeSource::default()
            .reply("192.168.56.10", 5, Ok("9.1.0"))
            .reply("192.168.56.21", 1, Err(QueryError::Timeout))
            .reply("192.168.56.22", 1, Err(QueryError::Timeout));

        let aggregator = FleetStatusAggregator::new(Box::new(source));
        let records = aggregator.collect(&example_topology()).await;

        let summary: Vec<(&str, &str, &str)> = records
            .iter()
            .map(|r| (r.ip.as_str(), r.vm_name.as_str(), r.version.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("192.168.56.10", "manager", "9.1.0"),
                ("192.168.56.21", "pr_idx1", "The server is down"),
                ("192.168.56.22", "pr_idx2", "The server is down"),
            ]
        );
        assert_eq!(records[0].type_label, "Manager");
        assert_eq!(records[1].type_label, "IDX");
        assert_eq!(records[1].environment, Environment::Production);
        assert_eq!(records[0].web_url, "http://192.168.56.10:8000");
    }

    #[tokio::test]
    async fn output_order_ignores_completion_order() {
        let topology = larger_topology();
        let ips = pairs(&topology);

        for latencies in [[30u64, 1, 20, 5, 25, 2, 10], [1, 30, 2, 25, 5, 20, 10]] {
            let mut source = FakeSource::default();
            for (ip, delay) in ips.iter().zip(latencies) {
                source = source.reply(ip, delay, Ok("9.1.0"));
            }

            let records = FleetStatusAggregator::new(Box::new(source)).collect(&topology).await;
            let got: Vec<String> = records.into_iter().map(|r| r.ip).collect();
            assert_eq!(got, ips);
        }
    }

    #[tokio::test]
    async fn every_pair_yields_exactly_one_record_despite_failures() {
        let topology = larger_topology();
        let source = FakeSource::default()
            .reply("192.168.56.10", 3, Ok("9.1.0"))
            .reply("192.168.56.21", 1, Err(QueryError::Timeout))
            .reply("192.168.56.22", 2, Ok("9.1.0"))
            .reply("192.168.56.31", 1, Err(QueryError::Other("missing version key".into())))
            .reply("192.168.56.32", 4, Ok("9.0.2"))
            .reply("192.168.56.33", 1, Ok("9.0.2"));

        let records = FleetStatusAggregator::new(Box::new(source)).collect(&topology).await;

        assert_eq!(records.len(), topology.node_count());
        let versions: Vec<&str> = records.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(
            versions,
            vec![
                "9.1.0",
                "The server is down",
                "9.1.0",
                "Unknown error",
                "9.0.2",
                "9.0.2",
                "Can't connect to the server",
            ]
        );
        let names: Vec<&str> = records.iter().map(|r| r.vm_name.as_str()).collect();
        assert_eq!(names, vec!["manager", "pr_idx1", "pr_idx2", "fwd1", "fwd2", "fwd3", "lb"]);
        assert_eq!(records[6].web_url, "http://192.168.56.40");
        assert_eq!(records[3].web_url, "");
    }

    #[tokio::test]
    async fn unbounded_fan_out_queries_every_node_at_once() {
        let topology = larger_topology();
        let mut source = FakeSource::default();
        for ip in pairs(&topology) {
            source = source.reply(&ip, 20, Ok("9.1.0"));
        }
        let peak = source.peak.clone();

        let records = FleetStatusAggregator::new(Box::new(source)).collect(&topology).await;

        assert_eq!(records.len(), 7);
        assert_eq!(peak.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn concurrency_limit_bounds_in_flight_queries_and_keeps_order() {
        let topology = larger_topology();
        let ips = pairs(&topology);
        let mut source = FakeSource::default();
        for (ip, delay) in ips.iter().zip([15u64, 1, 10, 2, 8, 1, 5]) {
            source = source.reply(ip, delay, Ok("9.1.0"));
        }
        let peak = source.peak.clone();

        let records = FleetStatusAggregator::new(Box::new(source))
            .with_concurrency(Some(2))
            .collect(&topology)
            .await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
        let got: Vec<String> = records.into_iter().map(|r| r.ip).collect();
        assert_eq!(got, ips);
    }

    #[tokio::test]
    async fn empty_topology_yields_empty_report() {
        let records = FleetStatusAggregator::new(Box::new(FakeSource::default()))
            .collect(&Topology::new())
            .await;
        assert!(records.is_empty());
    }
}
