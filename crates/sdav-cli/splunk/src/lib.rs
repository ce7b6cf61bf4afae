mod management;
mod web;

#[cfg(test)]
mod test_server;

pub use management::{ManagementClient, parse_version};
pub use web::WebInterfaceProbe;

/// Failure kinds shared by every HTTP call made against a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransportFailure {
    Timeout,
    Refused,
    Other,
}

/// Sort a transport error into the closed set of failure kinds.
///
/// A connect timeout counts as a timeout, not as a refusal: the machine is
/// most likely still booting.
fn classify(err: &reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        TransportFailure::Timeout
    } else if err.is_connect() {
        TransportFailure::Refused
    } else {
        TransportFailure::Other
    }
}
