//! Breadth-first CDP walk over devices reachable through live sessions
//!
//! Each visited device contributes one edge per advertised neighbor.
//! Neighbors worth visiting are pushed onto the shared [`Frontier`]; terminal
//! devices (phones, access points, video endpoints) are recorded as omitted
//! and never connected to. Failures only shrink the graph: they are logged,
//! reported as [`WalkEvent::DeviceFailed`], and the walk moves on.

use netwalk_core::{
    ConnectionStatus, CredentialAttempt, DeviceCredential, NeighborRecord, TopologyEdge,
    VersionRecord, NOT_AVAILABLE,
};
use netwalk_session::{DeviceSession, SessionError, SessionGateway};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cdp::parse_neighbors;
use crate::classify::{Classifier, OmitReason};
use crate::frontier::{Claim, Frontier};
use crate::version::{parse_hostname, parse_version};

/// Commands issued on every visited device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSet {
    #[serde(default = "default_neighbors_command")]
    pub neighbors: String,
    #[serde(default = "default_version_command")]
    pub version: String,
    #[serde(default = "default_hostname_command")]
    pub hostname: String,
}

fn default_neighbors_command() -> String {
    "show cdp neighbors detail".to_string()
}

fn default_version_command() -> String {
    "show version | begin Base".to_string()
}

fn default_hostname_command() -> String {
    "show version | include uptime".to_string()
}

impl Default for CommandSet {
    fn default() -> Self {
        Self {
            neighbors: default_neighbors_command(),
            version: default_version_command(),
            hostname: default_hostname_command(),
        }
    }
}

/// Walker configuration
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Logins tried in order after a device's own credentials are rejected
    pub fallbacks: Vec<CredentialAttempt>,
    pub commands: CommandSet,
}

/// Walk event for progress reporting
#[derive(Debug, Clone)]
pub enum WalkEvent {
    /// Device walked; `edges` neighbors recorded
    DeviceVisited {
        host: String,
        name: String,
        edges: usize,
    },
    /// Device could not be walked
    DeviceFailed { host: String, error: String },
    /// Device matched the omission policy and was recorded without a session
    DeviceOmitted { host: String, reason: String },
    /// Frontier drained
    WalkCompleted { visited: usize, edges: usize },
}

/// A device that could not be walked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDevice {
    pub host: String,
    pub error: String,
}

/// What one [`DiscoveryWalker::run_once`] step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing left to claim
    Idle,
    /// Front entry named an already claimed host and was discarded
    Duplicate(String),
    /// Device processed and marked visited
    Visited { host: String, edges: usize },
}

enum Visit {
    Omitted(TopologyEdge, OmitReason),
    Walked { name: String, edges: Vec<TopologyEdge> },
    Failed(SessionError),
}

/// Discovery walker over a session gateway
pub struct DiscoveryWalker<G: SessionGateway> {
    gateway: G,
    classifier: Classifier,
    config: WalkerConfig,
    frontier: Frontier,
    edges: Mutex<Vec<TopologyEdge>>,
    failures: Mutex<Vec<FailedDevice>>,
    event_tx: broadcast::Sender<WalkEvent>,
}

impl<G: SessionGateway> DiscoveryWalker<G> {
    /// Create a walker with an empty frontier
    pub fn new(gateway: G, classifier: Classifier, config: WalkerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            gateway,
            classifier,
            config,
            frontier: Frontier::new(),
            edges: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            event_tx,
        }
    }

    /// Subscribe to walk events
    pub fn subscribe(&self) -> broadcast::Receiver<WalkEvent> {
        self.event_tx.subscribe()
    }

    /// Queue a device; returns false if it was already visited
    pub fn enqueue(&self, credential: DeviceCredential) -> bool {
        self.frontier.push(credential)
    }

    /// Queue seed devices in order
    pub fn seed<I>(&self, credentials: I)
    where
        I: IntoIterator<Item = DeviceCredential>,
    {
        for credential in credentials {
            self.enqueue(credential);
        }
    }

    /// Edges recorded so far
    pub fn edges(&self) -> Vec<TopologyEdge> {
        lock(&self.edges).clone()
    }

    /// Devices that failed so far, in failure order
    pub fn failures(&self) -> Vec<FailedDevice> {
        lock(&self.failures).clone()
    }

    /// Visited hosts in completion order
    pub fn visited(&self) -> Vec<String> {
        self.frontier.visited()
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Process the front of the frontier
    pub async fn run_once(&self) -> RunOutcome {
        match self.frontier.claim() {
            Claim::Device(credential) => self.visit(credential).await,
            Claim::Duplicate(host) => {
                debug!(host = %host, "Skipping already claimed device");
                RunOutcome::Duplicate(host)
            }
            Claim::Wait | Claim::Exhausted => RunOutcome::Idle,
        }
    }

    /// Walk until the frontier is empty, one device at a time
    pub async fn drain(&self) -> Vec<TopologyEdge> {
        while self.frontier.pending() > 0 {
            self.run_once().await;
        }
        self.finish()
    }

    async fn visit(&self, credential: DeviceCredential) -> RunOutcome {
        let host = credential.host.clone();
        let _claim = self.frontier.guard(&host);

        let edges = match self.process(&credential).await {
            Visit::Omitted(stub, reason) => {
                info!(host = %host, reason = %reason, "Device omitted from crawl");
                let _ = self.event_tx.send(WalkEvent::DeviceOmitted {
                    host: host.clone(),
                    reason: reason.to_string(),
                });
                vec![stub]
            }
            Visit::Walked { name, edges } => {
                info!(host = %host, name = %name, edges = edges.len(), "Device visited");
                let _ = self.event_tx.send(WalkEvent::DeviceVisited {
                    host: host.clone(),
                    name,
                    edges: edges.len(),
                });
                edges
            }
            Visit::Failed(e) => {
                if e.is_unreachable() {
                    warn!(host = %host, error = %e, "Device unreachable");
                } else {
                    warn!(host = %host, error = %e, "Skipping device");
                }
                let failure = FailedDevice {
                    host: host.clone(),
                    error: e.to_string(),
                };
                lock(&self.failures).push(failure.clone());
                let _ = self.event_tx.send(WalkEvent::DeviceFailed {
                    host: failure.host,
                    error: failure.error,
                });
                Vec::new()
            }
        };

        let count = edges.len();
        lock(&self.edges).extend(edges);
        RunOutcome::Visited { host, edges: count }
    }

    async fn process(&self, credential: &DeviceCredential) -> Visit {
        let platform = credential.platform.as_deref().unwrap_or(NOT_AVAILABLE);
        if let Some(reason) = self.classifier.omission_reason(platform, &credential.host) {
            return Visit::Omitted(self.omitted_stub(credential, platform), reason);
        }

        let (mut session, login) = match self.open_session(credential).await {
            Ok(opened) => opened,
            Err(e) => return Visit::Failed(e),
        };
        debug!(host = %credential.host, login = %login.label, "Session open");

        let result = self.walk_device(&mut session, credential).await;

        if let Err(e) = session.close().await {
            debug!(host = %credential.host, error = %e, "Failed to close session");
        }
        result
    }

    /// Try each login in order; only a rejected login moves on to the next one
    async fn open_session(
        &self,
        credential: &DeviceCredential,
    ) -> Result<(G::Session, CredentialAttempt), SessionError> {
        let mut last_error = None;
        for attempt in credential.attempts(&self.config.fallbacks) {
            match self.gateway.open(&credential.host, &attempt).await {
                Ok(session) => return Ok((session, attempt)),
                Err(e) if e.is_authentication() => {
                    warn!(
                        host = %credential.host,
                        login = %attempt.label,
                        error = %e,
                        "Login rejected"
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error.unwrap_or_else(|| SessionError::Authentication {
            host: credential.host.clone(),
            username: credential.username.clone(),
            reason: "no login attempts configured".to_string(),
        }))
    }

    async fn walk_device(
        &self,
        session: &mut G::Session,
        credential: &DeviceCredential,
    ) -> Visit {
        let host = &credential.host;
        let commands = &self.config.commands;

        let name = match session.run_command(&commands.hostname).await {
            Ok(output) => parse_hostname(&output),
            Err(e) => {
                debug!(host = %host, error = %e, "Hostname lookup failed");
                None
            }
        }
        .unwrap_or_else(|| host.clone());

        let neighbors = match session.run_command(&commands.neighbors).await {
            Ok(output) => parse_neighbors(&output, &name),
            Err(e) => return Visit::Failed(e),
        };
        if neighbors.is_empty() {
            info!(host = %host, name = %name, "No CDP neighbors reported");
            return Visit::Walked {
                name,
                edges: Vec::new(),
            };
        }

        let mut seen = HashSet::new();
        let mut classified = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            let category = self.classifier.classify(&neighbor.platform);
            let status = if self.classifier.should_omit(&neighbor.platform, &neighbor.ip) {
                ConnectionStatus::Omitted
            } else {
                if seen.insert(neighbor.ip.clone()) {
                    let next = credential.for_neighbor(&neighbor.ip, &neighbor.platform);
                    if self.frontier.push(next) {
                        debug!(host = %host, neighbor = %neighbor.ip, "Queued neighbor");
                    }
                }
                ConnectionStatus::Connected
            };
            classified.push((neighbor, category, status));
        }

        let version = match session.run_command(&commands.version).await {
            Ok(output) => parse_version(&output),
            Err(e) => {
                warn!(host = %host, error = %e, "Version lookup failed");
                VersionRecord::unknown()
            }
        };

        let edges = classified
            .into_iter()
            .map(|(neighbor, category, status)| TopologyEdge {
                source_name: name.clone(),
                source_ip: host.clone(),
                neighbor,
                category,
                status,
                version: version.clone(),
            })
            .collect();

        Visit::Walked { name, edges }
    }

    fn omitted_stub(&self, credential: &DeviceCredential, platform: &str) -> TopologyEdge {
        let mut neighbor = NeighborRecord::unavailable(&credential.host, &credential.host);
        neighbor.ip = credential.host.clone();
        neighbor.platform = platform.to_string();
        TopologyEdge {
            source_name: credential.host.clone(),
            source_ip: credential.host.clone(),
            neighbor,
            category: self.classifier.classify(platform),
            status: ConnectionStatus::Omitted,
            version: VersionRecord::unknown(),
        }
    }

    fn finish(&self) -> Vec<TopologyEdge> {
        let edges = self.edges();
        let visited = self.frontier.visited().len();
        info!(visited = visited, edges = edges.len(), "Walk complete");
        let _ = self.event_tx.send(WalkEvent::WalkCompleted {
            visited,
            edges: edges.len(),
        });
        edges
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<G: SessionGateway + 'static> DiscoveryWalker<G> {
    /// Walk until the frontier is empty with `workers` concurrent tasks
    ///
    /// Cross-device edge order is not deterministic; edges of one device stay
    /// in neighbor order.
    pub async fn drain_concurrent(self: &Arc<Self>, workers: usize) -> Vec<TopologyEdge> {
        let workers = workers.max(1);
        info!(workers = workers, "Starting concurrent walk");

        let mut tasks = JoinSet::new();
        for worker in 0..workers {
            let walker = Arc::clone(self);
            tasks.spawn(async move { walker.work(worker).await });
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Discovery worker failed");
            }
        }

        self.finish()
    }

    async fn work(&self, worker: usize) {
        loop {
            let changed = self.frontier.notified();
            match self.frontier.claim() {
                Claim::Device(credential) => {
                    debug!(worker = worker, host = %credential.host, "Claimed device");
                    self.visit(credential).await;
                }
                Claim::Duplicate(host) => {
                    debug!(worker = worker, host = %host, "Skipping already claimed device");
                }
                Claim::Wait => changed.await,
                Claim::Exhausted => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use netwalk_core::{Category, Policy};
    use std::collections::HashMap;

    const NEIGHBORS: &str = "show cdp neighbors detail";
    const VERSION: &str = "show version | begin Base";
    const HOSTNAME: &str = "show version | include uptime";

    #[derive(Clone, Default)]
    struct MockDevice {
        /// Accepted (username, password) pairs
        logins: Vec<(String, String)>,
        outputs: HashMap<String, String>,
        failing: HashSet<String>,
        crashing: HashSet<String>,
    }

    impl MockDevice {
        fn switch(name: &str, neighbors: &[(&str, &str, &str)]) -> Self {
            let cdp: String = neighbors
                .iter()
                .enumerate()
                .map(|(idx, (id, ip, platform))| cdp_block(id, ip, platform, idx + 1))
                .collect();
            let mut outputs = HashMap::new();
            outputs.insert(HOSTNAME.to_string(), format!("{} uptime is 3 weeks\n", name));
            outputs.insert(NEIGHBORS.to_string(), cdp);
            outputs.insert(
                VERSION.to_string(),
                "Base ethernet MAC Address : 00:11:22:33:44:55\n\
                 System serial number : FOC0001\n\
                 *    1 52    C9300-48P  17.03.04  CAT9K_IOSXE\n"
                    .to_string(),
            );
            Self {
                logins: vec![("admin".to_string(), "pw".to_string())],
                outputs,
                failing: HashSet::new(),
                crashing: HashSet::new(),
            }
        }

        fn accepting(mut self, username: &str, password: &str) -> Self {
            self.logins = vec![(username.to_string(), password.to_string())];
            self
        }

        fn failing(mut self, command: &str) -> Self {
            self.failing.insert(command.to_string());
            self
        }

        fn crashing(mut self, command: &str) -> Self {
            self.crashing.insert(command.to_string());
            self
        }
    }

    fn cdp_block(id: &str, ip: &str, platform: &str, port: usize) -> String {
        format!(
            "-------------------------\n\
             Device ID: {id}\n\
             Entry address(es):\n  IP address: {ip}\n\
             Platform: {platform},  Capabilities: Switch IGMP\n\
             Interface: GigabitEthernet1/0/{port},  Port ID (outgoing port): GigabitEthernet1/0/48\n\n"
        )
    }

    #[derive(Default)]
    struct Log {
        /// (host, username)
        opens: Vec<(String, String)>,
        closes: Vec<String>,
    }

    #[derive(Clone, Default)]
    struct MockGateway {
        devices: Arc<HashMap<String, MockDevice>>,
        log: Arc<Mutex<Log>>,
    }

    impl MockGateway {
        fn new(devices: Vec<(&str, MockDevice)>) -> Self {
            Self {
                devices: Arc::new(
                    devices
                        .into_iter()
                        .map(|(host, device)| (host.to_string(), device))
                        .collect(),
                ),
                log: Arc::default(),
            }
        }

        fn opens(&self, host: &str) -> usize {
            let log = self.log.lock().unwrap();
            log.opens.iter().filter(|(h, _)| h == host).count()
        }

        fn successful_opens(&self) -> usize {
            let log = self.log.lock().unwrap();
            log.opens
                .iter()
                .filter(|(h, user)| {
                    self.devices
                        .get(h)
                        .map(|d| d.logins.iter().any(|(accepted, _)| accepted == user))
                        .unwrap_or(false)
                })
                .count()
        }

        fn closes(&self) -> usize {
            self.log.lock().unwrap().closes.len()
        }
    }

    struct MockSession {
        host: String,
        device: MockDevice,
        log: Arc<Mutex<Log>>,
        open: bool,
    }

    #[async_trait]
    impl DeviceSession for MockSession {
        async fn run_command(&mut self, command: &str) -> Result<String, SessionError> {
            if !self.open {
                return Err(SessionError::Closed(self.host.clone()));
            }
            if self.device.crashing.contains(command) {
                panic!("session to {} crashed on '{}'", self.host, command);
            }
            if self.device.failing.contains(command) {
                return Err(SessionError::Command {
                    host: self.host.clone(),
                    command: command.to_string(),
                    reason: "invalid input".to_string(),
                });
            }
            Ok(self.device.outputs.get(command).cloned().unwrap_or_default())
        }

        async fn close(&mut self) -> Result<(), SessionError> {
            self.open = false;
            self.log.lock().unwrap().closes.push(self.host.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl SessionGateway for MockGateway {
        type Session = MockSession;

        async fn open(
            &self,
            host: &str,
            login: &CredentialAttempt,
        ) -> Result<MockSession, SessionError> {
            self.log
                .lock()
                .unwrap()
                .opens
                .push((host.to_string(), login.username.clone()));

            let Some(device) = self.devices.get(host) else {
                return Err(SessionError::Connection {
                    host: host.to_string(),
                    reason: "connection refused".to_string(),
                });
            };
            let accepted = device
                .logins
                .iter()
                .any(|(u, p)| *u == login.username && *p == login.password);
            if !accepted {
                return Err(SessionError::Authentication {
                    host: host.to_string(),
                    username: login.username.clone(),
                    reason: "password rejected".to_string(),
                });
            }
            Ok(MockSession {
                host: host.to_string(),
                device: device.clone(),
                log: self.log.clone(),
                open: true,
            })
        }
    }

    fn seed(host: &str) -> DeviceCredential {
        DeviceCredential::new(host, "admin", "pw", "")
    }

    fn walker(gateway: MockGateway) -> DiscoveryWalker<MockGateway> {
        let config = WalkerConfig {
            fallbacks: vec![CredentialAttempt::new("fallback", "backup", "backup-pw", "")],
            commands: CommandSet::default(),
        };
        DiscoveryWalker::new(gateway, Classifier::default(), config)
    }

    const SWITCH: &str = "cisco C9300-48P";
    const PHONE: &str = "Cisco IP Phone 7841";

    fn triangle() -> MockGateway {
        MockGateway::new(vec![
            (
                "10.0.0.1",
                MockDevice::switch("a", &[("b", "10.0.0.2", SWITCH), ("c", "10.0.0.3", SWITCH)]),
            ),
            (
                "10.0.0.2",
                MockDevice::switch("b", &[("c", "10.0.0.3", SWITCH), ("a", "10.0.0.1", SWITCH)]),
            ),
            (
                "10.0.0.3",
                MockDevice::switch("c", &[("a", "10.0.0.1", SWITCH), ("b", "10.0.0.2", SWITCH)]),
            ),
        ])
    }

    #[tokio::test]
    async fn test_each_device_visited_once() {
        let gateway = triangle();
        let walker = walker(gateway.clone());
        walker.enqueue(seed("10.0.0.1"));

        let edges = walker.drain().await;

        assert_eq!(walker.visited(), vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        assert_eq!(edges.len(), 6);
        for host in ["10.0.0.1", "10.0.0.2", "10.0.0.3"] {
            assert_eq!(gateway.opens(host), 1, "{} opened once", host);
        }
    }

    #[tokio::test]
    async fn test_edges_carry_device_identity() {
        let walker = walker(triangle());
        walker.enqueue(seed("10.0.0.1"));
        walker.drain().await;

        let edges = walker.edges();
        let first = &edges[0];
        assert_eq!(first.source_name, "a");
        assert_eq!(first.source_ip, "10.0.0.1");
        assert_eq!(first.neighbor.name, "b");
        assert_eq!(first.neighbor.local_device, "a");
        assert_eq!(first.neighbor.local_interface, "GigabitEthernet1/0/1");
        assert_eq!(first.category, Category::Switch);
        assert_eq!(first.status, ConnectionStatus::Connected);
        assert_eq!(first.version.model, "C9300-48P");
        assert_eq!(first.version.serial_numbers, "FOC0001");
    }

    #[tokio::test]
    async fn test_terminal_devices_are_recorded_not_visited() {
        let gateway = MockGateway::new(vec![(
            "10.0.0.1",
            MockDevice::switch("a", &[("SEP001122334455", "10.0.0.50", PHONE)]),
        )]);
        let walker = walker(gateway.clone());
        walker.enqueue(seed("10.0.0.1"));

        let edges = walker.drain().await;

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].status, ConnectionStatus::Omitted);
        assert_eq!(edges[0].category, Category::Phone);
        assert_eq!(walker.visited(), vec!["10.0.0.1"]);
        assert_eq!(gateway.opens("10.0.0.50"), 0);
    }

    #[tokio::test]
    async fn test_neighbor_without_address_is_omitted() {
        let gateway = MockGateway::new(vec![(
            "10.0.0.1",
            MockDevice::switch("a", &[("mystery", NOT_AVAILABLE, SWITCH)]),
        )]);
        let walker = walker(gateway);
        walker.enqueue(seed("10.0.0.1"));

        let edges = walker.drain().await;
        assert_eq!(edges[0].status, ConnectionStatus::Omitted);
        assert_eq!(walker.frontier().pending(), 0);
    }

    #[tokio::test]
    async fn test_rejected_logins_degrade_gracefully() {
        let gateway = MockGateway::new(vec![
            ("10.0.0.1", MockDevice::switch("a", &[]).accepting("nobody", "x")),
            ("10.0.0.2", MockDevice::switch("b", &[])),
        ]);
        let walker = walker(gateway.clone());
        walker.seed([seed("10.0.0.1"), seed("10.0.0.2")]);

        let edges = walker.drain().await;

        assert!(edges.is_empty());
        assert_eq!(walker.visited(), vec!["10.0.0.1", "10.0.0.2"]);
        // primary then fallback
        assert_eq!(gateway.opens("10.0.0.1"), 2);
    }

    #[tokio::test]
    async fn test_fallback_login_is_used() {
        let gateway = MockGateway::new(vec![(
            "10.0.0.1",
            MockDevice::switch("a", &[("b", "10.0.0.2", SWITCH)]).accepting("backup", "backup-pw"),
        )]);
        let walker = walker(gateway.clone());
        walker.enqueue(seed("10.0.0.1"));

        let outcome = walker.run_once().await;
        assert_eq!(
            outcome,
            RunOutcome::Visited {
                host: "10.0.0.1".to_string(),
                edges: 1
            }
        );
        assert_eq!(gateway.opens("10.0.0.1"), 2);
    }

    #[tokio::test]
    async fn test_unreachable_device_skips_fallbacks() {
        let gateway = MockGateway::new(vec![]);
        let walker = walker(gateway.clone());
        let mut events = walker.subscribe();
        walker.enqueue(seed("10.0.0.9"));

        walker.drain().await;

        assert_eq!(gateway.opens("10.0.0.9"), 1);
        assert_eq!(walker.visited(), vec!["10.0.0.9"]);
        let failures = walker.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].host, "10.0.0.9");
        assert!(failures[0].error.contains("connection refused"));
        assert!(matches!(
            events.try_recv(),
            Ok(WalkEvent::DeviceFailed { ref host, .. }) if host == "10.0.0.9"
        ));
    }

    #[tokio::test]
    async fn test_empty_neighbor_output_terminates() {
        let gateway = MockGateway::new(vec![("10.0.0.1", MockDevice::switch("a", &[]))]);
        let walker = walker(gateway);
        walker.enqueue(seed("10.0.0.1"));

        assert_eq!(
            walker.run_once().await,
            RunOutcome::Visited {
                host: "10.0.0.1".to_string(),
                edges: 0
            }
        );
        assert_eq!(walker.run_once().await, RunOutcome::Idle);
        assert!(walker.edges().is_empty());
    }

    #[tokio::test]
    async fn test_drain_single_silent_seed() {
        let gateway = MockGateway::new(vec![("10.0.0.1", MockDevice::switch("a", &[]))]);
        let walker = walker(gateway.clone());
        let mut events = walker.subscribe();
        walker.enqueue(seed("10.0.0.1"));

        let edges = walker.drain().await;

        assert!(edges.is_empty());
        assert_eq!(walker.visited(), vec!["10.0.0.1"]);
        assert_eq!(gateway.opens("10.0.0.1"), 1);
        assert!(matches!(events.try_recv(), Ok(WalkEvent::DeviceVisited { edges: 0, .. })));
        assert!(matches!(
            events.try_recv(),
            Ok(WalkEvent::WalkCompleted { visited: 1, edges: 0 })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_entry_is_discarded() {
        let gateway = MockGateway::new(vec![("10.0.0.1", MockDevice::switch("a", &[]))]);
        let walker = walker(gateway.clone());
        walker.enqueue(seed("10.0.0.1"));
        walker.enqueue(seed("10.0.0.1"));

        assert!(matches!(walker.run_once().await, RunOutcome::Visited { .. }));
        assert_eq!(
            walker.run_once().await,
            RunOutcome::Duplicate("10.0.0.1".to_string())
        );
        assert_eq!(gateway.opens("10.0.0.1"), 1);
    }

    #[tokio::test]
    async fn test_sessions_always_closed() {
        let gateway = MockGateway::new(vec![
            (
                "10.0.0.1",
                MockDevice::switch("a", &[("b", "10.0.0.2", SWITCH)]),
            ),
            (
                "10.0.0.2",
                MockDevice::switch("b", &[]).failing(NEIGHBORS),
            ),
        ]);
        let walker = walker(gateway.clone());
        walker.enqueue(seed("10.0.0.1"));

        walker.drain().await;

        assert_eq!(walker.visited().len(), 2);
        assert_eq!(gateway.successful_opens(), 2);
        assert_eq!(gateway.closes(), 2);
    }

    #[tokio::test]
    async fn test_version_failure_yields_unknown_record() {
        let gateway = MockGateway::new(vec![(
            "10.0.0.1",
            MockDevice::switch("a", &[("b", "10.0.0.2", SWITCH)]).failing(VERSION),
        )]);
        let walker = walker(gateway);
        walker.enqueue(seed("10.0.0.1"));

        let edges = walker.drain().await;
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].version, VersionRecord::unknown());
    }

    #[tokio::test]
    async fn test_hostname_falls_back_to_host() {
        let gateway = MockGateway::new(vec![(
            "10.0.0.1",
            MockDevice::switch("a", &[("b", "10.0.0.2", SWITCH)]).failing(HOSTNAME),
        )]);
        let walker = walker(gateway);
        walker.enqueue(seed("10.0.0.1"));

        let edges = walker.drain().await;
        assert_eq!(edges[0].source_name, "10.0.0.1");
        assert_eq!(edges[0].neighbor.local_device, "10.0.0.1");
    }

    #[tokio::test]
    async fn test_excluded_seed_gets_stub_edge() {
        let gateway = MockGateway::new(vec![("10.0.0.1", MockDevice::switch("a", &[]))]);
        let policy = Policy::default().with_excluded_addresses(["10.0.0.1"]);
        let walker = DiscoveryWalker::new(
            gateway.clone(),
            Classifier::new(Arc::new(policy)),
            WalkerConfig::default(),
        );
        walker.enqueue(seed("10.0.0.1"));

        let edges = walker.drain().await;

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].status, ConnectionStatus::Omitted);
        assert_eq!(edges[0].neighbor.ip, "10.0.0.1");
        assert_eq!(gateway.opens("10.0.0.1"), 0);
        assert_eq!(walker.visited(), vec!["10.0.0.1"]);
    }

    #[tokio::test]
    async fn test_stacked_device_expands_per_chassis() {
        let mut device = MockDevice::switch("core", &[("b", "10.0.0.2", SWITCH)]);
        device.outputs.insert(
            VERSION.to_string(),
            "Base ethernet MAC Address : AA:BB\n\
             System serial number : S1\n\
             Base ethernet MAC Address : CC:DD\n\
             System serial number : S2\n"
                .to_string(),
        );
        let walker = walker(MockGateway::new(vec![("10.0.0.1", device)]));
        walker.enqueue(seed("10.0.0.1"));

        let edges = walker.drain().await;
        let rows = netwalk_core::report::stack_expansion(&edges);
        let names: Vec<_> = rows.iter().map(|r| r.device_name.as_str()).collect();

        assert_eq!(names, vec!["core-1", "core-2"]);
        assert_eq!(rows[1].mac_address, "CC:DD");
        assert_eq!(rows[1].serial_number, "S2");
    }

    #[tokio::test]
    async fn test_walk_events() {
        let walker = walker(triangle());
        let mut events = walker.subscribe();
        walker.enqueue(seed("10.0.0.1"));
        walker.drain().await;

        let mut visited_events = 0;
        let mut completed = None;
        while let Ok(event) = events.try_recv() {
            match event {
                WalkEvent::DeviceVisited { edges, .. } => {
                    assert_eq!(edges, 2);
                    visited_events += 1;
                }
                WalkEvent::WalkCompleted { visited, edges } => completed = Some((visited, edges)),
                _ => {}
            }
        }
        assert_eq!(visited_events, 3);
        assert_eq!(completed, Some((3, 6)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_drain_visits_each_host_once() {
        let hosts: Vec<String> = (1..=8).map(|i| format!("10.0.1.{}", i)).collect();
        let devices: Vec<(String, MockDevice)> = hosts
            .iter()
            .enumerate()
            .map(|(idx, host)| {
                // Everyone advertises everyone else
                let peers: Vec<(String, String)> = hosts
                    .iter()
                    .filter(|h| *h != host)
                    .map(|h| (format!("sw-{}", h), h.clone()))
                    .collect();
                let refs: Vec<(&str, &str, &str)> = peers
                    .iter()
                    .map(|(name, ip)| (name.as_str(), ip.as_str(), SWITCH))
                    .collect();
                (host.clone(), MockDevice::switch(&format!("sw-{}", idx), &refs))
            })
            .collect();
        let gateway = MockGateway::new(
            devices
                .iter()
                .map(|(host, device)| (host.as_str(), device.clone()))
                .collect(),
        );

        let walker = Arc::new(walker(gateway.clone()));
        walker.enqueue(seed("10.0.1.1"));
        let edges = walker.drain_concurrent(4).await;

        let mut visited = walker.visited();
        visited.sort();
        let mut expected = hosts.clone();
        expected.sort();
        assert_eq!(visited, expected);
        assert_eq!(edges.len(), 8 * 7);
        for host in &hosts {
            assert_eq!(gateway.opens(host), 1);
        }
        assert_eq!(gateway.closes(), 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_crashed_visit_does_not_stall_workers() {
        let gateway = MockGateway::new(vec![
            ("10.0.0.1", MockDevice::switch("a", &[]).crashing(NEIGHBORS)),
            ("10.0.0.2", MockDevice::switch("b", &[("c", "10.0.0.3", SWITCH)])),
            ("10.0.0.3", MockDevice::switch("c", &[])),
        ]);
        let walker = Arc::new(walker(gateway));
        walker.seed([seed("10.0.0.1"), seed("10.0.0.2")]);

        let edges = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            walker.drain_concurrent(2),
        )
        .await
        .expect("walk finishes after a worker panics");

        assert_eq!(edges.len(), 1);
        assert_eq!(walker.frontier().in_flight(), 0);
        let mut visited = walker.visited();
        visited.sort();
        assert_eq!(visited, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
    }

    #[tokio::test]
    async fn test_failures_survive_without_subscribers() {
        let gateway = MockGateway::new(vec![(
            "10.0.0.1",
            MockDevice::switch("a", &[]).failing(NEIGHBORS),
        )]);
        let walker = walker(gateway);
        walker.seed([seed("10.0.0.1"), seed("10.0.0.2")]);

        walker.drain().await;

        let failures = walker.failures();
        let hosts: Vec<_> = failures.iter().map(|f| f.host.as_str()).collect();
        assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.2"]);
        assert!(failures[0].error.contains("show cdp neighbors detail"));
    }
}
