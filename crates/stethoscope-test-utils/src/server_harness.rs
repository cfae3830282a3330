//! Test server harness for end-to-end testing.
//!
//! Provides `TestStethoscopeServer` for spawning a real checkin gRPC server
//! backed by a mock registry.

use proto_gen::stethoscope::stethoscope_service_client::StethoscopeServiceClient;
use proto_gen::stethoscope::stethoscope_service_server::StethoscopeServiceServer;
use proto_gen::stethoscope::{CheckinRequest, Endpoint};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use stethoscope::grpc::CheckinService;
use stethoscope::registry::RegistryClient;
use stethoscope::services::{LivenessSettings, Stethoscope};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Channel;

/// Settings with a one-minute window and deregistration enabled.
pub fn test_settings() -> LivenessSettings {
    LivenessSettings {
        expire_after_write: Duration::from_secs(60),
        cleanup_interval: Duration::from_secs(60),
        remove_from_registry: true,
        deregister_timeout: Duration::from_secs(5),
        bootstrap_timeout: Duration::from_secs(5),
    }
}

/// Build a checkin request.
pub fn checkin_request(application: &str, service: &str, hostname: &str, port: i32) -> CheckinRequest {
    CheckinRequest {
        application_name: application.to_string(),
        service_name: service.to_string(),
        endpoint: Some(Endpoint {
            hostname: hostname.to_string(),
            port,
        }),
    }
}

/// Test harness for spawning the checkin gRPC server.
///
/// # Example
/// ```rust,ignore
/// let registry = Arc::new(MockRegistry::with_endpoints(&[("a", "s", "host:1")]));
/// let server = TestStethoscopeServer::spawn(registry, test_settings()).await?;
///
/// let mut client = server.client().await?;
/// client.checkin(checkin_request("a", "s", "host", 1)).await?;
///
/// assert_eq!(server.stethoscope().cache().size().await, 1);
/// ```
pub struct TestStethoscopeServer {
    addr: SocketAddr,
    stethoscope: Arc<Stethoscope>,
    _handle: JoinHandle<()>,
}

impl TestStethoscopeServer {
    /// Bootstrap from `registry` and serve on a random local port.
    ///
    /// No maintenance task is started; tests drive expiry explicitly.
    pub async fn spawn(
        registry: Arc<dyn RegistryClient>,
        settings: LivenessSettings,
    ) -> Result<Self, anyhow::Error> {
        let stethoscope = Arc::new(
            Stethoscope::initialize(registry, settings)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to initialize: {}", e))?,
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let service = StethoscopeServiceServer::new(CheckinService::new(Arc::clone(&stethoscope)));
        let handle = tokio::spawn(async move {
            if let Err(e) = tonic::transport::Server::builder()
                .add_service(service)
                .serve_with_incoming(TcpListenerStream::new(listener))
                .await
            {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            stethoscope,
            _handle: handle,
        })
    }

    /// Connect a gRPC client to the server.
    pub async fn client(&self) -> Result<StethoscopeServiceClient<Channel>, anyhow::Error> {
        StethoscopeServiceClient::connect(self.url())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to test server: {}", e))
    }

    /// The service object behind the server.
    pub fn stethoscope(&self) -> &Arc<Stethoscope> {
        &self.stethoscope
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for TestStethoscopeServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
