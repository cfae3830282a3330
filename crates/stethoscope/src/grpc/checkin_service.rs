//! Checkin gRPC service.
//!
//! Implements `StethoscopeService`. A checkin only touches the liveness
//! cache; it never waits on the registry.

use crate::errors::StethoscopeError;
use crate::models::EndpointId;
use crate::services::Stethoscope;
use proto_gen::stethoscope::stethoscope_service_server::StethoscopeService;
use proto_gen::stethoscope::{CheckinRequest, CheckinResponse};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{instrument, warn};

/// Checkin gRPC service.
pub struct CheckinService {
    stethoscope: Arc<Stethoscope>,
}

impl CheckinService {
    pub fn new(stethoscope: Arc<Stethoscope>) -> Self {
        Self { stethoscope }
    }
}

#[tonic::async_trait]
impl StethoscopeService for CheckinService {
    /// Record that an endpoint is alive.
    ///
    /// Returns `INVALID_ARGUMENT` when the endpoint is missing or has no
    /// canonical `host:port` identity.
    #[instrument(skip_all, name = "stethoscope.grpc.checkin")]
    async fn checkin(
        &self,
        request: Request<CheckinRequest>,
    ) -> Result<Response<CheckinResponse>, Status> {
        let req = request.into_inner();

        let endpoint = req
            .endpoint
            .ok_or_else(|| StethoscopeError::InvalidEndpoint("endpoint is required".to_string()))
            .and_then(|e| EndpointId::from_parts(&e.hostname, e.port))
            .map_err(|e| {
                warn!(
                    target: "stethoscope.grpc.checkin",
                    application = %req.application_name,
                    service = %req.service_name,
                    error = %e,
                    "Rejected checkin"
                );
                Status::from(e)
            })?;

        self.stethoscope
            .checkin(&req.application_name, &req.service_name, endpoint)
            .await;

        Ok(Response::new(CheckinResponse { success: true }))
    }
}
