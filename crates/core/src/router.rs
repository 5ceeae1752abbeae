//! Request handling: resolve, authorize, stream.

use crate::error::Result;
use crate::resolver::{Resolution, ResolvedArtifact, SymbolResolver};
use crate::response::{PlainResponse, ResponseSink};
use http::StatusCode;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use symserve_api::{
    AccessCheck, ArtifactsViewMode, Authentication, Authorizer, Permission, Subject,
};
use tracing::{debug, error, info, warn};

pub const INDEX_PROBE_MESSAGE: &str = "Symbol server available";
pub const NOT_FOUND_MESSAGE: &str = "File not found";

/// The permission a caller needs on the owning project to download symbols.
pub const REQUIRED_PERMISSION: Permission = Permission::ViewBuildRuntimeData;

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Serves symbol requests. Cheap to share; holds no per-request state.
pub struct SymbolService {
    resolver: SymbolResolver,
    authorizer: Arc<dyn Authorizer>,
    buffer_size: usize,
}

impl SymbolService {
    pub fn new(resolver: SymbolResolver, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            resolver,
            authorizer,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn resolver(&self) -> &SymbolResolver {
        &self.resolver
    }

    /// Handles one request, always leaving a terminal response in `sink`.
    pub fn handle(&self, request: &http::Request<()>, sink: &mut dyn ResponseSink) {
        let path = request.uri().path();
        let resolution = match self.resolver.resolve(path) {
            Ok(resolution) => resolution,
            Err(e) => {
                error!("Failed to resolve {}: {}", path, e);
                fail(sink, &e.to_string());
                return;
            }
        };

        match resolution {
            Resolution::IndexProbe => {
                respond(sink, PlainResponse::text(StatusCode::OK, INDEX_PROBE_MESSAGE));
            }
            Resolution::Miss(reason) => {
                debug!(%path, %reason, "Symbol request not resolved");
                not_found(sink);
            }
            Resolution::Found(resolved) => self.serve(request, resolved, sink),
        }
    }

    fn serve(
        &self,
        request: &http::Request<()>,
        resolved: ResolvedArtifact,
        sink: &mut dyn ResponseSink,
    ) {
        let check = AccessCheck::new(resolved.project_id.as_str(), REQUIRED_PERMISSION);
        let subject = match self.authorizer.authenticate(request, &check) {
            Ok(Authentication::Granted(subject)) => subject,
            Ok(Authentication::Denied(denial)) => {
                warn!(
                    project_id = %resolved.project_id,
                    status = %denial.status,
                    "Symbol download denied"
                );
                respond(sink, denial.into());
                return;
            }
            Err(e) => {
                error!("Authorization failed: {}", e);
                fail(sink, &e.to_string());
                return;
            }
        };

        if let Err(e) = self.stream_as(&subject, &resolved, sink) {
            error!(
                build_id = resolved.build.build_id(),
                artifact_path = %resolved.artifact_path,
                "Failed to stream symbol file: {}",
                e
            );
            fail(sink, &e.to_string());
        }
    }

    /// Opens the artifact on behalf of `subject` and copies it into the sink.
    fn stream_as(
        &self,
        subject: &Subject,
        resolved: &ResolvedArtifact,
        sink: &mut dyn ResponseSink,
    ) -> Result<()> {
        let view = resolved
            .build
            .artifacts(subject, ArtifactsViewMode::WithArchivesContent)?;
        let Some(artifact) = view.artifact(&resolved.artifact_path)? else {
            debug!(
                "Artifact not found by path {} for build with id {}",
                resolved.artifact_path,
                resolved.build.build_id()
            );
            not_found(sink);
            return Ok(());
        };

        let mut input = artifact.open()?;
        let mut output = BufWriter::with_capacity(self.buffer_size, sink.start_body(StatusCode::OK)?);
        let copied = std::io::copy(&mut input, &mut output)?;
        output.flush()?;

        info!(
            user = %subject.name,
            build_id = resolved.build.build_id(),
            artifact_path = %resolved.artifact_path,
            bytes = copied,
            "Served symbol file {}",
            resolved.request
        );
        Ok(())
    }
}

fn respond(sink: &mut dyn ResponseSink, response: PlainResponse) {
    if let Err(e) = sink.send(response) {
        warn!("Failed to write response: {}", e);
    }
}

fn not_found(sink: &mut dyn ResponseSink) {
    respond(
        sink,
        PlainResponse::text(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE),
    );
}

/// Reports an internal failure: 500 if nothing was committed yet, otherwise
/// the started body is aborted.
fn fail(sink: &mut dyn ResponseSink, message: &str) {
    if sink.is_committed() {
        sink.abort(message);
    } else {
        respond(
            sink,
            PlainResponse::text(StatusCode::INTERNAL_SERVER_ERROR, message),
        );
    }
}
