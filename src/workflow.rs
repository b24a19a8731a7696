//! The upload pipeline
//!
//! configuration → connect → resolve → send → disconnect, one step at a time.
//! Configuration is fully validated before the client is touched, and once
//! connected the session is closed whatever the later steps return.

use crate::config::{Credentials, UploadRequest};
use crate::error::Result;
use crate::platform::PlatformClient;
use crate::progress::ProgressSink;
use crate::recipient::{self, Recipient};
use crate::session::Session;
use crate::upload::{self, UploadResult};

/// Raw CLI-equivalent inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub to: Option<String>,
    pub message: Option<String>,
    pub files: Vec<String>,
}

/// Validate the request, including the recipient's form.
pub fn load_request(invocation: &Invocation) -> Result<UploadRequest> {
    let request = UploadRequest::new(
        invocation.to.as_deref(),
        invocation.message.as_deref(),
        &invocation.files,
    )?;
    Recipient::parse(&request.recipient)?;
    Ok(request)
}

/// Validate credentials and the request without any network activity.
pub fn load_config<F>(lookup: F, invocation: &Invocation) -> Result<(Credentials, UploadRequest)>
where
    F: Fn(&str) -> Option<String>,
{
    let credentials = Credentials::from_lookup(lookup)?;
    let request = load_request(invocation)?;
    Ok((credentials, request))
}

/// Connect, deliver the request, and disconnect.
pub async fn execute<C: PlatformClient>(
    client: &mut C,
    credentials: &Credentials,
    request: &UploadRequest,
    progress: &mut dyn ProgressSink,
) -> Result<UploadResult> {
    let mut session = Session::open(client, credentials).await?;
    let outcome = deliver(session.client(), request, progress).await;
    session.close(outcome).await
}

async fn deliver<C: PlatformClient>(
    client: &mut C,
    request: &UploadRequest,
    progress: &mut dyn ProgressSink,
) -> Result<UploadResult> {
    let to = recipient::resolve(client, &request.recipient).await?;
    upload::send_files(client, &to, &request.file_paths, &request.caption, progress).await
}

/// Full run: configuration from `lookup` and `invocation`, then [`execute`].
pub async fn run<C, F>(
    client: &mut C,
    lookup: F,
    invocation: &Invocation,
    progress: &mut dyn ProgressSink,
) -> Result<UploadResult>
where
    C: PlatformClient,
    F: Fn(&str) -> Option<String>,
{
    let (credentials, request) = load_config(lookup, invocation)?;
    tracing::info!(
        to = %request.recipient,
        files = request.file_paths.len(),
        "configuration loaded"
    );
    execute(client, &credentials, &request, progress).await
}
