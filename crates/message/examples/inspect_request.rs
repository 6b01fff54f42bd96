//! Builds a request from an environment snapshot and logs what it sees.
//!
//! ```text
//! cargo run --example inspect_request -- snapshot.json
//! ```
//!
//! Without an argument a built-in snapshot is used.

use std::{env, fs};

use micro_message::environment::Environment;
use micro_message::protocol::{Body, HttpMessage, Request, Stream, UploadedFile};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const SAMPLE: &str = r#"{
    "server_protocol": "HTTP/1.1",
    "request_method": "POST",
    "request_uri": "https://example.com/profile?tab=avatar",
    "header_lines": ["Host: example.com", "Content-Type: multipart/form-data; boundary=xyz"],
    "uploads": {
        "avatar": {"name": "me.png", "type": "image/png", "tmp_name": "/tmp/php3Fa9c", "size": 2048, "error": 0}
    }
}"#;

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let snapshot = match env::args().nth(1) {
        Some(path) => match fs::read_to_string(&path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(path, cause = %e, "failed to read snapshot");
                return;
            }
        },
        None => SAMPLE.to_owned(),
    };

    let environment: Environment = match serde_json::from_str(&snapshot) {
        Ok(environment) => environment,
        Err(e) => {
            error!(cause = %e, "invalid snapshot");
            return;
        }
    };

    let request = match Request::from_environment(&environment) {
        Ok(request) => request,
        Err(e) => {
            error!(cause = %e, "rejected request");
            return;
        }
    };

    info!(
        method = %request.method(),
        target = %request.request_target(),
        version = %request.protocol_version(),
        "received request"
    );
    for (name, values) in request.headers() {
        info!(name, value = values.join(", "), "header");
    }

    let request = request.with_body(Body::new(Stream::from_bytes("--xyz--")));
    match request.body().and_then(|body| body.contents()) {
        Ok(contents) => info!(len = contents.len(), "body"),
        Err(e) => warn!(cause = %e, "unreadable body"),
    }

    for field in environment.uploads.keys() {
        match UploadedFile::from_environment(&environment, field) {
            Ok(file) => info!(
                field,
                filename = file.client_filename(),
                media_type = file.client_media_type(),
                size = file.size(),
                error = %file.error(),
                "upload"
            ),
            Err(e) => warn!(field, cause = %e, "unusable upload"),
        }
    }
}
