//! protoc plugin that emits TypeScript types and HTTP clients for services annotated with
//! `google.api.http`. Invoke it through protoc:
//!
//! ```sh
//! protoc --typescript-http_out=gen --typescript-http_opt=verbose api/library/v1/library.proto
//! ```

use std::io::{Read, Write};

use g2ts::plugin::Invocation;
use prost::Message;
use tracing::Level;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut input = Vec::new();
    std::io::stdin().read_to_end(&mut input)?;

    let invocation = Invocation::decode(&input);
    init_logging(invocation.verbose());
    let response = invocation.into_response();

    std::io::stdout().write_all(&response.encode_to_vec())?;
    Ok(())
}

// stdout carries the response, so logs go to stderr.
fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
