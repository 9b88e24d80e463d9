//! QML puppet worker
//!
//! Connects back to the designer and serves node-instance commands until
//! the designer sends `EndPuppet` or closes the channel.
//!
//! Exit status is 0 on success and -1 on argument errors, missing capture
//! files and self-test failures.

mod args;
mod logging;
mod router;

use clap::error::ErrorKind;

const EXIT_FAILURE: i32 = -1;

#[tokio::main]
async fn main() {
    let invocation = match args::parse(std::env::args_os()) {
        Ok(invocation) => invocation,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => EXIT_FAILURE,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    if let Err(e) = router::route(invocation).await {
        tracing::error!("{:#}", e);
        eprintln!("qmlpuppet: {:#}", e);
        std::process::exit(EXIT_FAILURE);
    }
}
