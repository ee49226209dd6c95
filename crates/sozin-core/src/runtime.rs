//! Tokio runtime behind the blocking engine.
//!
//! The engine, the lister and the menu are synchronous. rtnetlink and zbus
//! are not, so their calls are driven to completion here, one at a time, each
//! under its own deadline.

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::runtime::Runtime;

static SOZIN_RUNTIME: OnceLock<Result<Runtime, String>> = OnceLock::new();

fn sozin_runtime() -> Result<&'static Runtime> {
    match SOZIN_RUNTIME.get_or_init(|| Runtime::new().map_err(|e| e.to_string())) {
        Ok(rt) => Ok(rt),
        Err(err) => Err(anyhow!("cannot start the netlink runtime: {}", err)),
    }
}

/// Run `fut` to completion, or drop it once `timeout` has passed.
///
/// `Ok(None)` means the deadline hit first. `Err` only when the runtime
/// itself cannot be built.
pub fn block_on_timeout<F: Future>(timeout: Duration, fut: F) -> Result<Option<F::Output>> {
    let rt = sozin_runtime()?;
    Ok(rt.block_on(tokio::time::timeout(timeout, fut)).ok())
}
