use anyhow::{bail, Result};
use rexos::driver::{ExosDriver, NetworkDriver};
use rexos::error::DriverError;
use rexos::session::ConfigSource;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let [_, host, user, password, candidate] = args.as_slice() else {
        bail!("usage: merge_candidate <host> <user> <password> <candidate-file>");
    };

    let mut driver = ExosDriver::new(host, user, password);
    driver.open().await?;

    driver
        .load_merge_candidate(ConfigSource::Path(PathBuf::from(candidate)))
        .await?;

    let diff = driver.compare_config().await?;
    if diff.is_empty() {
        println!("candidate adds nothing, discarding");
        driver.discard_config().await?;
        driver.close().await?;
        return Ok(());
    }
    println!("pending changes:\n{diff}");

    match driver.commit_config().await {
        Ok(()) => println!("committed"),
        Err(DriverError::MergeConfigFailed(reason)) => {
            println!("commit rejected, device rolled back: {reason}");
        }
        Err(err) => return Err(err.into()),
    }

    driver.close().await?;
    Ok(())
}
