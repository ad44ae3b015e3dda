use anyhow::{Context, Result};
use rexos::driver::{ExosDriver, NetworkDriver};

fn required_arg(args: &[String], index: usize, name: &str) -> Result<String> {
    args.get(index)
        .cloned()
        .with_context(|| format!("missing argument <{name}>; usage: facts_workflow <host> <user> <password>"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let host = required_arg(&args, 1, "host")?;
    let user = required_arg(&args, 2, "user")?;
    let password = required_arg(&args, 3, "password")?;

    let mut driver = ExosDriver::new(&host, &user, &password);
    driver.open().await?;

    let facts = driver.get_facts().await?;
    println!(
        "host={} vendor={} model={} serial={} os={}",
        facts.hostname, facts.vendor, facts.model, facts.serial_number, facts.os_version
    );

    let interfaces = driver.get_interfaces().await?;
    for (port, interface) in &interfaces {
        println!("  port={port} speed_mbps={}", interface.speed_mbps);
    }

    driver.close().await?;
    Ok(())
}
