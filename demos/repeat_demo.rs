// Example demonstrating the sequential retry engine: one command template
// driven through attempts until an externally observable condition holds.

use proclet::{ProcessGroup, ServiceConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proclet=debug".into()),
        )
        .init();

    let marker = std::env::temp_dir().join("proclet-repeat-demo.ready");
    let _ = std::fs::remove_file(&marker);

    // Each attempt eventually drops a marker file; the condition watches
    // for it from the outside.
    let template = ServiceConfig::new("/bin/sh").args([
        "-c".to_string(),
        format!("sleep 0.3; touch {}", marker.display()),
    ]);

    let mut group = ProcessGroup::new(template);

    let marker_probe = marker.clone();
    let ready = group
        .repeat(
            move || marker_probe.exists(),
            Duration::from_millis(5000),
            Duration::from_millis(200),
        )
        .await?;

    println!("condition met: {}", ready);
    println!("attempts used: {}", group.attempts().len());
    println!("total span:    {:?}", group.get_duration());

    for (i, attempt) in group.attempts().iter().enumerate() {
        println!(
            "  attempt {}: status={} pid={:?} exit={}",
            i,
            attempt.get_status(),
            attempt.get_pid(),
            attempt.get_exit_code()
        );
    }

    let _ = std::fs::remove_file(&marker);
    Ok(())
}
