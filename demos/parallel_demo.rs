// Example demonstrating the fixed parallel set: launch every spec at once,
// then wait on one condition per slot.

use proclet::{ProcessGroup, ProcessStatus, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proclet=debug".into()),
        )
        .init();

    let mut group = ProcessGroup::with_specs(vec![
        ServiceConfig::new("/bin/sh").args(["-c", "sleep 0.2; echo fast done"]),
        ServiceConfig::new("/bin/sh").args(["-c", "sleep 0.6; echo slow done"]),
    ]);

    group.start_all().await?;
    println!("launched {} processes", group.attempts().len());

    let fast = group.attempts()[0].clone();
    let slow = group.attempts()[1].clone();

    let results = group
        .wait_all_conditions(vec![
            Box::new({
                let fast = fast.clone();
                move || fast.get_status() == ProcessStatus::Finished
            }) as Box<dyn FnMut() -> bool + Send>,
            Box::new({
                let slow = slow.clone();
                move || slow.get_status() == ProcessStatus::Finished
            }) as Box<dyn FnMut() -> bool + Send>,
        ])
        .await?;

    println!("slot results: {:?}", results);
    println!("fast stdout:  {}", fast.get_stdout().trim());
    println!("slow stdout:  {}", slow.get_stdout().trim());
    println!("group span:   {:?}", group.get_duration());

    // Nothing is cancelled automatically; make the teardown explicit.
    group.stop_all();
    Ok(())
}
