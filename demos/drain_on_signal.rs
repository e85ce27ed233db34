use relayq::prelude::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> DispatchResult<()> {
    let config = DispatcherConfig::development()
        .with_name("ticker")
        .with_drain_poll_interval(10);
    config.logging.init()?;

    let dispatcher: Arc<QueuedDispatcher<String>> = Arc::new(QueuedDispatcher::with_config(config));
    dispatcher.register_handler(|line: String| {
        tracing::info!("handled: {}", line);
        Outcome::Good
    });

    dispatcher.start()?;

    // Feed the dispatcher until Ctrl+C
    let producer = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_millis(250));
            for n in 0u64.. {
                tick.tick().await;
                if !dispatcher.is_running() {
                    break;
                }
                dispatcher.post_message(format!("tick #{n}"));
            }
        })
    };

    println!("📨 Dispatcher is running! Press Ctrl+C to drain and stop...");

    let status = dispatcher.drain_on_ctrl_c().await?;
    producer.abort();

    println!("📨 Dispatcher stopped: {:?}", status);
    Ok(())
}
