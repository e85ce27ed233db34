use relayq::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

fn main() -> DispatchResult<()> {
    let config = DispatcherConfig::development().with_name("accumulator");
    config.logging.init()?;

    let total = Arc::new(AtomicU64::new(0));
    let sink = Arc::clone(&total);

    let dispatcher = Arc::new(QueuedDispatcher::with_config(config));
    dispatcher.register_handler(move |n: u64| {
        sink.fetch_add(n, Ordering::SeqCst);
        Outcome::Good
    });

    dispatcher.start()?;

    // Four producers posting concurrently
    let producers: Vec<_> = (0..4u64)
        .map(|p| {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || {
                for i in 0..1000 {
                    dispatcher.post_message(p * 1000 + i);
                }
            })
        })
        .collect();

    for producer in producers {
        let _ = producer.join();
    }

    let status = dispatcher.drain_and_join();
    println!("📨 Dispatcher finished: {:?}", status);
    println!("📨 Total: {}", total.load(Ordering::SeqCst));
    println!("📨 Stats: {:?}", dispatcher.stats());

    status.map(ExitStatus::into_result).unwrap_or(Ok(()))
}
