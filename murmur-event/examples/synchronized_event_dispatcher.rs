use murmur_event::SyncEventDispatcher;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::thread;

#[derive(Clone)]
struct Sample {
    value: i64,
}

fn main() {
    let dispatcher = SyncEventDispatcher::new();
    let total = Arc::new(AtomicI64::new(0));

    let moved = total.clone();
    let _connection = dispatcher.connect(move |sample: &Sample| {
        moved.fetch_add(sample.value, Ordering::Relaxed);
    });

    // Producers enqueue concurrently from their own threads.
    let mut producers = Vec::new();
    for thread_index in 0..4 {
        let dispatcher = dispatcher.clone();
        producers.push(thread::spawn(move || {
            for _ in 0..10_000 {
                dispatcher.enqueue(Sample { value: 1 });
            }
            println!("Producer {thread_index} finished");
        }));
    }
    for producer in producers {
        producer.join().unwrap();
    }

    // One dispatch drains everything enqueued so far.
    dispatcher.dispatch();
    println!("Delivered total: {}", total.load(Ordering::Relaxed));
}
