use murmur_event::SyncEventDispatcher;
use murmur_task::async_dispatch;
use murmur_task::pool::{Config, build};

fn main() {
    let pool = build(Config::default()).expect("worker pool");
    let dispatcher = SyncEventDispatcher::new();

    let _connection = dispatcher.connect(|n: &i32| {
        println!("Event value: {n}");
    });

    for i in 0..10 {
        dispatcher.enqueue(i);
    }

    // async_dispatch() drains the queues on the pool instead of
    // the calling thread; wait() blocks until every discrete
    // dispatcher has finished.
    async_dispatch(&dispatcher, &pool).wait();

    for i in 10..20 {
        dispatcher.enqueue(i);
    }

    // A completion can be attached instead of waiting.
    let (done_send, done_recv) = std::sync::mpsc::channel();
    async_dispatch(&dispatcher, &pool).on_complete(move |()| {
        println!("Dispatch completed");
        done_send.send(()).unwrap();
    });
    done_recv.recv().unwrap();
}
