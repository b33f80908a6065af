use murmur_event::{ScopedConnection, SignalHandler};

fn main() {
    let handler: SignalHandler<i32> = SignalHandler::new();

    // Connect a function matching the handler's signature.
    let _first = handler.connect(|n: &mut i32| {
        println!("Received signal: {n}");
    });

    // Every connected function is invoked with the signal arguments.
    handler.publish(&mut 0);

    // connect() returns a connection that can detach the listener again.
    let mut connection = handler.connect(|_: &mut i32| {});
    connection.disconnect();

    // A scoped connection disconnects automatically when dropped.
    let _scoped = ScopedConnection::new(handler.connect(|_: &mut i32| {}));

    // Return values are collected in connection order.
    let doubler: SignalHandler<i32, i32> = SignalHandler::new();
    let _c1 = doubler.connect(|n: &mut i32| *n * 2);
    let _c2 = doubler.connect(|n: &mut i32| *n * 10);
    println!("Collected results: {:?}", doubler.publish(&mut 5));
}
