use murmur_event::EventDispatcher;

struct ContrivedEvent {
    value: i32,
}

fn main() {
    let dispatcher = EventDispatcher::new();

    // Listeners subscribe to one event type; the closure's
    // argument type picks the type to subscribe to.
    let _connection = dispatcher.connect(|event: &ContrivedEvent| {
        println!("Received an event: {}", event.value);
    });

    // Events can be enqueued for later dispatch.
    dispatcher.enqueue(ContrivedEvent { value: 0 });
    dispatcher.enqueue(ContrivedEvent { value: 1 });

    // send() invokes the listeners immediately instead.
    dispatcher.send(ContrivedEvent { value: 2 });

    // dispatch() delivers all enqueued events.
    dispatcher.dispatch();
}
