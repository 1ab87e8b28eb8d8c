use flagcast::{AdapterEvent, AdapterStatus, FlagSet, UpdateEmitter};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_listeners_called_in_registration_order() {
    let emitter = UpdateEmitter::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    for index in 0..3 {
        let order = Arc::clone(&order);
        emitter.on(move |_| order.lock().push(index));
    }

    emitter.emit(&AdapterEvent::StatusChanged(AdapterStatus::ready()));

    assert_eq!(*order.lock(), vec![0, 1, 2]);
}

#[test]
fn test_listener_receives_event() {
    let emitter = UpdateEmitter::new();
    let received = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&received);
    emitter.on(move |event| log.lock().push(event.clone()));

    let flags = FlagSet::new().with("aFlag", true);
    emitter.emit(&AdapterEvent::FlagsChanged(flags.clone()));

    assert_eq!(*received.lock(), vec![AdapterEvent::FlagsChanged(flags)]);
}

#[test]
fn test_no_replay_for_late_listeners() {
    let emitter = UpdateEmitter::new();
    emitter.emit(&AdapterEvent::StatusChanged(AdapterStatus::ready()));

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    emitter.on(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_emit_without_listeners() {
    let emitter = UpdateEmitter::new();
    emitter.emit(&AdapterEvent::StatusChanged(AdapterStatus::default()));
    assert_eq!(emitter.listener_count(), 0);
}

#[test]
fn test_off_removes_listener() {
    let emitter = UpdateEmitter::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let id = emitter.on(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert!(emitter.off(id));
    assert!(!emitter.off(id));

    emitter.emit(&AdapterEvent::StatusChanged(AdapterStatus::ready()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_listener_may_register_during_emit() {
    let emitter = Arc::new(UpdateEmitter::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let inner_emitter = Arc::clone(&emitter);
    let counter = Arc::clone(&calls);
    emitter.on(move |_| {
        let counter = Arc::clone(&counter);
        inner_emitter.on(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    });

    emitter.emit(&AdapterEvent::StatusChanged(AdapterStatus::ready()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(emitter.listener_count(), 2);
}
