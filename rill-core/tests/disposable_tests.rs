// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rill_core::{
    disposed, ActionDisposable, CompositeDisposable, Disposable, FlagDisposable, SerialDisposable,
    SubscriptionSlot,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_action_disposable_runs_exactly_once() {
    // Arrange
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let disposable = ActionDisposable::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert!(!disposable.is_disposed());

    // Act
    disposable.dispose();
    disposable.dispose();

    // Assert
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(disposable.is_disposed());
}

#[test]
fn test_empty_disposable_is_born_disposed() {
    let empty = disposed();
    assert!(empty.is_disposed());
    empty.dispose();
    assert!(empty.is_disposed());
}

#[test]
fn test_composite_disposes_all_children() {
    // Arrange
    let composite = CompositeDisposable::new();
    let first = Arc::new(FlagDisposable::new());
    let second = Arc::new(FlagDisposable::new());
    assert!(composite.add(first.clone()));
    assert!(composite.add(second.clone()));
    assert_eq!(composite.len(), 2);

    // Act
    composite.dispose();

    // Assert
    assert!(first.is_disposed());
    assert!(second.is_disposed());
    assert!(composite.is_disposed());
}

#[test]
fn test_composite_disposes_late_additions_immediately() {
    // Arrange
    let composite = CompositeDisposable::new();
    composite.dispose();
    let late = Arc::new(FlagDisposable::new());

    // Act
    let added = composite.add(late.clone());

    // Assert
    assert!(!added);
    assert!(late.is_disposed());
}

#[test]
fn test_composite_delete_does_not_dispose() {
    let composite = CompositeDisposable::new();
    let child = Arc::new(FlagDisposable::new());
    let handle: Arc<dyn Disposable> = child.clone();
    composite.add(handle.clone());

    assert!(composite.delete(&handle));
    assert!(!child.is_disposed());
    assert!(composite.is_empty());
}

#[test]
fn test_serial_replacement_disposes_previous() {
    // Arrange
    let serial = SerialDisposable::new();
    let first = Arc::new(FlagDisposable::new());
    let second = Arc::new(FlagDisposable::new());

    // Act
    assert!(serial.set(first.clone()));
    assert!(serial.set(second.clone()));

    // Assert
    assert!(first.is_disposed());
    assert!(!second.is_disposed());
}

#[test]
fn test_serial_rejects_sets_after_dispose() {
    // Arrange
    let serial = SerialDisposable::new();
    let held = Arc::new(FlagDisposable::new());
    serial.set(held.clone());

    // Act
    serial.dispose();
    let rejected = Arc::new(FlagDisposable::new());
    let accepted = serial.set(rejected.clone());

    // Assert
    assert!(held.is_disposed());
    assert!(!accepted);
    assert!(rejected.is_disposed());
    assert!(serial.is_disposed());
}

#[test]
fn test_slot_accepts_only_the_first_assignment() {
    // Arrange
    let slot = SubscriptionSlot::new();
    let first = Arc::new(FlagDisposable::new());
    let second = Arc::new(FlagDisposable::new());

    // Act
    let first_set = slot.try_set(first.clone());
    let second_set = slot.try_set(second.clone());

    // Assert
    assert!(first_set);
    assert!(!second_set);
    assert!(!first.is_disposed());
    assert!(second.is_disposed(), "the newcomer must be disposed");
}

#[test]
fn test_slot_disposes_assignments_after_dispose() {
    let slot = SubscriptionSlot::new();
    slot.dispose();

    let incoming = Arc::new(FlagDisposable::new());
    assert!(!slot.try_set(incoming.clone()));
    assert!(incoming.is_disposed());
}
