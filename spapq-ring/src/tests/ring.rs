use crate::RingBuffer;

#[test]
fn fifo_order() {
    let values = [8, 5, 2, 1, 34];

    let mut ring = RingBuffer::new(5);
    for &value in &values {
        assert!(ring.push_mut(value));
    }
    for &value in &values {
        assert_eq!(ring.pop_mut(), Some(value));
    }
}

#[test]
fn alternating_push_pop() {
    let values = [9, 23, 4, 1, -5, 123, 23, -23, -82, 0, 0, 1];

    let mut ring = RingBuffer::new(5);
    for &value in &values {
        assert!(ring.push_mut(value));
        assert_eq!(ring.pop_mut(), Some(value));
    }
}

#[test]
fn non_copy_elements() {
    let values = ["Hello World!", "", "Elephant", "312", "All done!"];

    let mut ring = RingBuffer::new(5);
    for value in values {
        assert!(ring.push_mut(String::from(value)));
    }
    for value in values {
        assert_eq!(ring.pop_mut().as_deref(), Some(value));
    }
}

#[test]
fn drops_queued_elements() {
    use std::sync::Arc;

    let marker = Arc::new(());
    let mut ring = RingBuffer::new(4);
    for _ in 0..3 {
        assert!(ring.push_mut(Arc::clone(&marker)));
    }
    assert_eq!(Arc::strong_count(&marker), 4);
    drop(ring);
    assert_eq!(Arc::strong_count(&marker), 1);
}

#[test]
fn rejects_pushes_when_full() {
    let values = [9, 23, 4, 1, -5, 123, 23, -23, -82, 0, 0, 1];

    let mut ring = RingBuffer::new(5);
    assert!(ring.is_empty());
    assert!(!ring.is_full());
    assert_eq!(ring.len(), 0);
    assert_eq!(ring.capacity(), 5);

    for (i, &value) in values.iter().enumerate() {
        assert_eq!(ring.len(), i.min(5));
        let pushed = ring.push_mut(value);
        assert_eq!(ring.len(), (i + 1).min(5));
        assert_eq!(pushed, i < 5);
    }

    assert!(ring.is_full());
}

#[test]
fn fill_then_drain() {
    let values = [9, 23, 4, 1, -5, 123, 23, -23, -82, 0, 0, 1];

    let mut ring = RingBuffer::new(6);
    for (i, &value) in values.iter().enumerate() {
        assert_eq!(ring.push_mut(value), i < 6);
    }
    assert!(ring.is_full());

    for (i, &value) in values.iter().enumerate() {
        if i < 6 {
            assert_eq!(ring.len(), 6 - i);
        } else {
            assert_eq!(ring.len(), 0);
        }

        let popped = ring.pop_mut();
        if i < 6 {
            assert_eq!(popped, Some(value));
            assert_eq!(ring.len(), 5 - i);
        } else {
            assert_eq!(popped, None);
        }
    }

    assert!(ring.is_empty());
}

#[test]
fn slice_pushes_are_all_or_nothing() {
    let values = [9, 23, 4, 1, -5, 123, 23, -23, -82, 0, 0, 1];

    let mut ring = RingBuffer::new(6);
    assert!(!ring.push_slice_mut(&values));
    assert!(ring.is_empty());

    assert!(ring.push_slice_mut(&values[..6]));

    assert!(ring.pop_mut().is_some());
    assert!(ring.pop_mut().is_some());
    assert!(ring.pop_mut().is_some());

    // three free slots: a batch of four must be refused in full
    assert!(!ring.push_slice_mut(&values[..4]));

    assert!(ring.pop_mut().is_some());

    // the cursor has wrapped: this batch lands at the start of the slot array
    assert!(ring.push_slice_mut(&values[..4]));
    assert!(ring.is_full());

    for expected in [-5, 123, 9, 23, 4, 1] {
        assert_eq!(ring.pop_mut(), Some(expected));
    }

    assert!(!ring.is_full());
    assert_eq!(ring.pop_mut(), None);
    assert!(ring.is_empty());
}

#[test]
fn empty_slice_push_succeeds() {
    let mut ring = RingBuffer::<i32>::new(1);
    assert!(ring.push_slice_mut(&[]));
    assert!(ring.is_empty());
}

#[test]
fn capacity_one() {
    let mut ring = RingBuffer::new(1);
    assert!(ring.push_mut(7));
    assert!(!ring.push_mut(8));
    assert_eq!(ring.pop_mut(), Some(7));
    assert_eq!(ring.pop_mut(), None);
}

#[test]
#[should_panic(expected = "at least one element")]
fn zero_capacity_is_refused() {
    let _ = RingBuffer::<u8>::new(0);
}
