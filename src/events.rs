use std::cell::RefCell;
use std::rc::Rc;

use tsugihagi_core::PocketSaveState;

/// Every notification the mechanics core emits. Consumers register
/// typed callbacks on an [`EventSink`] injected at construction; there
/// is no ambient event namespace.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PiecePlaced { piece_id: usize },
    PocketUpdated { snapshot: PocketSaveState },
    TemplateCaptured { pocket: usize },
    CaptureBlocked { pocket: usize },
    SaveRequested,
    DragEnded { piece_id: usize, snapped: bool },
}

pub type EventSubscriber = Rc<dyn Fn(&GameEvent)>;

/// Cheaply cloneable handle shared by all components of one session.
#[derive(Clone, Default)]
pub struct EventSink {
    subscribers: Rc<RefCell<Vec<EventSubscriber>>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: EventSubscriber) {
        self.subscribers.borrow_mut().push(subscriber);
    }

    pub fn emit(&self, event: GameEvent) {
        let subscribers = self.subscribers.borrow().clone();
        for subscriber in subscribers {
            (subscriber)(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_reaches_every_subscriber() {
        let sink = EventSink::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for _ in 0..2 {
            let seen = Rc::clone(&seen);
            sink.subscribe(Rc::new(move |event| {
                seen.borrow_mut().push(event.clone());
            }));
        }
        sink.emit(GameEvent::SaveRequested);
        assert_eq!(seen.borrow().len(), 2);
    }
}
