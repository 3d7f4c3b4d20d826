use std::{cell::RefCell, rc::Rc};

use slotmap::SlotMap;

slotmap::new_key_type! {
    pub struct ListenerKey;
}

/// Which piece of in-memory state just changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    Settings,
    Pets,
    History,
    Prediction,
}

type Listener = Rc<dyn Fn(Topic)>;

/// Change callbacks shared by all stores.
#[derive(Clone, Default)]
pub struct Listeners {
    listeners: Rc<RefCell<SlotMap<ListenerKey, Listener>>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: impl Fn(Topic) + 'static) -> ListenerKey {
        self.listeners.borrow_mut().insert(Rc::new(listener))
    }

    pub fn unregister(&self, key: ListenerKey) {
        self.listeners.borrow_mut().remove(key);
    }

    /// Must be called after the store has released its own state borrow:
    /// listeners usually read the state straight back.
    pub fn notify(&self, topic: Topic) {
        // collect first so a listener can (un)register without a re-borrow panic
        let listeners: Vec<Listener> = self.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener(topic);
        }
    }
}
