//! C1: the event type registry. Maps a stable name to a numeric id and
//! a callback. Registration is single-threaded (init time only); once
//! built, lookups are lock-free.

use crate::queue::{CyclesLate, UserData};

pub type TypeId = usize;

/// `(userdata, cycles_late) -> ()`. Boxed so any subsystem can register
/// a closure, the same shape as `src/c64_emu/event.rs`'s `EventAction`.
pub type Callback = Box<dyn FnMut(UserData, CyclesLate)>;

pub struct EventType {
    pub name: String,
    pub callback: Callback,
}

fn empty_callback(_userdata: UserData, _cycles_late: CyclesLate) {}

pub struct EventTypeRegistry {
    types: Vec<EventType>,
    lost_event: TypeId,
}

impl EventTypeRegistry {
    /// A fresh registry with the `_lost_event` sentinel already
    /// registered at id 0, mirroring `CoreTiming::Init`'s
    /// `s_ev_lost = RegisterEvent("_lost_event", &EmptyTimedCallback)`.
    pub fn new() -> Self {
        let mut reg = Self {
            types: Vec::new(),
            lost_event: 0,
        };
        reg.lost_event = reg.register("_lost_event", Box::new(empty_callback));
        reg
    }

    pub fn lost_event_id(&self) -> TypeId {
        self.lost_event
    }

    /// Register `name` with `callback`, returning its id. If an existing
    /// entry already has this name, that entry is gutted in place
    /// (renamed to `_discarded_event`, callback replaced with a no-op)
    /// rather than removed, so outstanding id handles keep pointing at a
    /// harmless slot instead of aliasing the new registration.
    pub fn register(&mut self, name: &str, callback: Callback) -> TypeId {
        for existing in self.types.iter_mut() {
            if existing.name == name {
                log::warn!(
                    "core-timing: discarded old event type \"{name}\" because a new type with \
                     the same name was registered"
                );
                existing.name = "_discarded_event".to_string();
                existing.callback = Box::new(empty_callback);
            }
        }
        self.types.push(EventType {
            name: name.to_string(),
            callback,
        });
        self.types.len() - 1
    }

    /// Empties the registry. Callers must ensure the primary queue is
    /// empty first (see `Scheduler::unregister_all`); this method itself
    /// performs no such check.
    pub fn clear(&mut self) {
        self.types.clear();
        self.types.shrink_to_fit();
    }

    pub fn name(&self, id: TypeId) -> Option<&str> {
        self.types.get(id).map(|t| t.name.as_str())
    }

    pub fn id_of(&self, name: &str) -> Option<TypeId> {
        self.types.iter().position(|t| t.name == name)
    }

    pub fn is_registered(&self, id: TypeId) -> bool {
        id < self.types.len()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn dispatch(&mut self, id: TypeId, userdata: UserData, cycles_late: CyclesLate) {
        if let Some(t) = self.types.get_mut(id) {
            (t.callback)(userdata, cycles_late);
        }
    }
}

impl Default for EventTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_registered_at_init() {
        let reg = EventTypeRegistry::new();
        assert_eq!(reg.name(reg.lost_event_id()), Some("_lost_event"));
    }

    #[test]
    fn duplicate_name_gut_old_entry() {
        let mut reg = EventTypeRegistry::new();
        let a1 = reg.register("A", Box::new(|_, _| {}));
        let a2 = reg.register("A", Box::new(|_, _| {}));
        assert_ne!(a1, a2);
        assert_eq!(reg.name(a1), Some("_discarded_event"));
        assert_eq!(reg.name(a2), Some("A"));
    }

    #[test]
    fn id_of_finds_active_name_only() {
        let mut reg = EventTypeRegistry::new();
        reg.register("A", Box::new(|_, _| {}));
        reg.register("A", Box::new(|_, _| {}));
        assert_eq!(reg.id_of("A"), Some(2));
    }
}
