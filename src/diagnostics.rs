//! C8: read-only snapshots of the primary queue for logging. Takes a
//! *copy*, sorts it, and formats it — the live queue is never mutated.

use crate::collaborators::PanicNotifier;
use crate::event_types::EventTypeRegistry;
use crate::queue::EventQueue;

const INVALID_LABEL: &str = "<INVALID>";

fn sorted_copy(queue: &EventQueue) -> Vec<crate::queue::Event> {
    let mut clone: Vec<_> = queue.iter().copied().collect();
    clone.sort_by_key(|e| e.deadline);
    clone
}

/// `log_pending_events()`: emit one `info!` line per event. Unknown
/// type ids render as `<INVALID>` but are otherwise just logged, no
/// panic notification (that's reserved for the summary-string variant).
pub fn log_pending_events(queue: &EventQueue, registry: &EventTypeRegistry, now: i64) {
    for ev in sorted_copy(queue) {
        let name = registry.name(ev.type_id).unwrap_or(INVALID_LABEL);
        log::info!(
            "PENDING: now={now} deadline={deadline} type={name} ({type_id}) userdata={userdata:#x}",
            deadline = ev.deadline,
            type_id = ev.type_id,
            userdata = ev.userdata,
        );
    }
}

/// `scheduled_events_summary()`: one formatted `"name : time userdata"`
/// line per event. An invalid type id raises a panic notification and
/// is skipped from the output, matching `GetScheduledEventsSummary`'s
/// `PanicAlertT` + `continue`.
pub fn scheduled_events_summary(
    queue: &EventQueue,
    registry: &EventTypeRegistry,
    panic: &mut dyn PanicNotifier,
) -> String {
    let mut text = String::from("Scheduled events\n");
    for ev in sorted_copy(queue) {
        match registry.name(ev.type_id) {
            Some(name) => {
                text.push_str(&format!(
                    "{name} : {deadline} {userdata:016x}\n",
                    deadline = ev.deadline,
                    userdata = ev.userdata,
                ));
            }
            None => {
                panic.notify(&format!("Invalid event type {}", ev.type_id));
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::LoggingPanicNotifier;
    use crate::queue::Event;

    fn registry_with(names: &[&str]) -> EventTypeRegistry {
        let mut reg = EventTypeRegistry::new();
        for name in names {
            reg.register(name, Box::new(|_, _| {}));
        }
        reg
    }

    #[test]
    fn summary_sorts_by_deadline() {
        let reg = registry_with(&["A", "B"]);
        let mut q = EventQueue::new();
        q.push(Event {
            deadline: 200,
            userdata: 2,
            type_id: reg.id_of("B").unwrap(),
        });
        q.push(Event {
            deadline: 100,
            userdata: 1,
            type_id: reg.id_of("A").unwrap(),
        });
        let mut panic = LoggingPanicNotifier::default();
        let summary = scheduled_events_summary(&q, &reg, &mut panic);
        let a_pos = summary.find("A : 100").unwrap();
        let b_pos = summary.find("B : 200").unwrap();
        assert!(a_pos < b_pos);
        assert_eq!(panic.count, 0);
    }

    #[test]
    fn unknown_type_id_triggers_panic_notification_and_is_skipped() {
        let reg = registry_with(&["A"]);
        let mut q = EventQueue::new();
        q.push(Event {
            deadline: 10,
            userdata: 0,
            type_id: 999,
        });
        let mut panic = LoggingPanicNotifier::default();
        let summary = scheduled_events_summary(&q, &reg, &mut panic);
        assert_eq!(panic.count, 1);
        assert!(!summary.contains("999"));
    }

    #[test]
    fn does_not_mutate_the_queue() {
        let reg = registry_with(&["A"]);
        let mut q = EventQueue::new();
        q.push(Event {
            deadline: 10,
            userdata: 0,
            type_id: 0,
        });
        q.push(Event {
            deadline: 5,
            userdata: 0,
            type_id: 0,
        });
        let before = q.len();
        log_pending_events(&q, &reg, 0);
        let mut panic = LoggingPanicNotifier::default();
        scheduled_events_summary(&q, &reg, &mut panic);
        assert_eq!(q.len(), before);
        assert_eq!(q.peek().unwrap().deadline, 5);
    }
}
