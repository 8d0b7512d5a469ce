//! C7: save-state serialization. Symmetric `do_state` over a binary
//! blob, persisting events by their type's *name* rather than its id, so
//! loads across a differently-ordered registration are safe.
//!
//! The wire format matches spec §6 exactly: scalar clock fields, a
//! `"CoreTimingData"` marker, a length-prefixed event vector (each event
//! as `deadline:i64, userdata:u64, type_name:length-prefixed string`),
//! then a `"CoreTimingEvents"` marker. Encoding uses `byteorder` little-
//! endian primitives, the same "versioned outer container, raw scalar
//! primitives" shape as Dolphin's `PointerWrap` — the primitives
//! themselves are the external boundary spec §1 calls out as out of
//! scope; this module is the one piece of this crate that has to give
//! them *some* concrete body to be testable standalone.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

const MARKER_DATA: &str = "CoreTimingData";
const MARKER_EVENTS: &str = "CoreTimingEvents";

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("I/O error during save-state: {0}")]
    Io(#[from] io::Error),
    #[error("marker mismatch: expected \"{expected}\", found \"{found}\"")]
    MarkerMismatch { expected: String, found: String },
    #[error("save-state string is not valid UTF-8")]
    InvalidUtf8,
}

pub type StateResult<T> = Result<T, StateError>;

/// The scalar portion of [`crate::clock::ClockState`] that gets
/// persisted, in field order per spec §6.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockSnapshot {
    pub slice_length: i32,
    pub global_timer: i64,
    pub idled_cycles: i64,
    pub fake_dec_start_value: u32,
    pub fake_dec_start_ticks: u64,
    pub fake_tb_start_value: u64,
    pub fake_tb_start_ticks: u64,
    pub oc_factor: f32,
}

/// One queued event as persisted: type identity travels by name.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedEvent {
    pub deadline: i64,
    pub userdata: u64,
    pub type_name: String,
}

pub fn write_state(
    w: &mut impl Write,
    clock: &ClockSnapshot,
    events: &[PersistedEvent],
) -> StateResult<()> {
    w.write_i32::<LittleEndian>(clock.slice_length)?;
    w.write_i64::<LittleEndian>(clock.global_timer)?;
    w.write_i64::<LittleEndian>(clock.idled_cycles)?;
    w.write_u32::<LittleEndian>(clock.fake_dec_start_value)?;
    w.write_u64::<LittleEndian>(clock.fake_dec_start_ticks)?;
    w.write_u64::<LittleEndian>(clock.fake_tb_start_value)?;
    w.write_u64::<LittleEndian>(clock.fake_tb_start_ticks)?;
    w.write_f32::<LittleEndian>(clock.oc_factor)?;
    write_marker(w, MARKER_DATA)?;

    w.write_u32::<LittleEndian>(events.len() as u32)?;
    for ev in events {
        w.write_i64::<LittleEndian>(ev.deadline)?;
        w.write_u64::<LittleEndian>(ev.userdata)?;
        write_string(w, &ev.type_name)?;
    }
    write_marker(w, MARKER_EVENTS)?;

    Ok(())
}

pub fn read_state(r: &mut impl Read) -> StateResult<(ClockSnapshot, Vec<PersistedEvent>)> {
    let clock = ClockSnapshot {
        slice_length: r.read_i32::<LittleEndian>()?,
        global_timer: r.read_i64::<LittleEndian>()?,
        idled_cycles: r.read_i64::<LittleEndian>()?,
        fake_dec_start_value: r.read_u32::<LittleEndian>()?,
        fake_dec_start_ticks: r.read_u64::<LittleEndian>()?,
        fake_tb_start_value: r.read_u64::<LittleEndian>()?,
        fake_tb_start_ticks: r.read_u64::<LittleEndian>()?,
        oc_factor: r.read_f32::<LittleEndian>()?,
    };
    read_marker(r, MARKER_DATA)?;

    let count = r.read_u32::<LittleEndian>()?;
    let mut events = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let deadline = r.read_i64::<LittleEndian>()?;
        let userdata = r.read_u64::<LittleEndian>()?;
        let type_name = read_string(r)?;
        events.push(PersistedEvent {
            deadline,
            userdata,
            type_name,
        });
    }
    read_marker(r, MARKER_EVENTS)?;

    Ok((clock, events))
}

fn write_string(w: &mut impl Write, s: &str) -> StateResult<()> {
    w.write_u32::<LittleEndian>(s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn read_string(r: &mut impl Read) -> StateResult<String> {
    let len = r.read_u32::<LittleEndian>()? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| StateError::InvalidUtf8)
}

fn write_marker(w: &mut impl Write, marker: &str) -> StateResult<()> {
    write_string(w, marker)
}

/// Markers are verified on load; a mismatch aborts the load (spec §6).
fn read_marker(r: &mut impl Read, expected: &str) -> StateResult<()> {
    let found = read_string(r)?;
    if found != expected {
        return Err(StateError::MarkerMismatch {
            expected: expected.to_string(),
            found,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_clock() -> ClockSnapshot {
        ClockSnapshot {
            slice_length: 12345,
            global_timer: 987654321,
            idled_cycles: 42,
            fake_dec_start_value: 7,
            fake_dec_start_ticks: 8,
            fake_tb_start_value: 9,
            fake_tb_start_ticks: 10,
            oc_factor: 1.5,
        }
    }

    #[test]
    fn round_trips_clock_and_events() {
        let clock = sample_clock();
        let events = vec![
            PersistedEvent {
                deadline: 100,
                userdata: 0x11,
                type_name: "A".to_string(),
            },
            PersistedEvent {
                deadline: 200,
                userdata: 0x22,
                type_name: "B".to_string(),
            },
        ];

        let mut buf = Vec::new();
        write_state(&mut buf, &clock, &events).unwrap();

        let (read_clock, read_events) = read_state(&mut &buf[..]).unwrap();
        assert_eq!(read_clock, clock);
        assert_eq!(read_events, events);
    }

    #[test]
    fn empty_event_list_round_trips() {
        let clock = sample_clock();
        let mut buf = Vec::new();
        write_state(&mut buf, &clock, &[]).unwrap();
        let (_, events) = read_state(&mut &buf[..]).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn corrupted_marker_is_rejected() {
        let clock = sample_clock();
        let mut buf = Vec::new();
        write_state(&mut buf, &clock, &[]).unwrap();
        // Flip a byte inside the first marker's length-prefixed string.
        let marker_len_offset = 4 + 8 + 8 + 4 + 8 + 8 + 8 + 4; // after scalars, at string len
        buf[marker_len_offset] ^= 0xFF;
        assert!(matches!(
            read_state(&mut &buf[..]),
            Err(StateError::MarkerMismatch { .. }) | Err(StateError::Io(_))
        ));
    }
}
