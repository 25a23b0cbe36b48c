//! End-to-end clone scenarios against in-memory devices.
