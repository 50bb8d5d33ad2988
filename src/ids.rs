//! W3C Trace Context compliant identifier generation.
//!
//! Operation ids are used as trace-wide correlation keys and must not collide
//! under concurrent load, so both generators draw from the thread-local
//! CSPRNG.

/// Generate a new operation (trace) id: 16 random bytes as 32 lowercase hex
/// characters.
pub fn new_trace_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// Generate a new span id for an individual telemetry item: 8 random bytes
/// as 16 lowercase hex characters.
pub fn new_span_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}
