//! Injected time and order-id sources.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::VecDeque;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// Manually advanced clock.
#[derive(Debug)]
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self { Self(Mutex::new(at)) }
    pub fn advance(&self, by: Duration) { *self.0.lock() += by; }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> { *self.0.lock() }
}

/// Produces candidate order ids. Uniqueness is checked by the order ledger.
pub trait OrderIdGenerator: Send + Sync {
    fn next_id(&self, now: DateTime<Utc>) -> String;
}

/// `ORD{epoch-ms}-{6 hex}`: time-ordered with a random suffix so rapid
/// repeated submits within one millisecond do not collide.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampIds;

impl OrderIdGenerator for TimestampIds {
    fn next_id(&self, now: DateTime<Utc>) -> String {
        let suffix: u32 = rand::thread_rng().gen_range(0..0x100_0000);
        format!("ORD{}-{suffix:06X}", now.timestamp_millis())
    }
}

/// Hands out a fixed script of ids, then `ORD-{n}` counting up.
#[derive(Debug, Default)]
pub struct ScriptedIds {
    script: Mutex<VecDeque<String>>,
    counter: Mutex<u64>,
}

impl ScriptedIds {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { script: Mutex::new(ids.into_iter().map(Into::into).collect()), counter: Mutex::new(0) }
    }
}

impl OrderIdGenerator for ScriptedIds {
    fn next_id(&self, _now: DateTime<Utc>) -> String {
        if let Some(id) = self.script.lock().pop_front() {
            return id;
        }
        let mut counter = self.counter.lock();
        *counter += 1;
        format!("ORD-{}", *counter)
    }
}
