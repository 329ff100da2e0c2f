//! Load-aware selection of the next connection.
//!
//! Both selectors drive off the same belt: with `n` live elements, an
//! element's belt share is `round(a * load + b)` where the line maps the
//! lowest load to `n` slots and the highest to one slot (equal loads all
//! get one slot). The belt interleaves elements and is rebuilt on every
//! mutation, over the Online elements when any exist, otherwise over all of
//! them so banned endpoints still drain traffic.

use std::sync::Arc;

use crate::conn::{Conn, ConnState};
use crate::error::{ClientErrorKind, ClientResult};

/// Balancer attributes of one endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnInfo {
    pub load_factor: f32,
}

/// Opaque handle to an inserted element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Element(u64);

/// The selection contract. Methods take `&mut self`; the owning registry
/// provides the single guarding mutex, which keeps a discovery refresh
/// atomic with respect to selection.
pub trait Balancer: Send {
    /// Adds an element in Online state.
    fn insert(&mut self, conn: Arc<Conn>, info: ConnInfo) -> Element;

    /// Refreshes the load factor of an existing element.
    fn update(&mut self, el: Element, info: ConnInfo) -> bool;

    /// Removes by handle, marking the connection Offline.
    fn remove(&mut self, el: Element) -> bool;

    /// Bans the element's connection. Returns [`ClientErrorKind::AllBanned`]
    /// iff this call left no Online element; the ban is applied either way.
    fn pessimize(&mut self, el: Element) -> ClientResult<()>;

    /// Picks one connection. Returns `None` only when the element set is
    /// empty; this never blocks.
    fn next(&mut self) -> Option<Arc<Conn>>;

    fn contains(&self, el: Element) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
struct Entry {
    id: u64,
    conn: Arc<Conn>,
    load_factor: f32,
}

/// Element table plus belt, shared by both selector variants.
#[derive(Debug, Default)]
struct Core {
    entries: Vec<Entry>,
    belt: Vec<usize>,
    next_id: u64,
}

impl Core {
    fn insert(&mut self, conn: Arc<Conn>, info: ConnInfo) -> Element {
        conn.set_state(ConnState::Online);
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            conn,
            load_factor: info.load_factor,
        });
        self.rebuild();
        Element(id)
    }

    fn update(&mut self, el: Element, info: ConnInfo) -> bool {
        let Some(pos) = self.position(el) else {
            return false;
        };
        self.entries[pos].load_factor = info.load_factor;
        self.rebuild();
        true
    }

    fn remove(&mut self, el: Element) -> bool {
        let Some(pos) = self.position(el) else {
            return false;
        };
        let entry = self.entries.remove(pos);
        entry.conn.set_state(ConnState::Offline);
        self.rebuild();
        true
    }

    fn pessimize(&mut self, el: Element) -> ClientResult<()> {
        let Some(pos) = self.position(el) else {
            return Ok(());
        };
        let was_online = self.entries[pos].conn.is_online();
        self.entries[pos].conn.set_state(ConnState::Banned);
        self.rebuild();
        if was_online && !self.entries.iter().any(|e| e.conn.is_online()) {
            return Err(ClientErrorKind::AllBanned.into());
        }
        Ok(())
    }

    fn contains(&self, el: Element) -> bool {
        self.position(el).is_some()
    }

    fn position(&self, el: Element) -> Option<usize> {
        self.entries.iter().position(|e| e.id == el.0)
    }

    fn rebuild(&mut self) {
        self.belt.clear();
        let online: Vec<usize> = (0..self.entries.len())
            .filter(|&i| self.entries[i].conn.is_online())
            .collect();
        let chosen = if online.is_empty() {
            (0..self.entries.len()).collect()
        } else {
            online
        };
        if chosen.is_empty() {
            return;
        }
        let loads: Vec<f32> = chosen.iter().map(|&i| self.entries[i].load_factor).collect();
        let mut remaining = belt_counts(&loads);
        loop {
            let mut exhausted = true;
            for (slot, &pos) in chosen.iter().enumerate() {
                if remaining[slot] > 0 {
                    remaining[slot] -= 1;
                    self.belt.push(pos);
                    exhausted = false;
                }
            }
            if exhausted {
                break;
            }
        }
    }
}

/// Belt slots per element: a linear map giving the least-loaded element `n`
/// slots and the most-loaded one slot.
fn belt_counts(loads: &[f32]) -> Vec<usize> {
    let n = loads.len();
    let min = loads.iter().copied().fold(f32::INFINITY, f32::min);
    let max = loads.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !(max > min) {
        return vec![1; n];
    }
    let a = (1.0 - n as f64) / f64::from(max - min);
    let b = n as f64 - a * f64::from(min);
    loads
        .iter()
        .map(|&x| ((a * f64::from(x) + b).round() as usize).max(1))
        .collect()
}

/// Deterministic belt walker: consecutive calls step through the belt, so
/// observed shares converge to the belt shares exactly.
#[derive(Debug, Default)]
pub struct RoundRobin {
    core: Core,
    cursor: usize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Balancer for RoundRobin {
    fn insert(&mut self, conn: Arc<Conn>, info: ConnInfo) -> Element {
        self.core.insert(conn, info)
    }

    fn update(&mut self, el: Element, info: ConnInfo) -> bool {
        self.core.update(el, info)
    }

    fn remove(&mut self, el: Element) -> bool {
        self.core.remove(el)
    }

    fn pessimize(&mut self, el: Element) -> ClientResult<()> {
        self.core.pessimize(el)
    }

    fn next(&mut self) -> Option<Arc<Conn>> {
        if self.core.belt.is_empty() {
            return None;
        }
        let slot = self.core.belt[self.cursor % self.core.belt.len()];
        self.cursor = self.cursor.wrapping_add(1);
        Some(Arc::clone(&self.core.entries[slot].conn))
    }

    fn contains(&self, el: Element) -> bool {
        self.core.contains(el)
    }

    fn len(&self) -> usize {
        self.core.entries.len()
    }
}

/// Randomized variant: each call picks a uniformly random belt slot, so
/// observed shares converge to the belt shares in the long run.
#[derive(Debug)]
pub struct RandomChoice {
    core: Core,
    rng: fastrand::Rng,
}

impl RandomChoice {
    pub fn new() -> Self {
        Self {
            core: Core::default(),
            rng: fastrand::Rng::new(),
        }
    }

    /// Deterministic selection sequence, for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            core: Core::default(),
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Default for RandomChoice {
    fn default() -> Self {
        Self::new()
    }
}

impl Balancer for RandomChoice {
    fn insert(&mut self, conn: Arc<Conn>, info: ConnInfo) -> Element {
        self.core.insert(conn, info)
    }

    fn update(&mut self, el: Element, info: ConnInfo) -> bool {
        self.core.update(el, info)
    }

    fn remove(&mut self, el: Element) -> bool {
        self.core.remove(el)
    }

    fn pessimize(&mut self, el: Element) -> ClientResult<()> {
        self.core.pessimize(el)
    }

    fn next(&mut self) -> Option<Arc<Conn>> {
        if self.core.belt.is_empty() {
            return None;
        }
        let slot = self.core.belt[self.rng.usize(0..self.core.belt.len())];
        Some(Arc::clone(&self.core.entries[slot].conn))
    }

    fn contains(&self, el: Element) -> bool {
        self.core.contains(el)
    }

    fn len(&self) -> usize {
        self.core.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::endpoint::Endpoint;

    struct Case {
        add: &'static [(&'static str, f32)],
        del: &'static [&'static str],
        banned: &'static [&'static str],
        repeat: usize,
        expect: &'static [(&'static str, usize)],
    }

    const CASES: &[Case] = &[
        Case {
            add: &[("foo", 0.0), ("bar", 0.0)],
            del: &[],
            banned: &[],
            repeat: 1000,
            expect: &[("foo", 500), ("bar", 500)],
        },
        Case {
            add: &[("foo", 0.2), ("bar", 1.0), ("baz", 1.0)],
            del: &[],
            banned: &[],
            repeat: 1000,
            expect: &[("foo", 600), ("bar", 200), ("baz", 200)],
        },
        Case {
            add: &[("foo", 1.0), ("bar", 0.1), ("baz", 0.9)],
            del: &[],
            banned: &[],
            repeat: 1000,
            expect: &[("foo", 200), ("bar", 600), ("baz", 200)],
        },
        Case {
            add: &[("foo", 0.25), ("bar", 1.0), ("baz", 1.0)],
            del: &["foo"],
            banned: &[],
            repeat: 1000,
            expect: &[("bar", 500), ("baz", 500)],
        },
        Case {
            add: &[("foo", 1.0), ("bar", 0.25), ("baz", 0.25)],
            del: &["foo"],
            banned: &[],
            repeat: 1000,
            expect: &[("bar", 500), ("baz", 500)],
        },
        Case {
            add: &[("foo", 1.0), ("bar", 0.75), ("baz", 0.25)],
            del: &["bar"],
            banned: &[],
            repeat: 1200,
            expect: &[("foo", 400), ("baz", 800)],
        },
        Case {
            add: &[("foo", 0.0), ("bar", 0.0), ("baz", 0.0)],
            del: &["baz"],
            banned: &[],
            repeat: 1000,
            expect: &[("foo", 500), ("bar", 500)],
        },
        Case {
            add: &[("foo", 0.0), ("bar", 0.0), ("baz", 0.0)],
            del: &[],
            banned: &["foo", "bar"],
            repeat: 100,
            expect: &[("baz", 100)],
        },
        Case {
            add: &[("foo", 0.0), ("bar", 0.0), ("baz", 0.0)],
            del: &[],
            banned: &["foo"],
            repeat: 100,
            expect: &[("bar", 50), ("baz", 50)],
        },
        Case {
            add: &[("foo", 0.0), ("bar", 0.0), ("baz", 0.0)],
            del: &[],
            banned: &["foo", "bar", "baz"],
            repeat: 150,
            expect: &[("foo", 50), ("bar", 50), ("baz", 50)],
        },
        Case {
            add: &[("foo", 10.0), ("bar", 20.0), ("baz", 30.0)],
            del: &[],
            banned: &["foo", "bar", "baz"],
            repeat: 150,
            expect: &[("foo", 75), ("bar", 50), ("baz", 25)],
        },
        Case {
            add: &[("foo", 10.0), ("bar", 20.0), ("baz", 30.0)],
            del: &[],
            banned: &["foo"],
            repeat: 150,
            expect: &[("foo", 0), ("bar", 100), ("baz", 50)],
        },
    ];

    fn run_case(balancer: &mut dyn Balancer, case: &Case, repeat: usize) -> HashMap<String, usize> {
        let mut elements = HashMap::new();
        for (addr, load) in case.add {
            let conn = Arc::new(Conn::new(Endpoint::new(*addr, 2136)));
            let el = balancer.insert(
                conn,
                ConnInfo {
                    load_factor: *load,
                },
            );
            elements.insert(addr.to_string(), el);
        }
        for addr in case.del {
            assert!(balancer.remove(elements[*addr]));
        }
        for addr in case.banned {
            // AllBanned is advisory; the ban itself always lands.
            let _ = balancer.pessimize(elements[*addr]);
        }
        let mut dist: HashMap<String, usize> = HashMap::new();
        for _ in 0..repeat {
            match balancer.next() {
                Some(conn) => *dist.entry(conn.endpoint().addr.clone()).or_default() += 1,
                None => assert!(case.add.len() <= case.del.len(), "unexpected empty pick"),
            }
        }
        dist
    }

    #[test]
    fn round_robin_distribution_is_exact() {
        for (i, case) in CASES.iter().enumerate() {
            let mut balancer = RoundRobin::new();
            let dist = run_case(&mut balancer, case, case.repeat);
            for (addr, expected) in case.expect {
                let got = dist.get(*addr).copied().unwrap_or(0);
                assert_eq!(got, *expected, "case {i}, addr {addr}");
            }
            let named: usize = case.expect.iter().map(|(_, n)| n).sum();
            let total: usize = dist.values().sum();
            assert_eq!(total, named, "case {i} routed to unexpected endpoints");
        }
    }

    #[test]
    fn random_choice_distribution_within_tolerance() {
        // More trials than the exact-walk test so the +/-10% band sits many
        // standard deviations out.
        const SCALE: usize = 100;
        for (i, case) in CASES.iter().enumerate() {
            let mut balancer = RandomChoice::with_seed(0x5eed + i as u64);
            let dist = run_case(&mut balancer, case, case.repeat * SCALE);
            for (addr, expected) in case.expect {
                let got = dist.get(*addr).copied().unwrap_or(0);
                let expected = expected * SCALE;
                let tolerance = expected / 10;
                assert!(
                    got >= expected.saturating_sub(tolerance) && got <= expected + tolerance,
                    "case {i}, addr {addr}: got {got}, want {expected} +/- {tolerance}"
                );
            }
        }
    }

    #[test]
    fn next_on_empty_set_is_none() {
        let mut balancer = RoundRobin::new();
        assert!(balancer.next().is_none());
        assert!(balancer.is_empty());
    }

    #[test]
    fn pessimize_reports_all_banned_only_on_the_last_online() {
        let mut balancer = RoundRobin::new();
        let a = balancer.insert(
            Arc::new(Conn::new(Endpoint::new("a", 1))),
            ConnInfo { load_factor: 0.0 },
        );
        let b = balancer.insert(
            Arc::new(Conn::new(Endpoint::new("b", 1))),
            ConnInfo { load_factor: 0.0 },
        );
        assert!(balancer.pessimize(a).is_ok());
        let err = balancer.pessimize(b).unwrap_err();
        assert!(matches!(err.kind(), ClientErrorKind::AllBanned));
        // Re-banning an already banned element caused nothing.
        assert!(balancer.pessimize(b).is_ok());
        // Traffic still drains.
        assert!(balancer.next().is_some());
    }

    #[test]
    fn banned_element_receives_no_traffic_while_others_are_online() {
        let mut balancer = RandomChoice::with_seed(7);
        let a = balancer.insert(
            Arc::new(Conn::new(Endpoint::new("a", 1))),
            ConnInfo { load_factor: 0.5 },
        );
        balancer.insert(
            Arc::new(Conn::new(Endpoint::new("b", 1))),
            ConnInfo { load_factor: 0.5 },
        );
        balancer.pessimize(a).unwrap();
        for _ in 0..500 {
            let conn = balancer.next().unwrap();
            assert_eq!(conn.endpoint().addr, "b");
        }
    }

    #[test]
    fn update_changes_the_distribution() {
        let mut balancer = RoundRobin::new();
        let a = balancer.insert(
            Arc::new(Conn::new(Endpoint::new("a", 1))),
            ConnInfo { load_factor: 1.0 },
        );
        balancer.insert(
            Arc::new(Conn::new(Endpoint::new("b", 1))),
            ConnInfo { load_factor: 1.0 },
        );
        // Equal loads: alternating picks.
        let first: Vec<String> = (0..4)
            .map(|_| balancer.next().unwrap().endpoint().addr.clone())
            .collect();
        assert_eq!(first.iter().filter(|a| a.as_str() == "a").count(), 2);

        // Dropping a's load to the minimum gives it the whole extra share.
        assert!(balancer.update(a, ConnInfo { load_factor: 0.0 }));
        let mut count_a = 0;
        for _ in 0..300 {
            if balancer.next().unwrap().endpoint().addr == "a" {
                count_a += 1;
            }
        }
        assert_eq!(count_a, 200);
    }

    #[test]
    fn remove_marks_the_connection_offline() {
        let mut balancer = RoundRobin::new();
        let conn = Arc::new(Conn::new(Endpoint::new("a", 1)));
        let el = balancer.insert(Arc::clone(&conn), ConnInfo { load_factor: 0.0 });
        assert!(conn.is_online());
        assert!(balancer.contains(el));
        assert!(balancer.remove(el));
        assert_eq!(conn.state(), ConnState::Offline);
        assert!(!balancer.contains(el));
        assert!(!balancer.remove(el));
    }
}
