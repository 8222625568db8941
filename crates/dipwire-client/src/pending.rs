//! The pending-request table.
//!
//! One owned map from request id to a single-use waiter. A waiter is a
//! `oneshot::Sender`, so it can be resolved at most once by construction;
//! every entry leaves the map through exactly one of [`PendingTable::resolve`],
//! [`PendingTable::fail`], [`PendingTable::remove`] or
//! [`PendingTable::fail_all`].
//!
//! An id may be reused as soon as its entry is gone, so each insert gets a
//! [`Ticket`] and [`PendingTable::remove`] only removes the entry holding
//! that ticket.

use std::collections::HashMap;

use dipwire_protocol::{RequestId, Response};
use tokio::sync::oneshot;

use crate::ClientError;

/// What a waiter eventually receives.
pub(crate) type Outcome = Result<Response, ClientError>;

/// Identifies one insert, so a stale owner cannot remove a newer waiter
/// registered under the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket(u64);

#[derive(Debug)]
struct Waiter {
    ticket: Ticket,
    sender: oneshot::Sender<Outcome>,
}

/// Waiters for in-flight requests on one connection.
#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    waiters: HashMap<RequestId, Waiter>,
    next_ticket: u64,
    /// Set once the connection is gone; later inserts fail immediately.
    closed: bool,
}

impl PendingTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter and returns the ticket that owns it.
    ///
    /// # Errors
    /// - [`ClientError::DuplicateRequestId`] if `id` is still pending
    /// - [`ClientError::ConnectionClosed`] if the connection already closed
    pub(crate) fn insert(
        &mut self,
        id: RequestId,
        sender: oneshot::Sender<Outcome>,
    ) -> Result<Ticket, ClientError> {
        if self.closed {
            return Err(ClientError::ConnectionClosed);
        }
        if self.waiters.contains_key(&id) {
            return Err(ClientError::DuplicateRequestId(id));
        }
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        self.waiters.insert(id, Waiter { ticket, sender });
        Ok(ticket)
    }

    /// Hands a response to its waiter.
    ///
    /// Returns the response back if nobody is waiting for it (unknown id,
    /// timed out, or the caller went away).
    pub(crate) fn resolve(&mut self, response: Response) -> Option<Response> {
        let Some(waiter) = self.waiters.remove(&response.request_id) else {
            return Some(response);
        };
        match waiter.sender.send(Ok(response)) {
            Ok(()) => None,
            Err(Ok(response)) => Some(response),
            Err(Err(_)) => None,
        }
    }

    /// Fails one waiter. Returns `true` if it was pending.
    pub(crate) fn fail(&mut self, id: &RequestId, error: ClientError) -> bool {
        match self.waiters.remove(id) {
            Some(waiter) => {
                let _ = waiter.sender.send(Err(error));
                true
            }
            None => false,
        }
    }

    /// Drops the waiter registered under `id` with `ticket`, without
    /// resolving it. A waiter inserted later under the same id is left
    /// alone. Returns `true` if the entry was removed.
    pub(crate) fn remove(&mut self, id: &RequestId, ticket: Ticket) -> bool {
        match self.waiters.get(id) {
            Some(waiter) if waiter.ticket == ticket => {
                self.waiters.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Fails every waiter with `ConnectionClosed` and refuses new ones.
    ///
    /// Returns how many waiters were failed.
    pub(crate) fn fail_all(&mut self) -> usize {
        self.closed = true;
        let count = self.waiters.len();
        for (_, waiter) in self.waiters.drain() {
            let _ = waiter.sender.send(Err(ClientError::ConnectionClosed));
        }
        count
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: &RequestId) -> bool {
        self.waiters.contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }
}

#[cfg(test)]
mod tests {
    use dipwire_protocol::ResponseBody;

    use super::*;

    fn id(s: &str) -> RequestId {
        RequestId::new(s)
    }

    #[test]
    fn test_insert_duplicate_id_returns_error() {
        let mut table = PendingTable::new();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        table.insert(id("a"), tx1).unwrap();

        let result = table.insert(id("a"), tx2);
        assert!(matches!(result, Err(ClientError::DuplicateRequestId(_))));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_resolve_matching_id_delivers_response() {
        let mut table = PendingTable::new();
        let (tx, mut rx) = oneshot::channel();
        table.insert(id("a"), tx).unwrap();

        assert!(table.resolve(Response::ok(id("a"))).is_none());
        let outcome = rx.try_recv().unwrap().unwrap();
        assert_eq!(outcome.body, ResponseBody::Ok {});
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_resolve_unknown_id_returns_orphan() {
        let mut table = PendingTable::new();
        let (tx, mut rx) = oneshot::channel();
        table.insert(id("a"), tx).unwrap();

        let orphan = table.resolve(Response::ok(id("b")));
        assert_eq!(orphan.map(|r| r.request_id), Some(id("b")));
        // The waiter for "a" is untouched.
        assert!(rx.try_recv().is_err());
        assert!(table.contains(&id("a")));
    }

    #[test]
    fn test_resolve_after_receiver_dropped_returns_orphan() {
        let mut table = PendingTable::new();
        let (tx, rx) = oneshot::channel();
        table.insert(id("a"), tx).unwrap();
        drop(rx);

        assert!(table.resolve(Response::ok(id("a"))).is_some());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_fail_delivers_error_once() {
        let mut table = PendingTable::new();
        let (tx, mut rx) = oneshot::channel();
        table.insert(id("a"), tx).unwrap();

        assert!(table.fail(&id("a"), ClientError::ConnectionClosed));
        assert!(!table.fail(&id("a"), ClientError::ConnectionClosed));
        assert!(matches!(
            rx.try_recv().unwrap(),
            Err(ClientError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_fail_all_empties_table_and_refuses_inserts() {
        let mut table = PendingTable::new();
        let (tx1, mut rx1) = oneshot::channel();
        let (tx2, mut rx2) = oneshot::channel();
        table.insert(id("a"), tx1).unwrap();
        table.insert(id("b"), tx2).unwrap();

        assert_eq!(table.fail_all(), 2);
        assert_eq!(table.len(), 0);
        assert!(matches!(rx1.try_recv().unwrap(), Err(ClientError::ConnectionClosed)));
        assert!(matches!(rx2.try_recv().unwrap(), Err(ClientError::ConnectionClosed)));

        let (tx3, _rx3) = oneshot::channel();
        assert!(matches!(
            table.insert(id("c"), tx3),
            Err(ClientError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_remove_then_reinsert_same_id() {
        let mut table = PendingTable::new();
        let (tx1, _rx1) = oneshot::channel();
        let ticket = table.insert(id("a"), tx1).unwrap();
        assert!(table.remove(&id("a"), ticket));

        let (tx2, _rx2) = oneshot::channel();
        table.insert(id("a"), tx2).expect("id is free again");
    }

    #[test]
    fn test_remove_with_stale_ticket_keeps_newer_waiter() {
        let mut table = PendingTable::new();
        let (tx1, _rx1) = oneshot::channel();
        let first = table.insert(id("a"), tx1).unwrap();
        assert!(table.resolve(Response::ok(id("a"))).is_none());

        let (tx2, mut rx2) = oneshot::channel();
        let second = table.insert(id("a"), tx2).unwrap();
        assert_ne!(first, second);

        assert!(!table.remove(&id("a"), first));
        assert!(table.contains(&id("a")));
        assert!(table.resolve(Response::ok(id("a"))).is_none());
        assert_eq!(rx2.try_recv().unwrap().unwrap().request_id, id("a"));
    }
}
