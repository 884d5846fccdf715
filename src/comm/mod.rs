//! # Worker Group Communication
//!
//! A fixed group of `size` workers, each identified by a rank in `0..size`,
//! connected all-to-all by unbounded channels. Every worker owns one
//! [`Endpoint`]: its own inbox plus a sender into every peer's inbox.
//!
//! The group supports exactly the collectives the row-partitioned product
//! needs:
//!
//! - [`Endpoint::broadcast`]: replicate one buffer from a source rank to all.
//! - [`Endpoint::scatter`]: deal contiguous blocks of a buffer to all ranks,
//!   sized by a [`DistributionPlan`](crate::plan::DistributionPlan).
//! - [`Endpoint::gather`]: the inverse of `scatter`, reassembling blocks at a
//!   destination rank.
//! - [`Endpoint::barrier`]: wait until every rank has arrived.
//!
//! Every collective must be entered by all ranks, in the same order. Each one
//! ends with a barrier, so no rank leaves a phase before every rank has
//! completed it.
//!
//! ## Failure
//!
//! There is no recovery. An endpoint dropped before [`Endpoint::finish`] was
//! called (the worker returned an error or panicked) sends an abort notice to
//! every peer, and whatever collective a peer is blocked in returns
//! [`Error::PeerAborted`](crate::error::Error::PeerAborted).
//!
//! ## Bootstrap
//!
//! [`launch`] runs a closure on a dedicated Rayon pool of exactly `size`
//! threads, one endpoint per thread. [`Endpoint::group`] hands out the raw
//! endpoints for callers that bring their own threads.

mod collective;
mod group;

pub use group::launch;

use std::collections::VecDeque;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::trace;

use crate::error::{distribution_error, validation_error, Error, Result};

/// Identifies which operation produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Broadcast,
    Scatter,
    Gather,
    BarrierArrive,
    BarrierRelease,
}

#[derive(Debug)]
enum Message<T> {
    Data {
        source: usize,
        tag: Tag,
        payload: Vec<T>,
    },
    Abort {
        source: usize,
    },
}

/// One worker's connection to the rest of the group.
pub struct Endpoint<T> {
    rank: usize,
    size: usize,
    peers: Vec<Sender<Message<T>>>,
    inbox: Receiver<Message<T>>,
    /// Messages that arrived before the receive that matches them.
    pending: VecDeque<(usize, Tag, Vec<T>)>,
    finished: bool,
}

impl<T: Send> Endpoint<T> {
    /// Creates the endpoints of a fully connected group of `size` ranks,
    /// indexed by rank.
    pub fn group(size: usize) -> Vec<Endpoint<T>> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| unbounded()).unzip();
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| Endpoint {
                rank,
                size,
                peers: senders.clone(),
                inbox,
                pending: VecDeque::new(),
                finished: false,
            })
            .collect()
    }
}

impl<T> Endpoint<T> {
    /// This worker's rank.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of workers in the group.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Marks this worker as done and leaves the group without notifying
    /// peers of a failure.
    pub fn finish(mut self) {
        self.finished = true;
        if !self.pending.is_empty() {
            trace!(
                rank = self.rank,
                unmatched = self.pending.len(),
                "leaving group with unmatched messages"
            );
        }
    }

    fn check_rank(&self, root: usize) -> Result<()> {
        if root >= self.size {
            return Err(validation_error(format!(
                "root rank {root} is outside a group of {}",
                self.size
            )));
        }
        Ok(())
    }

    fn send(&self, dest: usize, tag: Tag, payload: Vec<T>) -> Result<()> {
        trace!(rank = self.rank, dest, ?tag, len = payload.len(), "send");
        self.peers[dest]
            .send(Message::Data {
                source: self.rank,
                tag,
                payload,
            })
            .map_err(|_| Error::PeerAborted {
                rank: self.rank,
                peer: dest,
            })
    }

    /// Receives the next message with `tag` from `source`.
    fn recv(&mut self, source: usize, tag: Tag) -> Result<Vec<T>> {
        self.recv_matching(Some(source), tag).map(|(_, payload)| payload)
    }

    /// Receives the next message with `tag` from any rank.
    fn recv_any(&mut self, tag: Tag) -> Result<(usize, Vec<T>)> {
        self.recv_matching(None, tag)
    }

    fn recv_matching(&mut self, source: Option<usize>, tag: Tag) -> Result<(usize, Vec<T>)> {
        let matches = |s: usize, t: Tag| t == tag && source.map_or(true, |want| want == s);

        if let Some(pos) = self.pending.iter().position(|(s, t, _)| matches(*s, *t)) {
            if let Some((s, _, payload)) = self.pending.remove(pos) {
                return Ok((s, payload));
            }
        }

        loop {
            let message = self
                .inbox
                .recv()
                .map_err(|_| distribution_error(self.rank, "inbox disconnected"))?;
            match message {
                Message::Abort { source: peer } => {
                    return Err(Error::PeerAborted {
                        rank: self.rank,
                        peer,
                    });
                }
                Message::Data {
                    source: s,
                    tag: t,
                    payload,
                } => {
                    trace!(rank = self.rank, source = s, tag = ?t, len = payload.len(), "recv");
                    if matches(s, t) {
                        return Ok((s, payload));
                    }
                    self.pending.push_back((s, t, payload));
                }
            }
        }
    }
}

impl<T> Drop for Endpoint<T> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        for (peer, sender) in self.peers.iter().enumerate() {
            if peer != self.rank {
                // Peers that already left have dropped their inbox.
                let _ = sender.send(Message::Abort { source: self.rank });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_ranks() {
        let group: Vec<Endpoint<i64>> = Endpoint::group(4);
        let ranks: Vec<usize> = group.iter().map(Endpoint::rank).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        assert!(group.iter().all(|e| e.size() == 4));
        group.into_iter().for_each(Endpoint::finish);
    }

    #[test]
    fn test_out_of_order_messages_are_held() {
        let mut group: Vec<Endpoint<i64>> = Endpoint::group(3);
        group[1].send(0, Tag::Gather, vec![1]).unwrap();
        group[2].send(0, Tag::Scatter, vec![2]).unwrap();

        let root = &mut group[0];
        assert_eq!(root.recv(2, Tag::Scatter).unwrap(), vec![2]);
        assert_eq!(root.pending.len(), 1);
        assert_eq!(root.recv_any(Tag::Gather).unwrap(), (1, vec![1]));
        assert!(root.pending.is_empty());
        group.into_iter().for_each(Endpoint::finish);
    }

    #[test]
    fn test_drop_without_finish_aborts_peers() {
        let mut group: Vec<Endpoint<i64>> = Endpoint::group(2);
        let failed = group.pop().unwrap();
        drop(failed);

        let err = group[0].recv(1, Tag::Broadcast).unwrap_err();
        assert_eq!(err, Error::PeerAborted { rank: 0, peer: 1 });
    }

    #[test]
    fn test_send_to_departed_peer_fails() {
        let mut group: Vec<Endpoint<i64>> = Endpoint::group(2);
        group.pop().unwrap().finish();
        let err = group[0].send(1, Tag::Gather, vec![]).unwrap_err();
        assert_eq!(err, Error::PeerAborted { rank: 0, peer: 1 });
    }
}
