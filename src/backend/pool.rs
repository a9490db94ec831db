//! Round-robin pool of backend channels.
//!
//! Each tonic channel multiplexes many calls over one HTTP/2 connection;
//! several channels spread load over several connections. A channel carries
//! no per-call state, so one failed call cannot affect later calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use tonic::transport::Channel;

use crate::backend::channel::{self, ChannelSettings};
use crate::backend::BackendError;

/// Round-robin selector over a fixed set of members.
/// Stores an internal counter to rotate through them.
#[derive(Debug)]
pub struct RoundRobin<T> {
    members: Vec<T>,
    counter: AtomicUsize,
}

impl<T: Clone> RoundRobin<T> {
    /// Returns `None` when `members` is empty.
    pub fn new(members: Vec<T>) -> Option<Self> {
        if members.is_empty() {
            return None;
        }
        Some(Self {
            members,
            counter: AtomicUsize::new(0),
        })
    }

    /// Next member in rotation.
    pub fn next(&self) -> T {
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % self.members.len();
        self.members[index].clone()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Pool of channels to one backend endpoint.
pub type ChannelPool = RoundRobin<Channel>;

impl ChannelPool {
    /// Open `size` channels to `addr`.
    ///
    /// With `lazy` the channels connect on first use; otherwise every channel
    /// must connect now.
    pub async fn open(
        addr: &str,
        size: usize,
        lazy: bool,
        settings: &ChannelSettings,
    ) -> Result<Self, BackendError> {
        let mut channels = Vec::with_capacity(size);
        for _ in 0..size {
            let channel = if lazy {
                channel::connect_lazy(addr, settings)?
            } else {
                channel::connect(addr, settings).await?
            };
            channels.push(channel);
        }

        tracing::info!(addr = %addr, channels = size, lazy, "Backend channel pool ready");

        Self::new(channels)
            .ok_or_else(|| BackendError::Unavailable("channel pool size must be at least 1".into()))
    }
}
