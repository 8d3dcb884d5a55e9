//! Role-derived channel membership.
//!
//! A channel is a named delivery group for broadcasts. Membership is purely a
//! function of the principal's role and identity, so every reconnect lands in
//! the same rooms without any persisted assignment table.

use std::collections::HashSet;
use std::fmt;

use dashmap::DashMap;

use crate::model::{Principal, Role, ShopId, UserId};

/// A named delivery group of connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// All connected owners of one shop. Wire form `shop:<id>`.
    Shop(ShopId),
    /// One customer's private channel. Wire form `customer:<id>`.
    Customer(UserId),
}

impl Channel {
    /// Parses the wire form back into a channel. Returns None for unknown
    /// kinds or non-positive ids.
    pub fn parse(s: &str) -> Option<Self> {
        let (kind, id) = s.split_once(':')?;
        let id: i64 = id.parse().ok()?;
        if id <= 0 {
            return None;
        }
        match kind {
            "shop" => Some(Self::Shop(id)),
            "customer" => Some(Self::Customer(id)),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shop(shop_id) => write!(f, "shop:{shop_id}"),
            Self::Customer(user_id) => write!(f, "customer:{user_id}"),
        }
    }
}

/// Computes the channel set for a verified principal.
///
/// Shop owners join their shop's channel, customers their own private
/// channel. Admins receive no proactive broadcasts, and an owner without a
/// shop joins nothing rather than erroring the connection.
pub fn channels_for(principal: &Principal) -> Vec<Channel> {
    match principal.role {
        Role::ShopOwner => principal.shop_id.map(Channel::Shop).into_iter().collect(),
        Role::Customer => vec![Channel::Customer(principal.user_id)],
        Role::Admin => Vec::new(),
    }
}

/// Channel membership map. Empty rooms are dropped on last leave.
#[derive(Debug, Default)]
pub struct RoomMap {
    rooms: DashMap<Channel, HashSet<UserId>>,
}

impl RoomMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a member. Joining a room twice is a no-op.
    pub fn join(&self, channel: Channel, user_id: UserId) {
        self.rooms.entry(channel).or_default().insert(user_id);
    }

    /// Removes a member from one room.
    pub fn leave(&self, channel: Channel, user_id: UserId) {
        let mut emptied = false;
        if let Some(mut members) = self.rooms.get_mut(&channel) {
            members.remove(&user_id);
            emptied = members.is_empty();
        }
        if emptied {
            self.rooms.remove_if(&channel, |_, members| members.is_empty());
        }
    }

    /// Removes a member from every room they are in.
    pub fn leave_all(&self, user_id: UserId) {
        let mut emptied = Vec::new();
        for mut entry in self.rooms.iter_mut() {
            entry.value_mut().remove(&user_id);
            if entry.value().is_empty() {
                emptied.push(*entry.key());
            }
        }
        for channel in emptied {
            self.rooms.remove_if(&channel, |_, members| members.is_empty());
        }
    }

    /// Current members of a channel.
    pub fn members(&self, channel: &Channel) -> Vec<UserId> {
        self.rooms
            .get(channel)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
