//! Account and transaction identifiers.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseIdError {
    #[error("invalid account id '{0}': expected 'shard.realm.num'")]
    AccountId(String),

    #[error("invalid transaction id '{0}': expected 'shard.realm.num@seconds.nanos'")]
    TransactionId(String),
}

/// `shard.realm.num`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

impl AccountId {
    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }
}

impl From<u64> for AccountId {
    fn from(num: u64) -> Self {
        Self::new(0, 0, num)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl FromStr for AccountId {
    type Err = ParseIdError;

    /// Accepts `shard.realm.num` or a bare `num`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseIdError::AccountId(s.to_string());
        let parts: Vec<&str> = s.trim().split('.').collect();
        match parts.as_slice() {
            [num] => Ok(Self::from(num.parse::<u64>().map_err(|_| err())?)),
            [shard, realm, num] => Ok(Self::new(
                shard.parse().map_err(|_| err())?,
                realm.parse().map_err(|_| err())?,
                num.parse().map_err(|_| err())?,
            )),
            _ => Err(err()),
        }
    }
}

/// Seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub const fn new(seconds: i64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }

    pub fn now() -> Self {
        Self::from_unix_millis(unix_millis())
    }

    fn from_unix_millis(millis: i64) -> Self {
        Self {
            seconds: millis.div_euclid(1000),
            nanos: (millis.rem_euclid(1000) as u32) * 1_000_000,
        }
    }

    /// A valid-start time backdated 8 to 13 seconds with random sub-millisecond
    /// nanos, so that ids generated together by one payer do not collide.
    pub fn generate() -> Self {
        let jitter = 8_000 + fastrand::i64(0..5_000);
        let mut timestamp = Self::from_unix_millis(unix_millis() - jitter);
        timestamp.nanos += fastrand::u32(0..1_000_000);
        timestamp
    }
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Payer account plus valid-start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId {
    pub account_id: AccountId,
    pub valid_start: Timestamp,
    pub scheduled: bool,
    pub nonce: Option<i32>,
}

impl TransactionId {
    pub fn generate(payer: AccountId) -> Self {
        Self::with_valid_start(payer, Timestamp::generate())
    }

    pub fn with_valid_start(payer: AccountId, valid_start: Timestamp) -> Self {
        Self {
            account_id: payer,
            valid_start,
            scheduled: false,
            nonce: None,
        }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}.{:09}",
            self.account_id, self.valid_start.seconds, self.valid_start.nanos
        )?;
        if self.scheduled {
            f.write_str("?scheduled")?;
        }
        if let Some(nonce) = self.nonce {
            write!(f, "/{}", nonce)?;
        }
        Ok(())
    }
}

impl FromStr for TransactionId {
    type Err = ParseIdError;

    /// `0.0.1001@1700000000.000000001[?scheduled][/nonce]`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseIdError::TransactionId(s.to_string());

        let (account, rest) = s.trim().split_once('@').ok_or_else(err)?;
        let (rest, nonce) = match rest.split_once('/') {
            Some((head, nonce)) => (head, Some(nonce.parse::<i32>().map_err(|_| err())?)),
            None => (rest, None),
        };
        let (rest, scheduled) = match rest.strip_suffix("?scheduled") {
            Some(head) => (head, true),
            None => (rest, false),
        };
        let (seconds, nanos) = rest.split_once('.').ok_or_else(err)?;
        let nanos: u32 = nanos.parse().map_err(|_| err())?;
        if nanos >= 1_000_000_000 {
            return Err(err());
        }

        Ok(Self {
            account_id: account.parse().map_err(|_| err())?,
            valid_start: Timestamp::new(seconds.parse().map_err(|_| err())?, nanos),
            scheduled,
            nonce,
        })
    }
}
