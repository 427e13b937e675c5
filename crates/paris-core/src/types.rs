use derive_more::Display;

/// `TimeToLive` (ttl) newtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Display)]
pub struct TimeToLive(pub u8);

/// `InstanceId` newtype.
///
/// Identifies an algorithm instance registered with a loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash, Display)]
#[display("#{_0}")]
pub struct InstanceId(pub usize);

/// `IpVersion` of a probe or reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum IpVersion {
    #[display("IPv4")]
    V4,
    #[display("IPv6")]
    V6,
}

impl IpVersion {
    /// The value of the `version` field of the IP header.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::V4 => 4,
            Self::V6 => 6,
        }
    }
}

impl TryFrom<u8> for IpVersion {
    type Error = u8;

    fn try_from(version: u8) -> Result<Self, Self::Error> {
        match version {
            4 => Ok(Self::V4),
            6 => Ok(Self::V6),
            other => Err(other),
        }
    }
}
