//! Binary schema for values written to memcached.
//!
//! [`UserApps`] mirrors `proto/appsinstalled.proto`. The message is a proto2
//! layout: `apps` is an unpacked repeated `uint32` (insertion order
//! preserved) and both coordinates are optional on the wire but always set
//! by the loader, even when zero.

use crate::{AppsInstalled, Result};

/// Installed applications and location of one device.
#[derive(Clone, PartialEq, prost::Message)]
pub struct UserApps {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub apps: Vec<u32>,
    #[prost(double, optional, tag = "2")]
    pub lat: Option<f64>,
    #[prost(double, optional, tag = "3")]
    pub lon: Option<f64>,
}

impl UserApps {
    /// Serializes the message into a freshly allocated buffer.
    pub fn pack(&self) -> Vec<u8> {
        prost::Message::encode_to_vec(self)
    }

    /// Serializes the message into `buf`, failing if it lacks capacity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`](crate::Error::Encode) when `buf` cannot hold
    /// the encoded message.
    pub fn pack_into(&self, buf: &mut impl prost::bytes::BufMut) -> Result<()> {
        prost::Message::encode(self, buf)?;
        Ok(())
    }

    /// Deserializes a message previously produced by [`UserApps::pack`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`](crate::Error::Decode) on malformed input.
    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        Ok(<Self as prost::Message>::decode(bytes)?)
    }
}

impl From<&AppsInstalled> for UserApps {
    fn from(record: &AppsInstalled) -> Self {
        Self {
            apps: record.apps.clone(),
            lat: Some(record.lat),
            lon: Some(record.lon),
        }
    }
}

/// Packs the value stored for `record`.
///
/// # Errors
///
/// Returns [`Error::Encode`](crate::Error::Encode) if serialization fails.
pub fn encode_record(record: &AppsInstalled) -> Result<Vec<u8>> {
    let message = UserApps::from(record);
    let mut buf = Vec::with_capacity(prost::Message::encoded_len(&message));
    message.pack_into(&mut buf)?;
    Ok(buf)
}
