// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Timestamped payload types carried by data ports.

use crate::cdr::{CdrReader, CdrResult, CdrWriter};
use std::time::{SystemTime, UNIX_EPOCH};

/// A payload that can travel through a data port.
pub trait DataType: Clone + Default + Send + Sync + 'static {
    /// Name advertised as `dataport.data_type`.
    const TYPE_NAME: &'static str;

    fn encode(&self, w: &mut CdrWriter);

    fn decode(r: &mut CdrReader<'_>) -> CdrResult<Self>;

    fn to_cdr(&self) -> Vec<u8> {
        let mut w = CdrWriter::with_capacity(16);
        self.encode(&mut w);
        w.into_bytes()
    }

    fn from_cdr(bytes: &[u8]) -> CdrResult<Self> {
        Self::decode(&mut CdrReader::new(bytes))
    }
}

/// Wall-clock timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time {
    pub sec: u32,
    pub nsec: u32,
}

impl Time {
    pub fn now() -> Self {
        let since = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            sec: since.as_secs() as u32,
            nsec: since.subsec_nanos(),
        }
    }

    fn encode(&self, w: &mut CdrWriter) {
        w.write_u32(self.sec);
        w.write_u32(self.nsec);
    }

    fn decode(r: &mut CdrReader<'_>) -> CdrResult<Self> {
        Ok(Self {
            sec: r.read_u32()?,
            nsec: r.read_u32()?,
        })
    }
}

macro_rules! timed_scalar {
    ($(#[$meta:meta])* $name:ident, $ty:ty, $write:ident, $read:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            pub tm: Time,
            pub data: $ty,
        }

        impl $name {
            /// Sample stamped with the current time.
            pub fn new(data: $ty) -> Self {
                Self { tm: Time::now(), data }
            }
        }

        impl DataType for $name {
            const TYPE_NAME: &'static str = stringify!($name);

            fn encode(&self, w: &mut CdrWriter) {
                self.tm.encode(w);
                w.$write(self.data);
            }

            fn decode(r: &mut CdrReader<'_>) -> CdrResult<Self> {
                let tm = Time::decode(r)?;
                Ok(Self { tm, data: r.$read()? })
            }
        }
    };
}

macro_rules! timed_seq {
    ($(#[$meta:meta])* $name:ident, $ty:ty, $write:ident, $read:ident, $size:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            pub tm: Time,
            pub data: Vec<$ty>,
        }

        impl $name {
            pub fn new(data: Vec<$ty>) -> Self {
                Self { tm: Time::now(), data }
            }
        }

        impl DataType for $name {
            const TYPE_NAME: &'static str = stringify!($name);

            fn encode(&self, w: &mut CdrWriter) {
                self.tm.encode(w);
                w.write_u32(self.data.len() as u32);
                for v in &self.data {
                    w.$write(*v);
                }
            }

            fn decode(r: &mut CdrReader<'_>) -> CdrResult<Self> {
                let tm = Time::decode(r)?;
                let len = r.read_seq_len($size)?;
                let mut data = Vec::with_capacity(len);
                for _ in 0..len {
                    data.push(r.$read()?);
                }
                Ok(Self { tm, data })
            }
        }
    };
}

timed_scalar!(TimedShort, i16, write_i16, read_i16);
timed_scalar!(TimedLong, i32, write_i32, read_i32);
timed_scalar!(TimedUShort, u16, write_u16, read_u16);
timed_scalar!(TimedULong, u32, write_u32, read_u32);
timed_scalar!(TimedFloat, f32, write_f32, read_f32);
timed_scalar!(TimedDouble, f64, write_f64, read_f64);
timed_scalar!(
    /// Single ISO-8859-1 character.
    TimedChar,
    u8,
    write_u8,
    read_u8
);
timed_scalar!(TimedBoolean, bool, write_bool, read_bool);
timed_scalar!(TimedOctet, u8, write_u8, read_u8);

timed_seq!(TimedLongSeq, i32, write_i32, read_i32, 4);
timed_seq!(TimedDoubleSeq, f64, write_f64, read_f64, 8);

/// Timestamped string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimedString {
    pub tm: Time,
    pub data: String,
}

impl TimedString {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            tm: Time::now(),
            data: data.into(),
        }
    }
}

impl DataType for TimedString {
    const TYPE_NAME: &'static str = "TimedString";

    fn encode(&self, w: &mut CdrWriter) {
        self.tm.encode(w);
        w.write_string(&self.data);
    }

    fn decode(r: &mut CdrReader<'_>) -> CdrResult<Self> {
        let tm = Time::decode(r)?;
        Ok(Self {
            tm,
            data: r.read_string()?,
        })
    }
}

/// Timestamped byte sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimedOctetSeq {
    pub tm: Time,
    pub data: Vec<u8>,
}

impl TimedOctetSeq {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            tm: Time::now(),
            data,
        }
    }
}

impl DataType for TimedOctetSeq {
    const TYPE_NAME: &'static str = "TimedOctetSeq";

    fn encode(&self, w: &mut CdrWriter) {
        self.tm.encode(w);
        w.write_u32(self.data.len() as u32);
        w.write_bytes(&self.data);
    }

    fn decode(r: &mut CdrReader<'_>) -> CdrResult<Self> {
        let tm = Time::decode(r)?;
        let len = r.read_seq_len(1)?;
        Ok(Self {
            tm,
            data: r.read_bytes(len)?.to_vec(),
        })
    }
}
