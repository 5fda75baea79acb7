use std::fmt;

use ntex_bytes::BufMut;

use crate::frame::{util, Frame, FrameError, FrameSize, Head, Kind, StreamId};

/// SETTINGS frame
///
/// Parameters are kept in the order they were received, every one of them
/// is applied in turn by the receiver.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct Settings {
    flags: SettingsFlags,
    params: Vec<Setting>,
}

/// An enum that lists all valid settings that can be sent in a SETTINGS
/// frame.
///
/// Each setting has a value that is a 32 bit unsigned integer (6.5.1.).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Setting {
    HeaderTableSize(u32),
    EnablePush(u32),
    MaxConcurrentStreams(u32),
    InitialWindowSize(u32),
    MaxFrameSize(u32),
    MaxHeaderListSize(u32),
    /// Identifier this endpoint does not know, must be ignored
    Unknown(u16, u32),
}

#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct SettingsFlags(u8);

const ACK: u8 = 0x1;
const ALL: u8 = ACK;

/// The default value of SETTINGS_HEADER_TABLE_SIZE
pub const DEFAULT_SETTINGS_HEADER_TABLE_SIZE: usize = 4_096;

/// The default value of SETTINGS_INITIAL_WINDOW_SIZE
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65_535;

/// The default value of MAX_FRAME_SIZE
pub const DEFAULT_MAX_FRAME_SIZE: FrameSize = 16_384;

/// INITIAL_WINDOW_SIZE upper bound
pub const MAX_INITIAL_WINDOW_SIZE: usize = (1 << 31) - 1;

/// MAX_FRAME_SIZE upper bound
pub const MAX_MAX_FRAME_SIZE: FrameSize = (1 << 24) - 1;

// ===== impl Settings =====

impl Settings {
    pub fn ack() -> Settings {
        Settings {
            flags: SettingsFlags::ack(),
            params: Vec::new(),
        }
    }

    pub fn is_ack(&self) -> bool {
        self.flags.is_ack()
    }

    /// Settings in wire order.
    pub fn iter(&self) -> impl Iterator<Item = &Setting> {
        self.params.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn header_table_size(&self) -> Option<u32> {
        self.find(|s| match s {
            Setting::HeaderTableSize(v) => Some(v),
            _ => None,
        })
    }

    pub fn set_header_table_size(&mut self, size: Option<u32>) {
        self.set(size.map(Setting::HeaderTableSize), |s| {
            matches!(s, Setting::HeaderTableSize(_))
        });
    }

    pub fn is_push_enabled(&self) -> Option<bool> {
        self.find(|s| match s {
            Setting::EnablePush(v) => Some(v),
            _ => None,
        })
        .map(|v| v != 0)
    }

    pub fn set_enable_push(&mut self, enable: bool) {
        self.set(Some(Setting::EnablePush(enable as u32)), |s| {
            matches!(s, Setting::EnablePush(_))
        });
    }

    pub fn max_concurrent_streams(&self) -> Option<u32> {
        self.find(|s| match s {
            Setting::MaxConcurrentStreams(v) => Some(v),
            _ => None,
        })
    }

    pub fn set_max_concurrent_streams(&mut self, max: Option<u32>) {
        self.set(max.map(Setting::MaxConcurrentStreams), |s| {
            matches!(s, Setting::MaxConcurrentStreams(_))
        });
    }

    pub fn initial_window_size(&self) -> Option<u32> {
        self.find(|s| match s {
            Setting::InitialWindowSize(v) => Some(v),
            _ => None,
        })
    }

    pub fn set_initial_window_size(&mut self, size: Option<u32>) {
        self.set(size.map(Setting::InitialWindowSize), |s| {
            matches!(s, Setting::InitialWindowSize(_))
        });
    }

    pub fn max_frame_size(&self) -> Option<u32> {
        self.find(|s| match s {
            Setting::MaxFrameSize(v) => Some(v),
            _ => None,
        })
    }

    pub fn set_max_frame_size(&mut self, size: Option<u32>) {
        if let Some(val) = size {
            assert!(DEFAULT_MAX_FRAME_SIZE <= val && val <= MAX_MAX_FRAME_SIZE);
        }
        self.set(size.map(Setting::MaxFrameSize), |s| {
            matches!(s, Setting::MaxFrameSize(_))
        });
    }

    pub fn max_header_list_size(&self) -> Option<u32> {
        self.find(|s| match s {
            Setting::MaxHeaderListSize(v) => Some(v),
            _ => None,
        })
    }

    pub fn set_max_header_list_size(&mut self, size: Option<u32>) {
        self.set(size.map(Setting::MaxHeaderListSize), |s| {
            matches!(s, Setting::MaxHeaderListSize(_))
        });
    }

    /// Append a raw setting, keeping whatever was set before.
    pub fn push(&mut self, setting: Setting) {
        self.params.push(setting);
    }

    fn find<F>(&self, f: F) -> Option<u32>
    where
        F: Fn(Setting) -> Option<u32>,
    {
        self.params.iter().rev().find_map(|s| f(*s))
    }

    fn set<F>(&mut self, setting: Option<Setting>, same: F)
    where
        F: Fn(&Setting) -> bool,
    {
        self.params.retain(|s| !same(s));
        if let Some(setting) = setting {
            self.params.push(setting);
        }
    }

    pub fn load(head: Head, payload: &[u8]) -> Result<Settings, FrameError> {
        debug_assert_eq!(head.kind(), crate::frame::Kind::Settings);

        if !head.stream_id().is_zero() {
            return Err(FrameError::InvalidStreamId);
        }

        // Load the flag
        let flag = SettingsFlags::load(head.flag());

        if flag.is_ack() {
            // Ensure that the payload is empty
            if !payload.is_empty() {
                return Err(FrameError::InvalidPayloadAckSettings);
            }

            // Return the ACK frame
            return Ok(Settings::ack());
        }

        // Ensure the payload length is correct, each setting is 6 bytes long.
        if payload.len() % 6 != 0 {
            log::debug!("invalid settings payload length; len={:?}", payload.len());
            return Err(FrameError::InvalidPayloadAckSettings);
        }

        let params = payload.chunks(6).map(Setting::load).collect();

        Ok(Settings {
            flags: flag,
            params,
        })
    }

    fn payload_len(&self) -> usize {
        self.params.len() * 6
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        // Create & encode an appropriate frame head
        let head = Head::new(Kind::Settings, self.flags.into(), StreamId::zero());
        let payload_len = self.payload_len();

        log::trace!("encoding SETTINGS; len={}", payload_len);

        head.encode(payload_len, dst);

        // Encode the settings
        for setting in &self.params {
            log::trace!("encoding setting; val={:?}", setting);
            setting.encode(dst)
        }
    }
}

impl From<Settings> for Frame {
    fn from(src: Settings) -> Frame {
        Frame::Settings(src)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("Settings");
        builder.field("flags", &self.flags);

        for setting in &self.params {
            match setting {
                Setting::HeaderTableSize(v) => builder.field("header_table_size", v),
                Setting::EnablePush(v) => builder.field("enable_push", v),
                Setting::MaxConcurrentStreams(v) => builder.field("max_concurrent_streams", v),
                Setting::InitialWindowSize(v) => builder.field("initial_window_size", v),
                Setting::MaxFrameSize(v) => builder.field("max_frame_size", v),
                Setting::MaxHeaderListSize(v) => builder.field("max_header_list_size", v),
                Setting::Unknown(id, v) => builder.field("unknown", &(id, v)),
            };
        }

        builder.finish()
    }
}

// ===== impl Setting =====

impl Setting {
    /// Creates a new `Setting` with the correct variant corresponding to the
    /// given setting id, based on the settings IDs defined in section
    /// 6.5.2.
    pub fn from_id(id: u16, val: u32) -> Setting {
        use self::Setting::*;

        match id {
            1 => HeaderTableSize(val),
            2 => EnablePush(val),
            3 => MaxConcurrentStreams(val),
            4 => InitialWindowSize(val),
            5 => MaxFrameSize(val),
            6 => MaxHeaderListSize(val),
            _ => Unknown(id, val),
        }
    }

    /// Identifier and value as they appear on the wire.
    pub fn to_parts(&self) -> (u16, u32) {
        use self::Setting::*;

        match *self {
            HeaderTableSize(v) => (1, v),
            EnablePush(v) => (2, v),
            MaxConcurrentStreams(v) => (3, v),
            InitialWindowSize(v) => (4, v),
            MaxFrameSize(v) => (5, v),
            MaxHeaderListSize(v) => (6, v),
            Unknown(id, v) => (id, v),
        }
    }

    /// Creates a new `Setting` by parsing the given buffer of 6 bytes, which
    /// contains the raw byte representation of the setting, according to the
    /// "SETTINGS format" defined in section 6.5.1.
    ///
    /// The `raw` parameter should have length at least 6 bytes, since the
    /// length of the raw setting is exactly 6 bytes.
    fn load(raw: &[u8]) -> Setting {
        let id: u16 = (u16::from(raw[0]) << 8) | u16::from(raw[1]);
        let val: u32 = unpack_octets_4!(raw, 2, u32);

        Setting::from_id(id, val)
    }

    fn encode<B: BufMut>(&self, dst: &mut B) {
        let (kind, val) = self.to_parts();
        dst.put_u16(kind);
        dst.put_u32(val);
    }
}

// ===== impl SettingsFlags =====

impl SettingsFlags {
    pub fn load(bits: u8) -> SettingsFlags {
        SettingsFlags(bits & ALL)
    }

    pub fn ack() -> SettingsFlags {
        SettingsFlags(ACK)
    }

    pub fn is_ack(&self) -> bool {
        self.0 & ACK == ACK
    }
}

impl From<SettingsFlags> for u8 {
    fn from(src: SettingsFlags) -> u8 {
        src.0
    }
}

impl fmt::Debug for SettingsFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        util::debug_flags(f, self.0)
            .flag_if(self.is_ack(), "ACK")
            .finish()
    }
}
