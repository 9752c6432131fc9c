//! Bit flag sets carried by capture events and input commands

macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $( $(#[$fmeta:meta])* const $flag:ident = $bit:expr; )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(u32);

        impl $name {
            $( $(#[$fmeta])* pub const $flag: Self = Self($bit); )*

            pub const fn empty() -> Self {
                Self(0)
            }

            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }
    };
}

flag_set! {
    /// What changed in a format-changed notification
    pub struct FormatChangedEvents {
        const DISPLAY_MODE_CHANGED = 1 << 0;
        const FIELD_DOMINANCE_CHANGED = 1 << 1;
        const COLORSPACE_CHANGED = 1 << 2;
    }
}

flag_set! {
    /// Signal properties detected by the capture hardware
    pub struct DetectedFormatFlags {
        const YCBCR422 = 1 << 0;
        const RGB444 = 1 << 1;
        const DUAL_STREAM_3D = 1 << 2;
        const BIT_DEPTH_12 = 1 << 3;
        const BIT_DEPTH_10 = 1 << 4;
        const BIT_DEPTH_8 = 1 << 5;
    }
}

flag_set! {
    /// Options passed when enabling video input
    pub struct VideoInputFlags {
        const ENABLE_FORMAT_DETECTION = 1 << 0;
        const DUAL_STREAM_3D = 1 << 1;
    }
}

impl DetectedFormatFlags {
    /// Bit depth reported by the depth flags, 8 taking precedence over 10 over 12
    pub fn depth(self) -> Option<u8> {
        if self.contains(Self::BIT_DEPTH_8) {
            Some(8)
        } else if self.contains(Self::BIT_DEPTH_10) {
            Some(10)
        } else if self.contains(Self::BIT_DEPTH_12) {
            Some(12)
        } else {
            None
        }
    }

    /// Flags describing a signal of the given colour space and depth
    pub fn for_signal(rgb: bool, depth: u8) -> Self {
        let colorspace = if rgb { Self::RGB444 } else { Self::YCBCR422 };
        let depth = match depth {
            8 => Self::BIT_DEPTH_8,
            10 => Self::BIT_DEPTH_10,
            12 => Self::BIT_DEPTH_12,
            _ => Self::empty(),
        };
        colorspace | depth
    }
}
