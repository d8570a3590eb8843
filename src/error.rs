//! Error types for buffer validation, device transfers and conversions.

use core::fmt;

/// Buffer geometry does not describe a valid image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SizeError {
    /// Buffer length is zero or not a multiple of the pixel size.
    #[error("buffer length is not a whole number of pixels")]
    NotPixelAligned,
    /// Destination holds fewer pixels than the source.
    #[error("source and destination pixel counts differ")]
    PixelCountMismatch,
    /// Stride is shorter than a row, or the buffer is shorter than the last row.
    #[error("stride or buffer length does not cover the image rows")]
    InvalidStride,
    /// Width or height is zero.
    #[error("image has zero width or height")]
    EmptyImage,
}

impl From<garb::SizeError> for SizeError {
    fn from(err: garb::SizeError) -> Self {
        match err {
            garb::SizeError::NotPixelAligned => Self::NotPixelAligned,
            garb::SizeError::PixelCountMismatch => Self::PixelCountMismatch,
            _ => Self::InvalidStride,
        }
    }
}

/// Status reported by a [`DeviceAllocator`](crate::DeviceAllocator).
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum DeviceStatus {
    /// Not enough device-mapped memory for the request.
    #[error("out of device memory")]
    OutOfMemory,
    /// Host and device buffer lengths differ.
    #[error("host and device buffer lengths differ")]
    LengthMismatch,
    /// The buffer was allocated by a different allocator.
    #[error("buffer belongs to another allocator")]
    ForeignBuffer,
    /// Driver-specific failure code.
    #[error("device error code {0}")]
    Driver(i32),
}

/// Direction of a host↔device copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransferDirection {
    HostToDevice,
    DeviceToHost,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HostToDevice => "host-to-device",
            Self::DeviceToHost => "device-to-host",
        })
    }
}

/// Failure of a conversion. Nothing is returned and nothing is leaked.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConvertError {
    /// Host or device allocator could not supply `requested` bytes.
    ///
    /// `source` is `None` when the host allocator failed.
    #[error("allocation of {requested} bytes failed")]
    Allocation {
        requested: usize,
        #[source]
        source: Option<DeviceStatus>,
    },

    /// A copy between host and device did not complete.
    #[error("{direction} transfer of {bytes} bytes failed")]
    Transfer {
        direction: TransferDirection,
        bytes: usize,
        #[source]
        source: DeviceStatus,
    },

    /// Width, height, stride and buffer length are inconsistent.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] SizeError),

    /// Channel count outside {1, 3, 4}.
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(usize),
}
