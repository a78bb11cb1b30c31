// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Device status codes and their descriptions.
//!
//! Every failure reported by a device operation carries a [`StatusCode`].
//! The conventional integer codes leave the range `-15..=-29` unused, so
//! conversion from raw integers goes through an explicit table instead of
//! index arithmetic.

use std::fmt;

/// Status reported by a device operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Success,
    DeviceNotFound,
    DeviceNotAvailable,
    CompilerNotAvailable,
    MemObjectAllocationFailure,
    OutOfResources,
    OutOfHostMemory,
    ProfilingInfoNotAvailable,
    MemCopyOverlap,
    ImageFormatMismatch,
    ImageFormatNotSupported,
    BuildProgramFailure,
    MapFailure,
    MisalignedSubBufferOffset,
    ExecStatusErrorForEventsInWaitList,
    InvalidValue,
    InvalidDeviceType,
    InvalidPlatform,
    InvalidDevice,
    InvalidContext,
    InvalidQueueProperties,
    InvalidCommandQueue,
    InvalidHostPtr,
    InvalidMemObject,
    InvalidImageFormatDescriptor,
    InvalidImageSize,
    InvalidSampler,
    InvalidBinary,
    InvalidBuildOptions,
    InvalidProgram,
    InvalidProgramExecutable,
    InvalidKernelName,
    InvalidKernelDefinition,
    InvalidKernel,
    InvalidArgIndex,
    InvalidArgValue,
    InvalidArgSize,
    InvalidKernelArgs,
    InvalidWorkDimension,
    InvalidWorkGroupSize,
    InvalidWorkItemSize,
    InvalidGlobalOffset,
    InvalidEventWaitList,
    InvalidEvent,
    InvalidOperation,
    InvalidGlObject,
    InvalidBufferSize,
    InvalidMipLevel,
    InvalidGlobalWorkSize,
}

impl StatusCode {
    /// Every status code, in ascending order of magnitude of [`code`](Self::code).
    pub const ALL: [StatusCode; 49] = [
        StatusCode::Success,
        StatusCode::DeviceNotFound,
        StatusCode::DeviceNotAvailable,
        StatusCode::CompilerNotAvailable,
        StatusCode::MemObjectAllocationFailure,
        StatusCode::OutOfResources,
        StatusCode::OutOfHostMemory,
        StatusCode::ProfilingInfoNotAvailable,
        StatusCode::MemCopyOverlap,
        StatusCode::ImageFormatMismatch,
        StatusCode::ImageFormatNotSupported,
        StatusCode::BuildProgramFailure,
        StatusCode::MapFailure,
        StatusCode::MisalignedSubBufferOffset,
        StatusCode::ExecStatusErrorForEventsInWaitList,
        StatusCode::InvalidValue,
        StatusCode::InvalidDeviceType,
        StatusCode::InvalidPlatform,
        StatusCode::InvalidDevice,
        StatusCode::InvalidContext,
        StatusCode::InvalidQueueProperties,
        StatusCode::InvalidCommandQueue,
        StatusCode::InvalidHostPtr,
        StatusCode::InvalidMemObject,
        StatusCode::InvalidImageFormatDescriptor,
        StatusCode::InvalidImageSize,
        StatusCode::InvalidSampler,
        StatusCode::InvalidBinary,
        StatusCode::InvalidBuildOptions,
        StatusCode::InvalidProgram,
        StatusCode::InvalidProgramExecutable,
        StatusCode::InvalidKernelName,
        StatusCode::InvalidKernelDefinition,
        StatusCode::InvalidKernel,
        StatusCode::InvalidArgIndex,
        StatusCode::InvalidArgValue,
        StatusCode::InvalidArgSize,
        StatusCode::InvalidKernelArgs,
        StatusCode::InvalidWorkDimension,
        StatusCode::InvalidWorkGroupSize,
        StatusCode::InvalidWorkItemSize,
        StatusCode::InvalidGlobalOffset,
        StatusCode::InvalidEventWaitList,
        StatusCode::InvalidEvent,
        StatusCode::InvalidOperation,
        StatusCode::InvalidGlObject,
        StatusCode::InvalidBufferSize,
        StatusCode::InvalidMipLevel,
        StatusCode::InvalidGlobalWorkSize,
    ];

    /// The conventional integer code (`0` for success, negative otherwise).
    pub fn code(self) -> i32 {
        match self {
            StatusCode::Success => 0,
            StatusCode::DeviceNotFound => -1,
            StatusCode::DeviceNotAvailable => -2,
            StatusCode::CompilerNotAvailable => -3,
            StatusCode::MemObjectAllocationFailure => -4,
            StatusCode::OutOfResources => -5,
            StatusCode::OutOfHostMemory => -6,
            StatusCode::ProfilingInfoNotAvailable => -7,
            StatusCode::MemCopyOverlap => -8,
            StatusCode::ImageFormatMismatch => -9,
            StatusCode::ImageFormatNotSupported => -10,
            StatusCode::BuildProgramFailure => -11,
            StatusCode::MapFailure => -12,
            StatusCode::MisalignedSubBufferOffset => -13,
            StatusCode::ExecStatusErrorForEventsInWaitList => -14,
            StatusCode::InvalidValue => -30,
            StatusCode::InvalidDeviceType => -31,
            StatusCode::InvalidPlatform => -32,
            StatusCode::InvalidDevice => -33,
            StatusCode::InvalidContext => -34,
            StatusCode::InvalidQueueProperties => -35,
            StatusCode::InvalidCommandQueue => -36,
            StatusCode::InvalidHostPtr => -37,
            StatusCode::InvalidMemObject => -38,
            StatusCode::InvalidImageFormatDescriptor => -39,
            StatusCode::InvalidImageSize => -40,
            StatusCode::InvalidSampler => -41,
            StatusCode::InvalidBinary => -42,
            StatusCode::InvalidBuildOptions => -43,
            StatusCode::InvalidProgram => -44,
            StatusCode::InvalidProgramExecutable => -45,
            StatusCode::InvalidKernelName => -46,
            StatusCode::InvalidKernelDefinition => -47,
            StatusCode::InvalidKernel => -48,
            StatusCode::InvalidArgIndex => -49,
            StatusCode::InvalidArgValue => -50,
            StatusCode::InvalidArgSize => -51,
            StatusCode::InvalidKernelArgs => -52,
            StatusCode::InvalidWorkDimension => -53,
            StatusCode::InvalidWorkGroupSize => -54,
            StatusCode::InvalidWorkItemSize => -55,
            StatusCode::InvalidGlobalOffset => -56,
            StatusCode::InvalidEventWaitList => -57,
            StatusCode::InvalidEvent => -58,
            StatusCode::InvalidOperation => -59,
            StatusCode::InvalidGlObject => -60,
            StatusCode::InvalidBufferSize => -61,
            StatusCode::InvalidMipLevel => -62,
            StatusCode::InvalidGlobalWorkSize => -63,
        }
    }

    /// Looks up the status for a raw integer code.
    ///
    /// Returns `None` for codes outside the table, including the unused
    /// range `-15..=-29`.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.code() == code)
    }

    /// Symbolic name, e.g. `"INVALID_KERNEL_ARGS"`.
    pub fn name(self) -> &'static str {
        match self {
            StatusCode::Success => "SUCCESS",
            StatusCode::DeviceNotFound => "DEVICE_NOT_FOUND",
            StatusCode::DeviceNotAvailable => "DEVICE_NOT_AVAILABLE",
            StatusCode::CompilerNotAvailable => "COMPILER_NOT_AVAILABLE",
            StatusCode::MemObjectAllocationFailure => "MEM_OBJECT_ALLOCATION_FAILURE",
            StatusCode::OutOfResources => "OUT_OF_RESOURCES",
            StatusCode::OutOfHostMemory => "OUT_OF_HOST_MEMORY",
            StatusCode::ProfilingInfoNotAvailable => "PROFILING_INFO_NOT_AVAILABLE",
            StatusCode::MemCopyOverlap => "MEM_COPY_OVERLAP",
            StatusCode::ImageFormatMismatch => "IMAGE_FORMAT_MISMATCH",
            StatusCode::ImageFormatNotSupported => "IMAGE_FORMAT_NOT_SUPPORTED",
            StatusCode::BuildProgramFailure => "BUILD_PROGRAM_FAILURE",
            StatusCode::MapFailure => "MAP_FAILURE",
            StatusCode::MisalignedSubBufferOffset => "MISALIGNED_SUB_BUFFER_OFFSET",
            StatusCode::ExecStatusErrorForEventsInWaitList => {
                "EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST"
            }
            StatusCode::InvalidValue => "INVALID_VALUE",
            StatusCode::InvalidDeviceType => "INVALID_DEVICE_TYPE",
            StatusCode::InvalidPlatform => "INVALID_PLATFORM",
            StatusCode::InvalidDevice => "INVALID_DEVICE",
            StatusCode::InvalidContext => "INVALID_CONTEXT",
            StatusCode::InvalidQueueProperties => "INVALID_QUEUE_PROPERTIES",
            StatusCode::InvalidCommandQueue => "INVALID_COMMAND_QUEUE",
            StatusCode::InvalidHostPtr => "INVALID_HOST_PTR",
            StatusCode::InvalidMemObject => "INVALID_MEM_OBJECT",
            StatusCode::InvalidImageFormatDescriptor => "INVALID_IMAGE_FORMAT_DESCRIPTOR",
            StatusCode::InvalidImageSize => "INVALID_IMAGE_SIZE",
            StatusCode::InvalidSampler => "INVALID_SAMPLER",
            StatusCode::InvalidBinary => "INVALID_BINARY",
            StatusCode::InvalidBuildOptions => "INVALID_BUILD_OPTIONS",
            StatusCode::InvalidProgram => "INVALID_PROGRAM",
            StatusCode::InvalidProgramExecutable => "INVALID_PROGRAM_EXECUTABLE",
            StatusCode::InvalidKernelName => "INVALID_KERNEL_NAME",
            StatusCode::InvalidKernelDefinition => "INVALID_KERNEL_DEFINITION",
            StatusCode::InvalidKernel => "INVALID_KERNEL",
            StatusCode::InvalidArgIndex => "INVALID_ARG_INDEX",
            StatusCode::InvalidArgValue => "INVALID_ARG_VALUE",
            StatusCode::InvalidArgSize => "INVALID_ARG_SIZE",
            StatusCode::InvalidKernelArgs => "INVALID_KERNEL_ARGS",
            StatusCode::InvalidWorkDimension => "INVALID_WORK_DIMENSION",
            StatusCode::InvalidWorkGroupSize => "INVALID_WORK_GROUP_SIZE",
            StatusCode::InvalidWorkItemSize => "INVALID_WORK_ITEM_SIZE",
            StatusCode::InvalidGlobalOffset => "INVALID_GLOBAL_OFFSET",
            StatusCode::InvalidEventWaitList => "INVALID_EVENT_WAIT_LIST",
            StatusCode::InvalidEvent => "INVALID_EVENT",
            StatusCode::InvalidOperation => "INVALID_OPERATION",
            StatusCode::InvalidGlObject => "INVALID_GL_OBJECT",
            StatusCode::InvalidBufferSize => "INVALID_BUFFER_SIZE",
            StatusCode::InvalidMipLevel => "INVALID_MIP_LEVEL",
            StatusCode::InvalidGlobalWorkSize => "INVALID_GLOBAL_WORK_SIZE",
        }
    }

    /// Human-readable description for operator-facing messages.
    pub fn description(self) -> &'static str {
        match self {
            StatusCode::Success => "operation completed successfully",
            StatusCode::DeviceNotFound => "no device matched the requested type",
            StatusCode::DeviceNotAvailable => "device is currently not available",
            StatusCode::CompilerNotAvailable => "no kernel compiler is available",
            StatusCode::MemObjectAllocationFailure => "failed to allocate device memory",
            StatusCode::OutOfResources => "device ran out of resources",
            StatusCode::OutOfHostMemory => "host ran out of memory",
            StatusCode::ProfilingInfoNotAvailable => {
                "profiling was not enabled on the issuing queue"
            }
            StatusCode::MemCopyOverlap => "source and destination regions overlap",
            StatusCode::ImageFormatMismatch => "image formats do not match",
            StatusCode::ImageFormatNotSupported => "image format is not supported",
            StatusCode::BuildProgramFailure => "program failed to build",
            StatusCode::MapFailure => "failed to map buffer",
            StatusCode::MisalignedSubBufferOffset => "sub-buffer offset is misaligned",
            StatusCode::ExecStatusErrorForEventsInWaitList => {
                "a command in the wait list failed"
            }
            StatusCode::InvalidValue => "invalid value",
            StatusCode::InvalidDeviceType => "invalid device type",
            StatusCode::InvalidPlatform => "invalid platform",
            StatusCode::InvalidDevice => "invalid device",
            StatusCode::InvalidContext => "invalid context",
            StatusCode::InvalidQueueProperties => "invalid queue properties",
            StatusCode::InvalidCommandQueue => "invalid or released command queue",
            StatusCode::InvalidHostPtr => "invalid host pointer",
            StatusCode::InvalidMemObject => "buffer does not belong to this device",
            StatusCode::InvalidImageFormatDescriptor => "invalid image format descriptor",
            StatusCode::InvalidImageSize => "invalid image size",
            StatusCode::InvalidSampler => "invalid sampler",
            StatusCode::InvalidBinary => "invalid program binary",
            StatusCode::InvalidBuildOptions => "invalid build options",
            StatusCode::InvalidProgram => "invalid program",
            StatusCode::InvalidProgramExecutable => "program has no built executable",
            StatusCode::InvalidKernelName => "kernel entry point not found in program",
            StatusCode::InvalidKernelDefinition => "invalid kernel definition",
            StatusCode::InvalidKernel => "invalid kernel",
            StatusCode::InvalidArgIndex => "kernel argument index out of range",
            StatusCode::InvalidArgValue => "invalid kernel argument value",
            StatusCode::InvalidArgSize => "invalid kernel argument size",
            StatusCode::InvalidKernelArgs => "kernel arguments are not all bound",
            StatusCode::InvalidWorkDimension => "invalid work dimension",
            StatusCode::InvalidWorkGroupSize => "invalid work-group size",
            StatusCode::InvalidWorkItemSize => "invalid work-item size",
            StatusCode::InvalidGlobalOffset => "invalid global offset",
            StatusCode::InvalidEventWaitList => "invalid event wait list",
            StatusCode::InvalidEvent => "invalid event",
            StatusCode::InvalidOperation => "invalid operation",
            StatusCode::InvalidGlObject => "invalid GL object",
            StatusCode::InvalidBufferSize => "buffer sizes do not match",
            StatusCode::InvalidMipLevel => "invalid mip level",
            StatusCode::InvalidGlobalWorkSize => "global work size does not match the buffers",
        }
    }

    /// Returns `true` for [`StatusCode::Success`].
    pub fn is_success(self) -> bool {
        self == StatusCode::Success
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_roundtrip() {
        for status in StatusCode::ALL {
            assert_eq!(StatusCode::from_code(status.code()), Some(status));
        }
    }

    #[test]
    fn test_codes_unique() {
        let codes: HashSet<i32> = StatusCode::ALL.iter().map(|s| s.code()).collect();
        assert_eq!(codes.len(), StatusCode::ALL.len());
    }

    #[test]
    fn test_gap_is_unmapped() {
        for code in -29..=-15 {
            assert_eq!(StatusCode::from_code(code), None, "code {code}");
        }
        assert_eq!(StatusCode::from_code(1), None);
        assert_eq!(StatusCode::from_code(-64), None);
    }

    #[test]
    fn test_table_edges() {
        assert_eq!(
            StatusCode::from_code(-14),
            Some(StatusCode::ExecStatusErrorForEventsInWaitList)
        );
        assert_eq!(StatusCode::from_code(-30), Some(StatusCode::InvalidValue));
        assert_eq!(
            StatusCode::from_code(-63),
            Some(StatusCode::InvalidGlobalWorkSize)
        );
    }

    #[test]
    fn test_descriptions_non_empty() {
        for status in StatusCode::ALL {
            assert!(!status.description().is_empty());
            assert!(!status.name().is_empty());
        }
    }

    #[test]
    fn test_display() {
        let s = format!("{}", StatusCode::InvalidKernelArgs);
        assert!(s.contains("INVALID_KERNEL_ARGS"));
        assert!(s.contains("-52"));
    }

    #[test]
    fn test_is_success() {
        assert!(StatusCode::Success.is_success());
        assert!(!StatusCode::OutOfResources.is_success());
    }
}
