//! Usage kinds and the table that maps them to synchronization intent.
//!
//! `UsageKind` is the contract between the graph and the hardware: every
//! read or write a pass declares is annotated with one, and the compiler
//! looks it up in [`usage_sync_info`] to derive the (stage, access, layout)
//! triple used when synthesizing barriers in [`crate::framegraph::compiler`].

use bitflags::bitflags;

bitflags! {
    /// Pipeline stages a resource access can be synchronized against.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PipelineStageMask: u32 {
        const TOP_OF_PIPE          = 1 << 0;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 1;
        const EARLY_FRAGMENT_TESTS = 1 << 2;
        const LATE_FRAGMENT_TESTS  = 1 << 3;
        const FRAGMENT_SHADER      = 1 << 4;
        const COMPUTE_SHADER       = 1 << 5;
        const TRANSFER             = 1 << 6;
        const BOTTOM_OF_PIPE       = 1 << 7;
    }
}

bitflags! {
    /// Memory access kinds a resource access can perform.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessMask: u32 {
        const COLOR_ATTACHMENT_WRITE = 1 << 0;
        const DEPTH_STENCIL_WRITE    = 1 << 1;
        const DEPTH_STENCIL_READ     = 1 << 2;
        const SHADER_READ            = 1 << 3;
        const SHADER_WRITE           = 1 << 4;
        const TRANSFER_READ          = 1 << 5;
        const TRANSFER_WRITE         = 1 << 6;
    }
}

bitflags! {
    /// Usage flags accumulated on a materialized image or buffer (spec
    /// invariant 4: the OR of every `UsageKind` it appears with).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResourceUsageFlags: u32 {
        const SAMPLED           = 1 << 0;
        const STORAGE           = 1 << 1;
        const COLOR_ATTACHMENT  = 1 << 2;
        const DEPTH_STENCIL     = 1 << 3;
        const TRANSFER_SRC      = 1 << 4;
        const TRANSFER_DST      = 1 << 5;
        const UNIFORM           = 1 << 6;
        const PRESENT           = 1 << 7;
    }
}

/// The tracked "layout" of an image resource between passes.
///
/// wgpu does not expose image layouts to safe code; this enum exists purely
/// so the compiler can still compute and log the transition a Vulkan-class
/// backend would need (see the Open Question recorded in DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayout {
    Undefined,
    ColorAttachmentOptimal,
    DepthStencilAttachmentOptimal,
    ShaderReadOnlyOptimal,
    General,
    TransferSrcOptimal,
    TransferDstOptimal,
    PresentSrc,
}

/// Canonical intent label on a read or write.
///
/// Maps deterministically to `(stage, access, layout)` via
/// [`usage_sync_info`] — this table is the synchronization contract
/// described in spec §3/§4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageKind {
    ColorAttachment,
    DepthStencilAttachment,
    FragmentReadSampled,
    ComputeReadStorage,
    ComputeWriteStorage,
    ComputeReadSampled,
    TransferSrc,
    TransferDst,
    Present,
}

impl UsageKind {
    /// Whether this usage kind writes the resource.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(
            self,
            Self::ColorAttachment
                | Self::DepthStencilAttachment
                | Self::ComputeWriteStorage
                | Self::TransferDst
        )
    }
}

/// Synchronization intent derived from a [`UsageKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncInfo {
    pub stage: PipelineStageMask,
    pub access: AccessMask,
    pub layout: ImageLayout,
    pub resource_flags: ResourceUsageFlags,
}

/// The closed table mapping every [`UsageKind`] to its synchronization
/// intent. Unsupported combinations simply do not exist in this enum —
/// there is no fallible path here, unlike the image-layout-transition
/// helper in [`crate::framegraph::resource`], because `UsageKind` is a
/// finite, exhaustively-matched set.
#[must_use]
pub const fn usage_sync_info(kind: UsageKind) -> SyncInfo {
    match kind {
        UsageKind::ColorAttachment => SyncInfo {
            stage: PipelineStageMask::COLOR_ATTACHMENT_OUTPUT,
            access: AccessMask::COLOR_ATTACHMENT_WRITE,
            layout: ImageLayout::ColorAttachmentOptimal,
            resource_flags: ResourceUsageFlags::COLOR_ATTACHMENT,
        },
        UsageKind::DepthStencilAttachment => SyncInfo {
            stage: PipelineStageMask::EARLY_FRAGMENT_TESTS.union(PipelineStageMask::LATE_FRAGMENT_TESTS),
            access: AccessMask::DEPTH_STENCIL_WRITE.union(AccessMask::DEPTH_STENCIL_READ),
            layout: ImageLayout::DepthStencilAttachmentOptimal,
            resource_flags: ResourceUsageFlags::DEPTH_STENCIL,
        },
        UsageKind::FragmentReadSampled => SyncInfo {
            stage: PipelineStageMask::FRAGMENT_SHADER,
            access: AccessMask::SHADER_READ,
            layout: ImageLayout::ShaderReadOnlyOptimal,
            resource_flags: ResourceUsageFlags::SAMPLED,
        },
        UsageKind::ComputeReadStorage => SyncInfo {
            stage: PipelineStageMask::COMPUTE_SHADER,
            access: AccessMask::SHADER_READ,
            layout: ImageLayout::General,
            resource_flags: ResourceUsageFlags::STORAGE,
        },
        UsageKind::ComputeWriteStorage => SyncInfo {
            stage: PipelineStageMask::COMPUTE_SHADER,
            access: AccessMask::SHADER_WRITE,
            layout: ImageLayout::General,
            resource_flags: ResourceUsageFlags::STORAGE,
        },
        UsageKind::ComputeReadSampled => SyncInfo {
            stage: PipelineStageMask::COMPUTE_SHADER,
            access: AccessMask::SHADER_READ,
            layout: ImageLayout::ShaderReadOnlyOptimal,
            resource_flags: ResourceUsageFlags::SAMPLED,
        },
        UsageKind::TransferSrc => SyncInfo {
            stage: PipelineStageMask::TRANSFER,
            access: AccessMask::TRANSFER_READ,
            layout: ImageLayout::TransferSrcOptimal,
            resource_flags: ResourceUsageFlags::TRANSFER_SRC,
        },
        UsageKind::TransferDst => SyncInfo {
            stage: PipelineStageMask::TRANSFER,
            access: AccessMask::TRANSFER_WRITE,
            layout: ImageLayout::TransferDstOptimal,
            resource_flags: ResourceUsageFlags::TRANSFER_DST,
        },
        UsageKind::Present => SyncInfo {
            stage: PipelineStageMask::BOTTOM_OF_PIPE,
            access: AccessMask::empty(),
            layout: ImageLayout::PresentSrc,
            resource_flags: ResourceUsageFlags::PRESENT,
        },
    }
}

/// Derives `(src_access, dst_access, src_stage, dst_stage)` for a layout
/// transition from a closed table. Unsupported transitions are fatal, per
/// spec §4.1 — there is no silent fallback.
///
/// # Panics
///
/// Panics if `old` and `new` describe a transition this table does not
/// recognize (`CompilerError::UnknownLayoutTransition` in spec terms).
#[must_use]
pub fn layout_transition(old: ImageLayout, new: ImageLayout) -> (AccessMask, AccessMask, PipelineStageMask, PipelineStageMask) {
    use ImageLayout::{
        ColorAttachmentOptimal, DepthStencilAttachmentOptimal, General, PresentSrc,
        ShaderReadOnlyOptimal, TransferDstOptimal, TransferSrcOptimal, Undefined,
    };

    let src = match old {
        Undefined => (AccessMask::empty(), PipelineStageMask::TOP_OF_PIPE),
        ColorAttachmentOptimal => (AccessMask::COLOR_ATTACHMENT_WRITE, PipelineStageMask::COLOR_ATTACHMENT_OUTPUT),
        DepthStencilAttachmentOptimal => (AccessMask::DEPTH_STENCIL_WRITE, PipelineStageMask::LATE_FRAGMENT_TESTS),
        ShaderReadOnlyOptimal => (AccessMask::SHADER_READ, PipelineStageMask::FRAGMENT_SHADER),
        General => (AccessMask::SHADER_WRITE, PipelineStageMask::COMPUTE_SHADER),
        TransferSrcOptimal => (AccessMask::TRANSFER_READ, PipelineStageMask::TRANSFER),
        TransferDstOptimal => (AccessMask::TRANSFER_WRITE, PipelineStageMask::TRANSFER),
        PresentSrc => (AccessMask::empty(), PipelineStageMask::BOTTOM_OF_PIPE),
    };
    let dst = match new {
        Undefined => panic!("unsupported layout transition: {old:?} -> {new:?} (transition into Undefined)"),
        ColorAttachmentOptimal => (AccessMask::COLOR_ATTACHMENT_WRITE, PipelineStageMask::COLOR_ATTACHMENT_OUTPUT),
        DepthStencilAttachmentOptimal => (AccessMask::DEPTH_STENCIL_WRITE, PipelineStageMask::EARLY_FRAGMENT_TESTS),
        ShaderReadOnlyOptimal => (AccessMask::SHADER_READ, PipelineStageMask::FRAGMENT_SHADER),
        General => (AccessMask::SHADER_READ.union(AccessMask::SHADER_WRITE), PipelineStageMask::COMPUTE_SHADER),
        TransferSrcOptimal => (AccessMask::TRANSFER_READ, PipelineStageMask::TRANSFER),
        TransferDstOptimal => (AccessMask::TRANSFER_WRITE, PipelineStageMask::TRANSFER),
        PresentSrc => (AccessMask::empty(), PipelineStageMask::BOTTOM_OF_PIPE),
    };

    (src.0, dst.0, src.1, dst.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_attachment_to_sampled_matches_scenario_s1() {
        let color = usage_sync_info(UsageKind::ColorAttachment);
        let sampled = usage_sync_info(UsageKind::FragmentReadSampled);
        assert_eq!(color.stage, PipelineStageMask::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(sampled.stage, PipelineStageMask::FRAGMENT_SHADER);
        assert_eq!(color.layout, ImageLayout::ColorAttachmentOptimal);
        assert_eq!(sampled.layout, ImageLayout::ShaderReadOnlyOptimal);
    }

    #[test]
    fn usage_flags_union_monotonically() {
        let a = usage_sync_info(UsageKind::FragmentReadSampled).resource_flags;
        let b = usage_sync_info(UsageKind::ColorAttachment).resource_flags;
        let combined = a.union(b);
        assert!(combined.contains(ResourceUsageFlags::SAMPLED));
        assert!(combined.contains(ResourceUsageFlags::COLOR_ATTACHMENT));
    }
}
