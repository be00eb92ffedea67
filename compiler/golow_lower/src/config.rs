//! Lowering configuration.

use golow_tree::Target;

/// Target parameters the lowering needs beyond plain storage layout.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct TargetConfig {
    pub pointer_size: u64,
    /// Cap on the alignment of a type used as a struct field.
    pub max_field_align: u64,
    /// Bytes of a trampoline stub before alignment padding.
    pub trampoline_size: u64,
    pub trampoline_align: u64,
    /// Bits or-ed into a trampoline address before it is used as a code
    /// pointer. Zero on targets that need no adjustment.
    pub trampoline_tag: u64,
}

impl TargetConfig {
    pub const fn x86_64() -> Self {
        TargetConfig {
            pointer_size: 8,
            max_field_align: 8,
            trampoline_size: 10,
            trampoline_align: 16,
            trampoline_tag: 0,
        }
    }

    pub const fn i386() -> Self {
        TargetConfig {
            pointer_size: 4,
            max_field_align: 4,
            trampoline_size: 10,
            trampoline_align: 4,
            trampoline_tag: 0,
        }
    }

    /// Layout parameters for the tree type table.
    pub fn layout_target(&self) -> Target {
        Target {
            pointer_size: self.pointer_size,
            max_field_align: self.max_field_align,
        }
    }

    /// Size requested from the trampoline allocator.
    pub fn trampoline_alloc_size(&self) -> u64 {
        let align = self.trampoline_align.max(1);
        self.trampoline_size.div_ceil(align) * align
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self::x86_64()
    }
}

/// Configuration for one lowering session.
#[derive(Clone, Debug)]
pub struct LowerConfig {
    /// Overrides the program's package name when set.
    pub package_name: Option<String>,
    /// Overrides the program's unique prefix when set. An empty prefix
    /// falls back to `"go"`.
    pub unique_prefix: Option<String>,
    /// Package whose init function gets the fixed runtime entry name.
    pub entry_package: String,
    pub target: TargetConfig,
    /// Emit refcount queues for functions that record refcount entries.
    pub refcounts: bool,
}

impl Default for LowerConfig {
    fn default() -> Self {
        LowerConfig {
            package_name: None,
            unique_prefix: None,
            entry_package: "main".to_owned(),
            target: TargetConfig::default(),
            refcounts: true,
        }
    }
}

impl LowerConfig {
    pub fn with_target(mut self, target: TargetConfig) -> Self {
        self.target = target;
        self
    }

    pub fn with_refcounts(mut self, enabled: bool) -> Self {
        self.refcounts = enabled;
        self
    }
}
