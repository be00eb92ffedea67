//! Lowered (backend) types and their storage layout.
//!
//! Scalar, pointer, array and function types are interned so equal shapes
//! share an id. Record types are nominal: every [`TypeTable::record`] or
//! [`TypeTable::declare_record`] call creates a fresh record, and a
//! declared record can be completed later to express recursion through
//! pointers.

use rustc_hash::FxHashMap;

/// Index into the [`TypeTable`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct TreeTypeId(u32);

impl TreeTypeId {
    pub const ERROR: TreeTypeId = TreeTypeId(0);
    pub const VOID: TreeTypeId = TreeTypeId(1);
    pub const BOOL: TreeTypeId = TreeTypeId(2);
    pub const U8: TreeTypeId = TreeTypeId(3);
    pub const U32: TreeTypeId = TreeTypeId(4);
    pub const U64: TreeTypeId = TreeTypeId(5);
    pub const I64: TreeTypeId = TreeTypeId(6);
    /// `const void *`.
    pub const VOID_PTR: TreeTypeId = TreeTypeId(7);

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_error(self) -> bool {
        self.0 == 0
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct RecordField {
    pub name: String,
    pub ty: TreeTypeId,
}

impl RecordField {
    pub fn new(name: impl Into<String>, ty: TreeTypeId) -> Self {
        RecordField {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Record {
    pub name: Option<String>,
    pub fields: Vec<RecordField>,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TreeType {
    Error,
    Void,
    Bool,
    Int { bits: u8, signed: bool },
    Float { bits: u8 },
    Pointer(TreeTypeId),
    Record(Record),
    /// `len` is `None` for an array of unknown bound.
    Array { elem: TreeTypeId, len: Option<u64> },
    Function { params: Vec<TreeTypeId>, result: TreeTypeId },
}

/// Target parameters that storage layout depends on.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Target {
    pub pointer_size: u64,
    /// Cap on alignment of a type used as a struct field.
    pub max_field_align: u64,
}

impl Target {
    pub const LP64: Target = Target {
        pointer_size: 8,
        max_field_align: 8,
    };

    pub const ILP32: Target = Target {
        pointer_size: 4,
        max_field_align: 4,
    };

    /// Unsigned integer type as wide as a pointer.
    pub fn uintptr(self) -> TreeTypeId {
        if self.pointer_size == 4 {
            TreeTypeId::U32
        } else {
            TreeTypeId::U64
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Layout {
    pub size: u64,
    pub align: u64,
}

impl Layout {
    const EMPTY: Layout = Layout { size: 0, align: 1 };
}

pub struct TypeTable {
    types: Vec<TreeType>,
    interned: FxHashMap<TreeType, TreeTypeId>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    pub fn new() -> Self {
        let mut table = TypeTable {
            types: Vec::new(),
            interned: FxHashMap::default(),
        };
        for ty in [
            TreeType::Error,
            TreeType::Void,
            TreeType::Bool,
            TreeType::Int {
                bits: 8,
                signed: false,
            },
            TreeType::Int {
                bits: 32,
                signed: false,
            },
            TreeType::Int {
                bits: 64,
                signed: false,
            },
            TreeType::Int {
                bits: 64,
                signed: true,
            },
            TreeType::Pointer(TreeTypeId::VOID),
        ] {
            table.intern(ty);
        }
        table
    }

    fn push(&mut self, ty: TreeType) -> TreeTypeId {
        let Ok(raw) = u32::try_from(self.types.len()) else {
            panic!("type table exceeded {} entries", u32::MAX);
        };
        self.types.push(ty);
        TreeTypeId(raw)
    }

    /// Intern a structural type. Records are never merged.
    pub fn intern(&mut self, ty: TreeType) -> TreeTypeId {
        if matches!(ty, TreeType::Record(_)) {
            return self.push(ty);
        }
        if let Some(&id) = self.interned.get(&ty) {
            return id;
        }
        let id = self.push(ty.clone());
        self.interned.insert(ty, id);
        id
    }

    pub fn int(&mut self, bits: u8, signed: bool) -> TreeTypeId {
        self.intern(TreeType::Int { bits, signed })
    }

    pub fn float(&mut self, bits: u8) -> TreeTypeId {
        self.intern(TreeType::Float { bits })
    }

    pub fn pointer(&mut self, to: TreeTypeId) -> TreeTypeId {
        self.intern(TreeType::Pointer(to))
    }

    pub fn array(&mut self, elem: TreeTypeId, len: Option<u64>) -> TreeTypeId {
        self.intern(TreeType::Array { elem, len })
    }

    pub fn function(&mut self, params: Vec<TreeTypeId>, result: TreeTypeId) -> TreeTypeId {
        self.intern(TreeType::Function { params, result })
    }

    pub fn record(&mut self, name: Option<&str>, fields: Vec<RecordField>) -> TreeTypeId {
        self.push(TreeType::Record(Record {
            name: name.map(str::to_owned),
            fields,
        }))
    }

    /// Create an empty named record to be filled by
    /// [`complete_record`](Self::complete_record).
    pub fn declare_record(&mut self, name: &str) -> TreeTypeId {
        self.record(Some(name), Vec::new())
    }

    pub fn complete_record(&mut self, id: TreeTypeId, fields: Vec<RecordField>) {
        if let Some(TreeType::Record(record)) = self.types.get_mut(id.index()) {
            record.fields = fields;
        }
    }

    /// Out-of-range ids read as [`TreeType::Error`].
    pub fn get(&self, id: TreeTypeId) -> &TreeType {
        self.types.get(id.index()).unwrap_or(&TreeType::Error)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn record_fields(&self, id: TreeTypeId) -> &[RecordField] {
        match self.get(id) {
            TreeType::Record(record) => &record.fields,
            _ => &[],
        }
    }

    pub fn field_index(&self, id: TreeTypeId, name: &str) -> Option<u32> {
        self.record_fields(id)
            .iter()
            .position(|f| f.name == name)
            .and_then(|i| u32::try_from(i).ok())
    }

    pub fn field_type(&self, id: TreeTypeId, index: u32) -> TreeTypeId {
        self.record_fields(id)
            .get(index as usize)
            .map_or(TreeTypeId::ERROR, |f| f.ty)
    }

    pub fn pointee(&self, id: TreeTypeId) -> TreeTypeId {
        match self.get(id) {
            TreeType::Pointer(to) => *to,
            _ => TreeTypeId::ERROR,
        }
    }

    pub fn element(&self, id: TreeTypeId) -> TreeTypeId {
        match self.get(id) {
            TreeType::Array { elem, .. } => *elem,
            _ => TreeTypeId::ERROR,
        }
    }

    pub fn is_pointer(&self, id: TreeTypeId) -> bool {
        matches!(self.get(id), TreeType::Pointer(_))
    }

    /// Records and arrays are aggregates; everything else fits a register
    /// class of its own.
    pub fn is_aggregate(&self, id: TreeTypeId) -> bool {
        matches!(self.get(id), TreeType::Record(_) | TreeType::Array { .. })
    }

    /// Size and alignment of `id` on `target`.
    pub fn layout(&self, id: TreeTypeId, target: Target) -> Layout {
        match self.get(id) {
            TreeType::Error | TreeType::Void | TreeType::Function { .. } => Layout::EMPTY,
            TreeType::Bool => Layout { size: 1, align: 1 },
            TreeType::Int { bits, .. } | TreeType::Float { bits } => {
                let size = u64::from(*bits).div_ceil(8).max(1);
                Layout { size, align: size }
            }
            TreeType::Pointer(_) => Layout {
                size: target.pointer_size,
                align: target.pointer_size,
            },
            TreeType::Array { elem, len } => {
                let elem = self.layout(*elem, target);
                Layout {
                    size: elem.size.saturating_mul(len.unwrap_or(0)),
                    align: elem.align,
                }
            }
            TreeType::Record(record) => {
                let mut size = 0u64;
                let mut align = 1u64;
                for field in &record.fields {
                    let f = self.layout(field.ty, target);
                    let field_align = f.align.min(target.max_field_align);
                    size = round_up(size, field_align) + f.size;
                    align = align.max(field_align);
                }
                Layout {
                    size: round_up(size, align),
                    align,
                }
            }
        }
    }

    /// Alignment of `id` when used as a struct field.
    pub fn field_align(&self, id: TreeTypeId, target: Target) -> u64 {
        self.layout(id, target).align.min(target.max_field_align)
    }

    /// Byte offset of field `index` within record `id`.
    pub fn field_offset(&self, id: TreeTypeId, index: u32, target: Target) -> u64 {
        let mut offset = 0u64;
        for (i, field) in self.record_fields(id).iter().enumerate() {
            let f = self.layout(field.ty, target);
            offset = round_up(offset, f.align.min(target.max_field_align));
            if i == index as usize {
                return offset;
            }
            offset += f.size;
        }
        offset
    }

    /// Short human-readable rendering used by the tree printer.
    pub fn display(&self, id: TreeTypeId) -> String {
        match self.get(id) {
            TreeType::Error => "error".to_owned(),
            TreeType::Void => "void".to_owned(),
            TreeType::Bool => "bool".to_owned(),
            TreeType::Int { bits, signed } => {
                format!("{}{bits}", if *signed { 'i' } else { 'u' })
            }
            TreeType::Float { bits } => format!("f{bits}"),
            TreeType::Pointer(to) => format!("*{}", self.display(*to)),
            TreeType::Record(record) => record.name.clone().unwrap_or_else(|| "record".to_owned()),
            TreeType::Array { elem, len } => match len {
                Some(n) => format!("[{n}]{}", self.display(*elem)),
                None => format!("[]{}", self.display(*elem)),
            },
            TreeType::Function { .. } => "fn".to_owned(),
        }
    }
}

#[inline]
fn round_up(value: u64, align: u64) -> u64 {
    if align <= 1 {
        value
    } else {
        value.div_ceil(align) * align
    }
}

#[cfg(test)]
mod tests;
