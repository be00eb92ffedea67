//! Runtime library functions called by lowered code.
//!
//! Each primitive is declared on first use as an external, public,
//! artificial function symbol and cached in the session, so a module
//! carries at most one declaration per primitive.

use golow_tree::{Linkage, RecordField, Symbol, SymbolId, SymbolKind, TreeId, TreeTypeId};

use crate::session::Session;

/// Hash/equality function family of a type descriptor.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum HashClass {
    /// Compare and hash the raw bytes.
    Identity,
    String,
    /// Dispatch to the dynamic type's own functions.
    Interface,
    /// Not comparable; traps at run time.
    Error,
}

impl HashClass {
    fn suffix(self) -> &'static str {
        match self {
            HashClass::Identity => "identity",
            HashClass::String => "string",
            HashClass::Interface => "interface",
            HashClass::Error => "error",
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RuntimeFn {
    New,
    NewMap,
    NewInterfacePointer,
    NewInterfaceObject,
    SendSmall,
    SendBig,
    SendNonblockingSmall,
    SendNonblockingBig,
    ReceiveSmall,
    ReceiveBig,
    ReceiveNonblockingSmall,
    ReceiveNonblockingBig,
    Select,
    AllocateTrampoline,
    InitTrampoline,
    IncrementRefcount,
    DecrementRefcount,
    RefcountFlushQueue,
    TypeHash(HashClass),
    TypeEqual(HashClass),
}

impl RuntimeFn {
    /// C name of the primitive.
    pub fn name(self) -> String {
        let name = match self {
            RuntimeFn::New => "__go_new",
            RuntimeFn::NewMap => "__go_new_map",
            RuntimeFn::NewInterfacePointer => "__go_new_interface_pointer",
            RuntimeFn::NewInterfaceObject => "__go_new_interface_object",
            RuntimeFn::SendSmall => "__go_send_small",
            RuntimeFn::SendBig => "__go_send_big",
            RuntimeFn::SendNonblockingSmall => "__go_send_nonblocking_small",
            RuntimeFn::SendNonblockingBig => "__go_send_nonblocking_big",
            RuntimeFn::ReceiveSmall => "__go_receive_small",
            RuntimeFn::ReceiveBig => "__go_receive_big",
            RuntimeFn::ReceiveNonblockingSmall => "__go_receive_nonblocking_small",
            RuntimeFn::ReceiveNonblockingBig => "__go_receive_nonblocking_big",
            RuntimeFn::Select => "__go_select",
            RuntimeFn::AllocateTrampoline => "__go_allocate_trampoline",
            RuntimeFn::InitTrampoline => "__builtin_init_trampoline",
            RuntimeFn::IncrementRefcount => "__go_increment_refcount",
            RuntimeFn::DecrementRefcount => "__go_decrement_refcount",
            RuntimeFn::RefcountFlushQueue => "__go_refcount_flush_queue",
            RuntimeFn::TypeHash(class) => return format!("__go_type_hash_{}", class.suffix()),
            RuntimeFn::TypeEqual(class) => return format!("__go_type_equal_{}", class.suffix()),
        };
        name.to_owned()
    }
}

impl Session<'_> {
    /// Parameter and result types of a primitive.
    fn runtime_signature(&mut self, f: RuntimeFn) -> (Vec<TreeTypeId>, TreeTypeId) {
        let ptr = TreeTypeId::VOID_PTR;
        let uintptr = self.uintptr();
        let (bool_, u64_, void) = (TreeTypeId::BOOL, TreeTypeId::U64, TreeTypeId::VOID);
        match f {
            RuntimeFn::New | RuntimeFn::AllocateTrampoline => (vec![uintptr], ptr),
            RuntimeFn::NewMap => (vec![ptr, uintptr], ptr),
            RuntimeFn::NewInterfacePointer => (vec![ptr, ptr, ptr], ptr),
            RuntimeFn::NewInterfaceObject => (vec![ptr, ptr, uintptr, ptr], ptr),
            RuntimeFn::SendSmall => (vec![ptr, u64_, bool_], void),
            RuntimeFn::SendBig | RuntimeFn::ReceiveBig => (vec![ptr, ptr, bool_], void),
            RuntimeFn::SendNonblockingSmall => (vec![ptr, u64_], bool_),
            RuntimeFn::SendNonblockingBig | RuntimeFn::ReceiveNonblockingBig => {
                (vec![ptr, ptr], bool_)
            }
            RuntimeFn::ReceiveSmall => (vec![ptr, bool_], u64_),
            RuntimeFn::ReceiveNonblockingSmall => {
                let result = self.builtin_record("__go_receive_nonblocking_small", |_| {
                    vec![
                        RecordField::new("__val", u64_),
                        RecordField::new("__success", bool_),
                    ]
                });
                (vec![ptr], result)
            }
            RuntimeFn::Select => (vec![ptr, uintptr, bool_], uintptr),
            RuntimeFn::InitTrampoline => (vec![ptr, ptr, ptr], void),
            RuntimeFn::IncrementRefcount | RuntimeFn::DecrementRefcount => (vec![ptr, ptr], void),
            RuntimeFn::RefcountFlushQueue => (vec![ptr], void),
            RuntimeFn::TypeHash(_) => (vec![ptr, uintptr], uintptr),
            RuntimeFn::TypeEqual(_) => (vec![ptr, uintptr, ptr, uintptr], bool_),
        }
    }

    /// Declaration of a primitive, created on first use.
    pub(crate) fn runtime_fn(&mut self, f: RuntimeFn) -> SymbolId {
        if let Some(&sym) = self.caches.runtime.get(&f) {
            return sym;
        }
        let (params, result) = self.runtime_signature(f);
        let ty = self.module.types.function(params, result);
        let mut symbol = Symbol::new(SymbolKind::Function, f.name(), ty);
        symbol.linkage = Linkage {
            artificial: true,
            ..Linkage::EXTERNAL
        };
        let sym = self.add_symbol(symbol);
        tracing::trace!(name = %f.name(), "declared runtime function");
        self.caches.runtime.insert(f, sym);
        sym
    }

    /// Call a primitive. Arguments are converted to the declared
    /// parameter types.
    pub(crate) fn call_runtime(&mut self, f: RuntimeFn, args: Vec<TreeId>) -> TreeId {
        let sym = self.runtime_fn(f);
        let fn_ty = self.module.symbols.get(sym).ty;
        let (params, result) = match self.module.types.get(fn_ty) {
            golow_tree::TreeType::Function { params, result } => (params.clone(), *result),
            _ => (Vec::new(), TreeTypeId::ERROR),
        };
        let args = args
            .into_iter()
            .enumerate()
            .map(|(i, arg)| match params.get(i) {
                Some(&param) => self.convert(arg, param),
                None => arg,
            })
            .collect();
        self.call(sym, args, result)
    }
}
