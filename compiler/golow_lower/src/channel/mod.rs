//! Channel operations.
//!
//! The runtime moves channel elements either by value or by address. An
//! element of at most eight bytes that is not an aggregate travels by
//! value, widened to a 64-bit integer; anything else travels by the
//! address of a copy.
//!
//! Floats cross the 64-bit slot by bit pattern, never by numeric
//! conversion. Blocking operations carry a flag telling the runtime whether
//! a `select` already chose this case.

use golow_diagnostic::ErrorCode;
use golow_ir::{Span, TypeId};
use golow_tree::{SymbolId, Target, TreeId, TreeType, TreeTypeId, TypeTable};

use crate::runtime::RuntimeFn;
use crate::session::Session;


/// Widest element passed by value.
const SMALL_PAYLOAD: u64 = 8;

/// Whether an element of type `ty` travels by value.
pub(crate) fn is_small_payload(types: &TypeTable, ty: TreeTypeId, target: Target) -> bool {
    !types.is_aggregate(ty) && types.layout(ty, target).size <= SMALL_PAYLOAD
}

/// How a send waits.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum SendMode {
    /// Block until the value is taken. `for_select` marks a send chosen
    /// by `select`.
    Blocking { for_select: bool },
    /// Return whether the value was taken, never blocking.
    Nonblocking { for_select: bool },
}

impl Session<'_> {
    /// Send `value` on `chan`, an element of type `elem`, from inside
    /// `function`.
    ///
    /// A non-blocking send yields whether the value was taken; a
    /// blocking one yields nothing.
    pub(crate) fn lower_send(
        &mut self,
        function: SymbolId,
        chan: TreeId,
        value: TreeId,
        elem: TypeId,
        mode: SendMode,
        span: Span,
    ) -> TreeId {
        if let SendMode::Nonblocking { for_select: true } = mode {
            return self.error(
                ErrorCode::E9001,
                span,
                "a non-blocking send cannot be a select case",
            );
        }
        let elem_ty = self.lower_type(elem);
        if chan.is_error() || value.is_error() || elem_ty.is_error() {
            return TreeId::ERROR;
        }
        let value = self.convert(value, elem_ty);
        let chan = self.convert(chan, TreeTypeId::VOID_PTR);
        if is_small_payload(&self.module.types, elem_ty, self.target()) {
            let bits = self.widen(value, elem_ty);
            return match mode {
                SendMode::Blocking { for_select } => {
                    let flag = self.bool_const(for_select);
                    self.call_runtime(RuntimeFn::SendSmall, vec![chan, bits, flag])
                }
                SendMode::Nonblocking { .. } => {
                    self.call_runtime(RuntimeFn::SendNonblockingSmall, vec![chan, bits])
                }
            };
        }

        let addr = self.address_of_value(function, value, "send");
        match mode {
            SendMode::Blocking { for_select } => {
                let flag = self.bool_const(for_select);
                self.call_runtime(RuntimeFn::SendBig, vec![chan, addr, flag])
            }
            SendMode::Nonblocking { .. } => {
                self.call_runtime(RuntimeFn::SendNonblockingBig, vec![chan, addr])
            }
        }
    }

    /// Blocking receive of an element of type `elem` from `chan`.
    pub(crate) fn lower_receive(
        &mut self,
        function: SymbolId,
        chan: TreeId,
        elem: TypeId,
        for_select: bool,
    ) -> TreeId {
        let elem_ty = self.lower_type(elem);
        if chan.is_error() || elem_ty.is_error() {
            return TreeId::ERROR;
        }
        let chan = self.convert(chan, TreeTypeId::VOID_PTR);
        let flag = self.bool_const(for_select);
        if is_small_payload(&self.module.types, elem_ty, self.target()) {
            let bits = self.call_runtime(RuntimeFn::ReceiveSmall, vec![chan, flag]);
            return self.narrow(bits, elem_ty);
        }
        let buffer = self.temp(Some(function), "received", elem_ty, None);
        let declare = self.decl_expr(buffer);
        let addr = self.decl_ref(buffer);
        let addr = self.addr_of(addr);
        let call = self.call_runtime(RuntimeFn::ReceiveBig, vec![chan, addr, flag]);
        let result = self.decl_ref(buffer);
        self.seq(vec![declare, call], Some(result))
    }

    /// Non-blocking receive; stores success into `ok` and yields the
    /// element, or its zero value when nothing was ready.
    pub(crate) fn lower_try_receive(
        &mut self,
        function: SymbolId,
        chan: TreeId,
        elem: TypeId,
        ok: TreeId,
    ) -> TreeId {
        let elem_ty = self.lower_type(elem);
        if chan.is_error() || ok.is_error() || elem_ty.is_error() {
            return TreeId::ERROR;
        }
        let chan = self.convert(chan, TreeTypeId::VOID_PTR);
        if is_small_payload(&self.module.types, elem_ty, self.target()) {
            let call = self.call_runtime(RuntimeFn::ReceiveNonblockingSmall, vec![chan]);
            let record = self.type_of(call);
            let result = self.temp(Some(function), "received", record, Some(call));
            let declare = self.decl_expr(result);
            let success = self.decl_ref(result);
            let success = self.field(success, "__success");
            let store = self.assign(ok, success);
            let bits = self.decl_ref(result);
            let bits = self.field(bits, "__val");
            let value = self.narrow(bits, elem_ty);
            return self.seq(vec![declare, store], Some(value));
        }
        let zero = self.zero_value(elem_ty);
        let buffer = self.temp(Some(function), "received", elem_ty, Some(zero));
        let declare = self.decl_expr(buffer);
        let addr = self.decl_ref(buffer);
        let addr = self.addr_of(addr);
        let call = self.call_runtime(RuntimeFn::ReceiveNonblockingBig, vec![chan, addr]);
        let store = self.assign(ok, call);
        let result = self.decl_ref(buffer);
        self.seq(vec![declare, store], Some(result))
    }

    /// A small element as the runtime's 64-bit slot.
    fn widen(&mut self, value: TreeId, ty: TreeTypeId) -> TreeId {
        let value = match self.module.types.get(ty).clone() {
            TreeType::Float { bits } => {
                let same_width = self.module.types.int(bits, false);
                self.bitcast(value, same_width)
            }
            TreeType::Pointer(_) => {
                let uintptr = self.uintptr();
                self.convert(value, uintptr)
            }
            _ => value,
        };
        self.convert(value, TreeTypeId::U64)
    }

    /// The runtime's 64-bit slot back as a small element.
    fn narrow(&mut self, bits: TreeId, ty: TreeTypeId) -> TreeId {
        match self.module.types.get(ty).clone() {
            TreeType::Float { bits: width } => {
                let same_width = self.module.types.int(width, false);
                let raw = self.convert(bits, same_width);
                self.bitcast(raw, ty)
            }
            TreeType::Pointer(_) => {
                let uintptr = self.uintptr();
                let raw = self.convert(bits, uintptr);
                self.convert(raw, ty)
            }
            _ => self.convert(bits, ty),
        }
    }
}
