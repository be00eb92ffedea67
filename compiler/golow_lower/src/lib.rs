//! Lowering of checked golow programs to the generic tree IR.
//!
//! Takes a fully type-checked [`Program`] and produces a [`TreeModule`]:
//! one backend symbol per declaration, runtime type descriptors, interface
//! method tables, the package initialization function, and lowered function
//! bodies with closures, channel operations and refcount queues spelled out
//! as calls into the runtime library.
//!
//! # Debug Environment Variables
//!
//! - `RUST_LOG=golow_lower=debug`: symbol materialization, scheduling and
//!   per-function summaries.
//! - `RUST_LOG=golow_lower=trace`: every descriptor, trampoline, channel
//!   protocol choice and dependency query.
//! - `RUST_LOG=golow_lower::typedesc=trace`: descriptors only.
//!
//! # Architecture
//!
//! Every component is a group of methods on [`Session`], which owns the
//! output module, the diagnostic queue and all memoization tables:
//!
//! - **Materializer** (`materialize`): declaration to symbol, cached.
//! - **Init scheduler** (`init_order`, `driver`): order of package-level
//!   initializers and the init function.
//! - **Descriptors** (`typedesc`): type descriptors, itables, map
//!   descriptors.
//! - **Closures and parameters** (`closure`): static chains, trampolines,
//!   receiver and heap parameter copies.
//! - **Channels** (`channel`): send/receive protocol selection.
//! - **Refcount queues** (`refcount`).
//!
//! # Example
//!
//! ```ignore
//! use golow_ir::{ProgramBuilder, TypeId};
//! use golow_lower::{lower_program, LowerConfig};
//!
//! let mut b = ProgramBuilder::new("main", "go");
//! let one = b.int(1);
//! b.global_var("Answer", TypeId::INT, Some(one));
//! let output = lower_program(&b.finish(), LowerConfig::default());
//! let module = output.into_module()?;
//! ```

#![allow(
    // Counts and indices cross between usize, u32 and u64 freely; all are
    // bounded by arena sizes.
    clippy::cast_possible_truncation,
    // Lowering helpers thread the function, the operands and a span.
    clippy::too_many_arguments,
)]

mod channel;
mod closure;
mod config;
mod constant;
mod driver;
mod error;
mod init_order;
mod lower;
mod mangle;
mod materialize;
mod refcount;
mod runtime;
mod session;
mod stack;
mod typedesc;
mod types;

use std::sync::Once;

use golow_diagnostic::{Diagnostic, ErrorCode};
use golow_ir::{Program, Span};
use golow_tree::TreeModule;

pub use config::{LowerConfig, TargetConfig};
pub use error::{EmitError, LowerOutput};
pub use init_order::{sort_inits, Schedule};
pub use runtime::{HashClass, RuntimeFn};
pub use session::Session;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Does nothing unless `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

/// Lower `program` into a tree module.
///
/// Never fails outright: errors are reported on the output, and
/// [`LowerOutput::into_module`] refuses to hand over a module once any
/// error was reported.
#[tracing::instrument(level = "debug", skip_all)]
pub fn lower_program(program: &Program, config: LowerConfig) -> LowerOutput {
    let mut session = Session::new(program, config);
    session.lower_package();
    if let Err(shared) = session.module().check_unshared() {
        session.report(
            Diagnostic::error(ErrorCode::E9001)
                .with_message(format!(
                    "tree node {} has {} parents",
                    shared.node.index(),
                    shared.parents
                ))
                .with_label(Span::DUMMY, ErrorCode::E9001.summary()),
        );
    }
    let (module, mut diagnostics) = session.into_parts();
    tracing::debug!(
        symbols = module.symbols.len(),
        errors = diagnostics.error_count(),
        "lowered program"
    );
    LowerOutput {
        error_count: diagnostics.error_count(),
        diagnostics: diagnostics.take(),
        module,
    }
}

/// Convenience for tools that only want the module.
pub fn lower_to_module(program: &Program, config: LowerConfig) -> Result<TreeModule, EmitError> {
    lower_program(program, config).into_module()
}
