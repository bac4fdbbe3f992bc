//! Expression compilation.
//!
//! Predicates accumulate in an [`ExpressionCompiler`] and render into a
//! [`CompiledExpression`]: the expression text plus its `#nN` name and `:vN`
//! value placeholder maps. A [`PlaceholderAllocator`] passed to
//! [`ExpressionCompiler::render_with`] lets several expressions of one request
//! share a single placeholder numbering.

pub mod compiler;
pub mod placeholder;
pub mod predicate;

pub use compiler::{CompiledExpression, ExpressionCompiler};
pub use placeholder::PlaceholderAllocator;
pub use predicate::{Arity, Operator, Predicate};
