// Query document model and parser

pub mod ast;
pub mod parser;

pub use ast::{Document, Field, OperationDefinition, OperationType, Value, VariableDefinition};
pub use parser::parse_document;
