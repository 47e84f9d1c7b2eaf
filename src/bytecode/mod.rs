pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod ir;
pub mod local_table;
pub mod op;

pub use compile::Generator;
pub use compile_error::CompileError;
pub use ir::{AnchorId, ArgSet, Instruction, InstructionSet, Param, SetKind};
pub use op::Opcode;

/// Binary form of compiled sets, for loading without re-parsing the listing.
pub fn encode(sets: &[InstructionSet]) -> Result<Vec<u8>, CompileError> {
    postcard::to_allocvec(sets).map_err(CompileError::Encode)
}

pub fn decode(bytes: &[u8]) -> Result<Vec<InstructionSet>, CompileError> {
    postcard::from_bytes(bytes).map_err(CompileError::Decode)
}
