use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// OPCODE - Instruction vocabulary understood by the VM
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // variables
    GetLocal,
    GetConstant,
    GetInstanceVariable,
    SetLocal,
    SetConstant,
    SetInstanceVariable,

    // literals
    PutBoolean,
    PutString,
    PutFloat,
    PutSelf,
    PutObject,
    PutNil,

    // composites
    NewArray,
    ExpandArray,
    SplatArray,
    NewHash,
    NewRange,

    // ==========================================================================
    // Control flow. Jump operands are instruction lines in the same set.
    // ==========================================================================
    BranchUnless,
    BranchIf,
    Jump,
    Break,

    // definitions
    DefMethod,
    DefSingletonMethod,
    DefClass,

    // calls
    Send,
    InvokeBlock,
    GetBlock,

    // stack
    Pop,
    Dup,
    Leave,
}

impl Opcode {
    /// Name used in the textual listing.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::GetLocal => "getlocal",
            Opcode::GetConstant => "getconstant",
            Opcode::GetInstanceVariable => "getinstancevariable",
            Opcode::SetLocal => "setlocal",
            Opcode::SetConstant => "setconstant",
            Opcode::SetInstanceVariable => "setinstancevariable",
            Opcode::PutBoolean => "putboolean",
            Opcode::PutString => "putstring",
            Opcode::PutFloat => "putfloat",
            Opcode::PutSelf => "putself",
            Opcode::PutObject => "putobject",
            Opcode::PutNil => "putnil",
            Opcode::NewArray => "newarray",
            Opcode::ExpandArray => "expand_array",
            Opcode::SplatArray => "splat_array",
            Opcode::NewHash => "newhash",
            Opcode::NewRange => "newrange",
            Opcode::BranchUnless => "branchunless",
            Opcode::BranchIf => "branchif",
            Opcode::Jump => "jump",
            Opcode::Break => "break",
            Opcode::DefMethod => "def_method",
            Opcode::DefSingletonMethod => "def_singleton_method",
            Opcode::DefClass => "def_class",
            Opcode::Send => "send",
            Opcode::InvokeBlock => "invokeblock",
            Opcode::GetBlock => "getblock",
            Opcode::Pop => "pop",
            Opcode::Dup => "dup",
            Opcode::Leave => "leave",
        }
    }

    /// Opcodes whose operand is a line in the same instruction set.
    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::BranchUnless | Opcode::BranchIf | Opcode::Jump)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
