use std::fmt;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::ast::{ArgKind, escape};
use crate::bytecode::{Opcode, compile_error::CompileError};

/// What kind of code unit an instruction set holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetKind {
    ProgramStart,
    Def,
    DefClass,
    Block,
}

impl SetKind {
    pub fn name(self) -> &'static str {
        match self {
            SetKind::ProgramStart => "ProgramStart",
            SetKind::Def => "Def",
            SetKind::DefClass => "DefClass",
            SetKind::Block => "Block",
        }
    }
}

/// Index of a jump target in its instruction set's anchor arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorId(pub usize);

/// An instruction operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Param {
    Int(i64),
    Bool(bool),
    /// String literal, printed quoted.
    Str(String),
    /// Method, variable or class name, printed bare.
    Name(String),
    /// Jump target not yet resolved to a line.
    Anchor(AnchorId),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Int(value) => write!(f, "{}", value),
            Param::Bool(value) => write!(f, "{}", value),
            Param::Str(value) => write!(f, "\"{}\"", escape(value)),
            Param::Name(name) => f.write_str(name),
            Param::Anchor(id) => write!(f, "<anchor {}>", id.0),
        }
    }
}

impl From<usize> for Param {
    fn from(value: usize) -> Self {
        Param::Int(value as i64)
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Bool(value)
    }
}

impl From<AnchorId> for Param {
    fn from(id: AnchorId) -> Self {
        Param::Anchor(id)
    }
}

/// A single compiled instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub params: Vec<Param>,
    /// Position inside the instruction set, from zero.
    pub line: usize,
    /// 1-based line of the source that produced it.
    pub source_line: usize,
    /// Target line of a jump, once resolved.
    pub anchor: Option<usize>,
}

impl Instruction {
    /// Debug form, e.g. `putobject: 99. source line: 3`.
    pub fn inspect(&self) -> String {
        let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        format!(
            "{}: {}. source line: {}",
            self.opcode,
            params.join(", "),
            self.source_line
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.line, self.opcode)?;
        for param in &self.params {
            write!(f, " {}", param)?;
        }
        Ok(())
    }
}

/// Names and kinds of a method's parameters, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgSet {
    names: Vec<String>,
    types: Vec<ArgKind>,
}

impl ArgSet {
    pub fn push(&mut self, name: impl Into<String>, kind: ArgKind) {
        self.names.push(name.into());
        self.types.push(kind);
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn types(&self) -> &[ArgKind] {
        &self.types
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One callable unit: the program body, a method, a class body or a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionSet {
    pub kind: SetKind,
    pub name: String,
    pub instructions: Vec<Instruction>,
    /// Parameters of a `Def` set; empty for the other kinds.
    pub arg_set: ArgSet,
    /// Resolved line of every anchor handed out by `new_anchor`.
    #[serde(skip)]
    anchors: Vec<Option<usize>>,
}

impl InstructionSet {
    pub fn new(kind: SetKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            instructions: Vec::new(),
            arg_set: ArgSet::default(),
            anchors: Vec::new(),
        }
    }

    pub fn program() -> Self {
        Self::new(SetKind::ProgramStart, SetKind::ProgramStart.name())
    }

    /// `<ProgramStart>` or `<Kind:Name>`.
    pub fn label(&self) -> String {
        match self.kind {
            SetKind::ProgramStart => format!("<{}>", self.kind.name()),
            kind => format!("<{}:{}>", kind.name(), self.name),
        }
    }

    /// Number of instructions so far; also the line the next one gets.
    pub fn count(&self) -> usize {
        self.instructions.len()
    }

    /// Appends an instruction and returns its line.
    pub fn define(&mut self, opcode: Opcode, source_line: usize, params: Vec<Param>) -> usize {
        let line = self.count();
        self.instructions.push(Instruction {
            opcode,
            params,
            line,
            source_line,
            anchor: None,
        });
        line
    }

    pub fn new_anchor(&mut self) -> AnchorId {
        self.anchors.push(None);
        AnchorId(self.anchors.len() - 1)
    }

    pub fn set_anchor(&mut self, id: AnchorId, line: usize) {
        if let Some(slot) = self.anchors.get_mut(id.0) {
            *slot = Some(line);
        }
    }

    /// Points `id` at the next instruction to be defined.
    pub fn set_anchor_here(&mut self, id: AnchorId) {
        let line = self.count();
        self.set_anchor(id, line);
    }

    /// Rewrites every anchor operand to the line it points at.
    pub fn resolve_anchors(&mut self) -> Result<(), CompileError> {
        let label = self.label();
        let anchors = &self.anchors;

        for instruction in &mut self.instructions {
            for param in &mut instruction.params {
                let Param::Anchor(id) = *param else {
                    continue;
                };
                let line = anchors.get(id.0).copied().flatten().ok_or_else(|| {
                    CompileError::Internal(format!(
                        "unresolved anchor {} at {} {} {}",
                        id.0, label, instruction.line, instruction.opcode
                    ))
                })?;
                trace!(
                    "{} {} {} -> {}",
                    label, instruction.line, instruction.opcode, line
                );
                *param = Param::from(line);
                instruction.anchor = Some(line);
            }
        }
        self.anchors.clear();
        Ok(())
    }
}

impl fmt::Display for InstructionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.label())?;
        for instruction in &self.instructions {
            writeln!(f, "{}", instruction)?;
        }
        Ok(())
    }
}
