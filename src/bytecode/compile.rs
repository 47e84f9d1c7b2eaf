use log::{debug, trace};

use crate::{
    ast::{
        ArgKind, AssignExpression, BlockStatement, CallExpression, ClassStatement, DefStatement,
        Expression, ExpressionKind, IfExpression, ModuleStatement, Program, Statement,
        WhileStatement,
    },
    bytecode::{
        Opcode,
        compile_error::CompileError,
        disasm,
        ir::{AnchorId, InstructionSet, Param, SetKind},
        local_table::LocalTable,
    },
};

/// Targets for `next` and `break` in the innermost `while`.
#[derive(Debug, Clone, Copy)]
struct LoopAnchors {
    next: AnchorId,
    exit: AnchorId,
}

/// Compile-time state of the method, class or program body being generated.
#[derive(Debug, Default)]
struct Scope {
    table: LocalTable,
    loop_anchors: Option<LoopAnchors>,
}

/// Lowers a parsed program into instruction sets.
///
/// Every def, class, module and block body gets its own set, pushed when the
/// body is finished, so nested bodies come before the set that contains
/// them and `ProgramStart` is always last.
pub struct Generator {
    /// Keep the program's final value on the stack and skip its `leave`.
    pub repl: bool,

    /// Finished sets, in completion order.
    instruction_sets: Vec<InstructionSet>,

    /// Number for the next `Block:<n>` set.
    block_counter: usize,

    scope: Scope,
}

impl Generator {
    pub fn new() -> Self {
        Self {
            repl: false,
            instruction_sets: Vec::new(),
            block_counter: 0,
            scope: Scope::default(),
        }
    }

    pub fn with_repl(repl: bool) -> Self {
        Self {
            repl,
            ..Self::new()
        }
    }

    /// Starts a fresh top-level scope. Without it, a generator reused across
    /// REPL inputs keeps the locals bound by earlier inputs.
    pub fn init_top_level_scope(&mut self, program: &Program) {
        debug!(
            "top-level scope for {} statements",
            program.statements.len()
        );
        self.scope = Scope::default();
    }

    /// Compiles `statements` as the program body and returns every set with
    /// its jumps resolved.
    pub fn generate(
        &mut self,
        statements: &[Statement],
    ) -> Result<Vec<InstructionSet>, CompileError> {
        self.instruction_sets.clear();
        self.compile_statements(statements)?;

        let mut sets = std::mem::take(&mut self.instruction_sets);
        for set in &mut sets {
            set.resolve_anchors()?;
        }
        Ok(sets)
    }

    /// `generate`, rendered as the textual listing.
    pub fn generate_bytecode(&mut self, statements: &[Statement]) -> Result<String, CompileError> {
        let sets = self.generate(statements)?;
        Ok(disasm::render(&sets))
    }

    // =========================================================================
    // Instruction sets and scopes
    // =========================================================================

    fn compile_statements(&mut self, statements: &[Statement]) -> Result<(), CompileError> {
        let mut set = InstructionSet::program();
        for statement in statements {
            self.compile_statement(&mut set, statement)?;
        }

        let line = statements.last().map_or(1, |s| s.line());
        self.end_instructions(&mut set, line);
        self.finish(set);
        Ok(())
    }

    fn end_instructions(&self, set: &mut InstructionSet, line: usize) {
        if self.repl && set.kind == SetKind::ProgramStart {
            return;
        }
        set.define(Opcode::Leave, line, vec![]);
    }

    fn finish(&mut self, set: InstructionSet) {
        debug!("generated {} ({} instructions)", set.label(), set.count());
        self.instruction_sets.push(set);
    }

    /// Runs `f` in an empty scope and puts the current one back afterwards.
    fn in_new_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        let outer = std::mem::take(&mut self.scope);
        let result = f(self);
        self.scope = outer;
        result
    }

    /// Statements of a body. A body whose value is used but that does not
    /// end in an expression (or a `return`) yields `nil`.
    fn compile_body(
        &mut self,
        set: &mut InstructionSet,
        body: &BlockStatement,
    ) -> Result<(), CompileError> {
        for statement in &body.statements {
            self.compile_statement(set, statement)?;
        }

        let returns = matches!(body.statements.last(), Some(Statement::Return(_)));
        if body.keep_last_value && !body.ends_with_value() && !returns {
            set.define(Opcode::PutNil, body.base.line(), vec![]);
        }
        Ok(())
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn compile_statement(
        &mut self,
        set: &mut InstructionSet,
        statement: &Statement,
    ) -> Result<(), CompileError> {
        match statement {
            Statement::Expression(s) => {
                self.compile_expression(set, &s.expression)?;
                if s.expression.is_statement() {
                    set.define(Opcode::Pop, s.expression.line(), vec![]);
                }
            }
            Statement::Return(s) => {
                self.compile_expression(set, &s.value)?;
                self.end_instructions(set, s.base.line());
            }
            Statement::Def(s) => self.compile_def_statement(set, s)?,
            Statement::Class(s) => self.compile_class_statement(set, s)?,
            Statement::Module(s) => self.compile_module_statement(set, s)?,
            Statement::While(s) => self.compile_while_statement(set, s)?,
            Statement::Next(base) => match self.scope.loop_anchors {
                Some(anchors) => {
                    set.define(Opcode::Jump, base.line(), vec![anchors.next.into()]);
                }
                // ends the current block call
                None => {
                    set.define(Opcode::Leave, base.line(), vec![]);
                }
            },
            Statement::Break(base) => {
                set.define(Opcode::Break, base.line(), vec![]);
                if let Some(anchors) = self.scope.loop_anchors {
                    set.define(Opcode::Jump, base.line(), vec![anchors.exit.into()]);
                }
            }
        }
        Ok(())
    }

    /// `jump cond; body; cond: <condition>; branchif body; exit:`
    fn compile_while_statement(
        &mut self,
        set: &mut InstructionSet,
        statement: &WhileStatement,
    ) -> Result<(), CompileError> {
        let line = statement.base.line();
        let condition = set.new_anchor();
        let exit = set.new_anchor();
        let body = set.new_anchor();

        set.define(Opcode::Jump, line, vec![condition.into()]);
        set.set_anchor_here(body);

        let outer = self.scope.loop_anchors.replace(LoopAnchors {
            next: condition,
            exit,
        });
        let result = self.compile_body(set, &statement.body);
        self.scope.loop_anchors = outer;
        result?;

        set.set_anchor_here(condition);
        self.compile_expression(set, &statement.condition)?;
        set.define(Opcode::BranchIf, line, vec![body.into()]);
        set.set_anchor_here(exit);
        Ok(())
    }

    fn compile_class_statement(
        &mut self,
        set: &mut InstructionSet,
        statement: &ClassStatement,
    ) -> Result<(), CompileError> {
        let line = statement.base.line();
        let name = Param::Name(format!("class:{}", statement.name));

        set.define(Opcode::PutSelf, line, vec![]);
        match &statement.super_class {
            Some(super_class) => {
                let super_name = statement.super_class_name.as_deref().ok_or_else(|| {
                    CompileError::Internal(format!(
                        "class {} has a super class without a name",
                        statement.name
                    ))
                })?;
                self.compile_expression(set, super_class)?;
                set.define(
                    Opcode::DefClass,
                    line,
                    vec![name, Param::Name(super_name.to_string())],
                );
            }
            None => {
                set.define(Opcode::DefClass, line, vec![name]);
            }
        }
        set.define(Opcode::Pop, line, vec![]);

        self.compile_class_body(&statement.name, &statement.body)
    }

    fn compile_module_statement(
        &mut self,
        set: &mut InstructionSet,
        statement: &ModuleStatement,
    ) -> Result<(), CompileError> {
        let line = statement.base.line();
        set.define(Opcode::PutSelf, line, vec![]);
        set.define(
            Opcode::DefClass,
            line,
            vec![Param::Name(format!("module:{}", statement.name))],
        );
        set.define(Opcode::Pop, line, vec![]);

        self.compile_class_body(&statement.name, &statement.body)
    }

    fn compile_class_body(&mut self, name: &str, body: &BlockStatement) -> Result<(), CompileError> {
        let mut class_set = InstructionSet::new(SetKind::DefClass, name);
        self.in_new_scope(|g| g.compile_body(&mut class_set, body))?;
        class_set.define(Opcode::Leave, body.base.line(), vec![]);
        self.finish(class_set);
        Ok(())
    }

    fn compile_def_statement(
        &mut self,
        set: &mut InstructionSet,
        statement: &DefStatement,
    ) -> Result<(), CompileError> {
        let line = statement.base.line();
        let name = Param::Str(statement.name.clone());
        let arity = Param::from(statement.parameters.len());

        match &statement.receiver {
            Some(receiver) => {
                self.compile_expression(set, receiver)?;
                set.define(Opcode::PutString, line, vec![name]);
                set.define(Opcode::DefSingletonMethod, line, vec![arity]);
            }
            None => {
                set.define(Opcode::PutSelf, line, vec![]);
                set.define(Opcode::PutString, line, vec![name]);
                set.define(Opcode::DefMethod, line, vec![arity]);
            }
        }

        let mut def_set = InstructionSet::new(SetKind::Def, statement.name.as_str());
        self.in_new_scope(|g| {
            for parameter in &statement.parameters {
                g.compile_parameter(&mut def_set, parameter)?;
            }
            g.compile_body(&mut def_set, &statement.body)
        })?;
        self.end_instructions(&mut def_set, line);
        self.finish(def_set);
        Ok(())
    }

    /// Binds a parameter's slot; parameters with defaults also compile the
    /// default and store it with the optioned marker.
    fn compile_parameter(
        &mut self,
        set: &mut InstructionSet,
        parameter: &Expression,
    ) -> Result<(), CompileError> {
        let (Some(kind), Some(name)) = (parameter.arg_kind(), parameter.parameter_name()) else {
            return Err(CompileError::Internal(format!(
                "invalid parameter {}",
                parameter
            )));
        };

        match (&parameter.kind, kind) {
            (ExpressionKind::Assign(assign), ArgKind::Optioned) => {
                self.compile_expression(set, &assign.value)?;
                self.set_local(set, name, 1, parameter.line());
            }
            (
                ExpressionKind::Pair {
                    value: Some(value), ..
                },
                ArgKind::OptionalKeyword,
            ) => {
                self.compile_expression(set, value)?;
                self.set_local(set, name, 1, parameter.line());
            }
            _ => {
                self.scope.table.set(name);
            }
        }

        set.arg_set.push(name, kind);
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn compile_expression(
        &mut self,
        set: &mut InstructionSet,
        expression: &Expression,
    ) -> Result<(), CompileError> {
        let line = expression.line();

        match &expression.kind {
            ExpressionKind::Integer(value) => {
                set.define(Opcode::PutObject, line, vec![Param::Int(*value)]);
            }
            ExpressionKind::Float(_) => {
                let literal = expression.base.token.literal.clone();
                set.define(Opcode::PutFloat, line, vec![Param::Name(literal)]);
            }
            ExpressionKind::String(value) => {
                set.define(Opcode::PutString, line, vec![Param::Str(value.clone())]);
            }
            ExpressionKind::Boolean(value) => {
                set.define(Opcode::PutObject, line, vec![Param::Bool(*value)]);
            }
            ExpressionKind::Nil => {
                set.define(Opcode::PutNil, line, vec![]);
            }

            ExpressionKind::Identifier(name) => self.compile_identifier(set, name, line),
            ExpressionKind::Constant { name, is_namespace } => {
                set.define(
                    Opcode::GetConstant,
                    line,
                    vec![Param::Name(name.clone()), Param::Bool(*is_namespace)],
                );
            }
            ExpressionKind::InstanceVariable(name) => {
                set.define(
                    Opcode::GetInstanceVariable,
                    line,
                    vec![Param::Name(name.clone())],
                );
            }
            ExpressionKind::SelfRef => {
                set.define(Opcode::PutSelf, line, vec![]);
            }
            ExpressionKind::GetBlock => {
                set.define(Opcode::GetBlock, line, vec![]);
            }

            ExpressionKind::Array(elements) => {
                for element in elements {
                    self.compile_expression(set, element)?;
                }
                set.define(Opcode::NewArray, line, vec![elements.len().into()]);
            }
            ExpressionKind::Hash(pairs) => {
                // HashMap order: the pairs may come out in any order.
                for (key, value) in pairs {
                    set.define(Opcode::PutString, value.line(), vec![Param::Str(key.clone())]);
                    self.compile_expression(set, value)?;
                }
                set.define(Opcode::NewHash, line, vec![(pairs.len() * 2).into()]);
            }
            ExpressionKind::Pair { key, .. } => {
                return Err(CompileError::pair_outside_arguments(key, line));
            }

            ExpressionKind::Prefix { operator, right } => match operator.as_str() {
                "!" => {
                    self.compile_expression(set, right)?;
                    set.define(Opcode::Send, line, vec![Param::Name("!".into()), 0usize.into()]);
                }
                "-" => {
                    set.define(Opcode::PutObject, line, vec![Param::Int(0)]);
                    self.compile_expression(set, right)?;
                    set.define(Opcode::Send, line, vec![Param::Name("-".into()), 1usize.into()]);
                }
                "*" => {
                    self.compile_expression(set, right)?;
                    set.define(Opcode::SplatArray, line, vec![]);
                }
                other => {
                    return Err(CompileError::Internal(format!(
                        "unknown prefix operator {}",
                        other
                    )));
                }
            },
            ExpressionKind::Infix {
                left,
                operator,
                right,
            } => {
                self.compile_expression(set, left)?;
                self.compile_expression(set, right)?;
                // `A::B` is just the two constant lookups
                if operator != "::" {
                    set.define(
                        Opcode::Send,
                        line,
                        vec![Param::Name(operator.clone()), 1usize.into()],
                    );
                }
            }
            ExpressionKind::Range { start, end } => {
                self.compile_expression(set, start)?;
                self.compile_expression(set, end)?;
                set.define(Opcode::NewRange, line, vec![0usize.into()]);
            }

            ExpressionKind::Assign(assign) => self.compile_assign_expression(set, assign, line)?,
            ExpressionKind::If(if_expression) => {
                self.compile_if_expression(set, if_expression, line)?
            }
            ExpressionKind::Call(call) => self.compile_call_expression(set, call, line)?,
            ExpressionKind::Yield(arguments) => {
                set.define(Opcode::PutSelf, line, vec![]);
                let count = self.compile_arguments(set, arguments)?;
                set.define(Opcode::InvokeBlock, line, vec![count.into()]);
            }
        }
        Ok(())
    }

    /// A known local is read directly; any other name is a call on `self`.
    fn compile_identifier(&mut self, set: &mut InstructionSet, name: &str, line: usize) {
        match self.scope.table.lookup(name) {
            Some((depth, index)) => {
                set.define(Opcode::GetLocal, line, vec![depth.into(), index.into()]);
            }
            None => {
                set.define(Opcode::PutSelf, line, vec![]);
                set.define(
                    Opcode::Send,
                    line,
                    vec![Param::Name(name.to_string()), 0usize.into()],
                );
            }
        }
    }

    fn compile_assign_expression(
        &mut self,
        set: &mut InstructionSet,
        assign: &AssignExpression,
        line: usize,
    ) -> Result<(), CompileError> {
        self.compile_expression(set, &assign.value)?;

        if let [variable] = assign.variables.as_slice() {
            return self.compile_store(set, variable, assign.optioned);
        }

        // Each store leaves its value; only the last one is kept.
        set.define(
            Opcode::ExpandArray,
            line,
            vec![assign.variables.len().into()],
        );
        for (i, variable) in assign.variables.iter().enumerate() {
            self.compile_store(set, variable, 0)?;
            if i + 1 < assign.variables.len() {
                set.define(Opcode::Pop, variable.line(), vec![]);
            }
        }
        Ok(())
    }

    fn compile_store(
        &mut self,
        set: &mut InstructionSet,
        variable: &Expression,
        optioned: u8,
    ) -> Result<(), CompileError> {
        let line = variable.line();
        match &variable.kind {
            ExpressionKind::Identifier(name) => self.set_local(set, name, optioned, line),
            ExpressionKind::InstanceVariable(name) => {
                set.define(
                    Opcode::SetInstanceVariable,
                    line,
                    vec![Param::Name(name.clone())],
                );
            }
            ExpressionKind::Constant { name, .. } => {
                set.define(Opcode::SetConstant, line, vec![Param::Name(name.clone())]);
            }
            _ => {
                return Err(CompileError::Internal(format!(
                    "cannot assign to {}",
                    variable
                )));
            }
        }
        Ok(())
    }

    /// `setlocal depth index`, plus the optioned marker for parameter
    /// defaults.
    fn set_local(&mut self, set: &mut InstructionSet, name: &str, optioned: u8, line: usize) {
        let (depth, index) = self.scope.table.set_local(name);
        let mut params = vec![depth.into(), index.into()];
        if optioned != 0 {
            params.push(Param::Int(i64::from(optioned)));
        }
        set.define(Opcode::SetLocal, line, params);
    }

    /// Each branch: `<cond>; branchunless next; <body>; jump end; next:`.
    /// Without `else` the fall-through value is `nil`.
    fn compile_if_expression(
        &mut self,
        set: &mut InstructionSet,
        if_expression: &IfExpression,
        line: usize,
    ) -> Result<(), CompileError> {
        let end = set.new_anchor();

        for conditional in &if_expression.conditionals {
            self.compile_expression(set, &conditional.condition)?;
            let next = set.new_anchor();
            set.define(
                Opcode::BranchUnless,
                conditional.base.line(),
                vec![next.into()],
            );

            self.compile_body(set, &conditional.consequence)?;
            set.define(Opcode::Jump, conditional.base.line(), vec![end.into()]);
            set.set_anchor_here(next);
        }

        match &if_expression.alternative {
            Some(alternative) => self.compile_body(set, alternative)?,
            None => {
                set.define(Opcode::PutNil, line, vec![]);
            }
        }
        set.set_anchor_here(end);
        Ok(())
    }

    fn compile_call_expression(
        &mut self,
        set: &mut InstructionSet,
        call: &CallExpression,
        line: usize,
    ) -> Result<(), CompileError> {
        self.compile_expression(set, &call.receiver)?;
        let count = self.compile_arguments(set, &call.arguments)?;
        let mut params = vec![Param::Name(call.method.clone()), count.into()];

        if let Some(block) = &call.block {
            let index = self.block_counter;
            self.block_counter += 1;
            self.compile_block(index, block, &call.block_arguments, line)?;
            params.push(Param::Name(format!("block:{}", index)));
        }

        set.define(Opcode::Send, line, params);
        Ok(())
    }

    /// Pushes the arguments and returns how many the callee receives.
    /// Keyword pairs are gathered into one trailing hash argument.
    fn compile_arguments(
        &mut self,
        set: &mut InstructionSet,
        arguments: &[Expression],
    ) -> Result<usize, CompileError> {
        let mut count = 0;
        let mut keywords = Vec::new();

        for argument in arguments {
            match &argument.kind {
                ExpressionKind::Pair { key, value } => keywords.push((argument, key, value)),
                _ => {
                    self.compile_expression(set, argument)?;
                    count += 1;
                }
            }
        }

        let Some((first, _, _)) = keywords.first() else {
            return Ok(count);
        };
        let line = first.line();

        for (argument, key, value) in &keywords {
            let Some(value) = value else {
                return Err(CompileError::pair_outside_arguments(key, argument.line()));
            };
            set.define(Opcode::PutString, argument.line(), vec![Param::Str(key.to_string())]);
            self.compile_expression(set, value)?;
        }
        set.define(Opcode::NewHash, line, vec![(keywords.len() * 2).into()]);
        Ok(count + 1)
    }

    /// A block body gets its own set and a local table nested in the
    /// caller's, so outer locals are reachable at depth + 1.
    fn compile_block(
        &mut self,
        index: usize,
        block: &BlockStatement,
        parameters: &[String],
        line: usize,
    ) -> Result<(), CompileError> {
        let outer = std::mem::take(&mut self.scope.table);
        let mut table = LocalTable::nested(outer);
        for parameter in parameters {
            table.set(parameter);
        }
        self.scope.table = table;
        let loop_anchors = self.scope.loop_anchors.take();

        let mut block_set = InstructionSet::new(SetKind::Block, index.to_string());
        let result = self.compile_body(&mut block_set, block);

        self.scope.loop_anchors = loop_anchors;
        let table = std::mem::take(&mut self.scope.table);
        trace!(
            "block {} closed with {} locals at depth {}",
            index,
            table.count(),
            table.depth()
        );
        self.scope.table = table.into_upper().unwrap_or_default();
        result?;

        self.end_instructions(&mut block_set, line);
        self.finish(block_set);
        Ok(())
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}
