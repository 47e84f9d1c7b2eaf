use anyhow::Result;
use garnet::bytecode::{self, Opcode, SetKind};
use garnet::{CompileError, ParserErrorKind, ParserMode, compile_to_bytecode, compile_to_instructions};

fn test_listing(source: &str) -> Result<Vec<String>> {
    let listing = compile_to_bytecode(source, ParserMode::Test)?;
    Ok(listing.lines().map(str::to_string).collect())
}

#[test]
fn arithmetic_groups_by_precedence() -> Result<()> {
    let listing = compile_to_bytecode("(1 * 10 + 100) / 2", ParserMode::Test)?;
    assert_eq!(
        listing,
        "<ProgramStart>\n\
         0 putobject 1\n\
         1 putobject 10\n\
         2 send * 1\n\
         3 putobject 100\n\
         4 send + 1\n\
         5 putobject 2\n\
         6 send / 1\n\
         7 leave"
    );
    Ok(())
}

#[test]
fn if_without_else_branches_past_consequence() -> Result<()> {
    let lines = test_listing("a = 10; b = 5; if a > b; c = 10 end; c + 1")?;

    let branches: Vec<&String> = lines.iter().filter(|l| l.contains("branchunless")).collect();
    assert_eq!(branches.len(), 1);

    assert_eq!(branches[0], "9 branchunless 13");

    // lines[0] is the label, so instruction N sits at lines[N + 1]
    assert_eq!(lines[12], "11 setlocal 0 2");
    assert_eq!(lines[13], "12 jump 14");
    assert_eq!(lines[14], "13 putnil");
    Ok(())
}

#[test]
fn class_hierarchy_sets_in_completion_order() -> Result<()> {
    let source = "class Bar\n  def bar; 10; end\nend\nclass Foo < Bar; end\nFoo.new.bar";
    let sets = compile_to_instructions(source, ParserMode::Test)?;

    let labels: Vec<String> = sets.iter().map(|s| s.label()).collect();
    assert_eq!(
        labels,
        ["<Def:bar>", "<DefClass:Bar>", "<DefClass:Foo>", "<ProgramStart>"]
    );

    let program = compile_to_bytecode(source, ParserMode::Test)?;
    let def_class = program.find("def_class class:Foo Bar").expect("subclass defined");
    let get_foo = program.find("getconstant Foo false").expect("Foo loaded");
    let new = program.find("send new 0").expect("Foo.new");
    let bar = program.find("send bar 0").expect(".bar");
    assert!(def_class < get_foo && get_foo < new && new < bar);
    Ok(())
}

#[test]
fn while_loop_jumps_to_condition_first() -> Result<()> {
    let lines = test_listing("i = 10; while i > 0 do; i = i - 1; end; i")?;
    assert_eq!(
        lines[4..],
        [
            "3 jump 9",
            "4 getlocal 0 0",
            "5 putobject 1",
            "6 send - 1",
            "7 setlocal 0 0",
            "8 pop",
            "9 getlocal 0 0",
            "10 putobject 0",
            "11 send > 1",
            "12 branchif 4",
            "13 getlocal 0 0",
            "14 leave",
        ]
    );
    Ok(())
}

#[test]
fn default_parameter_is_optioned_setlocal() -> Result<()> {
    let sets = compile_to_instructions("def foo(x, y = 10); x + y; end\nfoo(100)", ParserMode::Test)?;
    let def = &sets[0];
    assert_eq!(def.kind, SetKind::Def);
    assert_eq!(def.instructions[0].to_string(), "0 putobject 10");
    assert_eq!(def.instructions[1].to_string(), "1 setlocal 0 1 1");
    Ok(())
}

#[test]
fn hash_literal_in_either_order() -> Result<()> {
    let lines = test_listing("{ foo: 1, bar: 5 }")?;
    let pairs = [
        ["1 putstring \"foo\"", "2 putobject 1", "3 putstring \"bar\"", "4 putobject 5"],
        ["1 putstring \"bar\"", "2 putobject 5", "3 putstring \"foo\"", "4 putobject 1"],
    ];
    let body: Vec<&str> = lines[1..5].iter().map(String::as_str).collect();
    assert!(pairs.iter().any(|p| body == p), "{:?}", lines);
    assert_eq!(lines[5], "4 newhash 4");
    Ok(())
}

#[test]
fn repl_mode_keeps_the_last_value() -> Result<()> {
    let listing = compile_to_bytecode("x = 1\nx + 1", ParserMode::Repl)?;
    assert!(!listing.contains("pop"));
    assert!(!listing.contains("leave"));
    assert!(listing.ends_with("send + 1"));
    Ok(())
}

#[test]
fn every_jump_lands_inside_its_set() -> Result<()> {
    let source = "\
def count(n)
  i = 0
  while i < n do
    if i == 3
      break
    elsif i == 1
      i += 2
      next
    end
    i += 1
  end
  [1, 2].each do |x|
    next
  end
  i
end
count(5)";
    for set in compile_to_instructions(source, ParserMode::Normal)? {
        assert_eq!(set.instructions.last().map(|i| i.opcode), Some(Opcode::Leave));
        for instruction in set.instructions.iter().filter(|i| i.opcode.is_jump()) {
            let target = instruction.anchor.expect("resolved");
            assert!(target <= set.count(), "{}", instruction.inspect());
        }
    }
    Ok(())
}

#[test]
fn parse_errors_surface_unchanged() {
    let err = compile_to_bytecode("def foo\n  1", ParserMode::Normal).unwrap_err();
    let parse = err.parser_error().expect("parse error");
    assert_eq!(parse.kind, ParserErrorKind::EndOfFile);

    let err = compile_to_bytecode("end", ParserMode::Normal).unwrap_err();
    assert!(err.parser_error().is_some_and(|e| e.is_unexpected_end()));
}

#[test]
fn pair_inside_array_argument_is_rejected() {
    let err = compile_to_bytecode("foo([a: 1])", ParserMode::Normal).unwrap_err();
    assert!(matches!(err, CompileError::InvalidPosition { ref name, line: 1, .. } if name == "a"));
}

#[test]
fn encoded_sets_decode_to_the_same_listing() -> Result<()> {
    let source = "class A\n  def b(x = 1)\n    x.each do |y|\n      y\n    end\n  end\nend";
    let sets = compile_to_instructions(source, ParserMode::Normal)?;

    let bytes = bytecode::encode(&sets)?;
    let decoded = bytecode::decode(&bytes)?;
    assert_eq!(decoded, sets);
    assert_eq!(
        bytecode::disasm::render(&decoded),
        compile_to_bytecode(source, ParserMode::Normal)?
    );
    Ok(())
}

#[test]
fn float_literal_leaves_keywords_intact() -> Result<()> {
    let listing = compile_to_bytecode("x = 1.5\nif x > 1\n  2\nend", ParserMode::Test)?;
    assert!(listing.contains("putfloat 1.5"));
    assert!(listing.contains("branchunless"));

    let lines = test_listing("a = [1.5, nil]")?;
    assert_eq!(lines[1..4], ["0 putfloat 1.5", "1 putnil", "2 newarray 2"]);
    Ok(())
}
