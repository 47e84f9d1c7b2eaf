use std::fmt::Write;

use crate::bytecode::ir::InstructionSet;

/// Textual listing of compiled sets: each set's label followed by its
/// numbered instructions. Blank lines are dropped.
pub fn render(sets: &[InstructionSet]) -> String {
    let mut out = String::new();
    for set in sets {
        // Display on a set never fails
        let _ = write!(out, "{}", set);
    }

    out.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Annotated listing for debugging: a header per set, jump targets marked
/// with `►`, and the source line of every instruction.
pub fn dump(sets: &[InstructionSet]) -> String {
    let mut out = String::new();
    for set in sets {
        dump_set(&mut out, set);
    }
    out
}

fn dump_set(out: &mut String, set: &InstructionSet) {
    let targets = collect_jump_targets(set);

    let _ = writeln!(out, "════════════════════════════════════════");
    let _ = writeln!(out, " {}", set.label());
    let _ = writeln!(out, " {} instructions", set.count());
    if !set.arg_set.is_empty() {
        let params: Vec<String> = set
            .arg_set
            .names()
            .iter()
            .zip(set.arg_set.types())
            .map(|(name, kind)| format!("{} ({})", name, kind.describe()))
            .collect();
        let _ = writeln!(out, " params: {}", params.join(", "));
    }
    let _ = writeln!(out, "════════════════════════════════════════");

    for instruction in &set.instructions {
        let marker = if targets.contains(&instruction.line) {
            "►"
        } else {
            " "
        };
        let text = instruction.to_string();
        // drop the leading line number, it is printed in the gutter
        let body = text
            .split_once(' ')
            .map_or(text.as_str(), |(_, rest)| rest);
        let _ = writeln!(
            out,
            "{:04} {} {:<32} ; line {}",
            instruction.line, marker, body, instruction.source_line
        );
    }
    out.push('\n');
}

fn collect_jump_targets(set: &InstructionSet) -> Vec<usize> {
    let mut targets = Vec::new();

    for instruction in &set.instructions {
        if !instruction.opcode.is_jump() {
            continue;
        }
        if let Some(target) = instruction.anchor {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
    }

    targets
}
