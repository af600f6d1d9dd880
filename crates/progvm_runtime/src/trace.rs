//! Disassembly, stack-trace lines, and the profile report.

use progvm_image::BytecodeImage;

/// Renders one statement as `index: MNEMONIC a b c`.
#[must_use]
pub fn disassemble(image: &BytecodeImage, index: usize) -> String {
    let Some(st) = image.statements.get(index) else {
        return format!("{index:4}: <no statement>");
    };
    let name = st
        .opcode()
        .map_or_else(|| format!("op {}", st.op), |op| op.mnemonic().to_string());
    format!("{index:4}: {name} {} {} {}", st.a, st.b, st.c)
}

/// Renders one stack-trace line: `name (file) @ +offset`.
///
/// The offset is relative to the function's entry statement, so it stays
/// meaningful across recompiles that shuffle the statement table.
#[must_use]
pub fn frame_line(image: &BytecodeImage, function: usize, statement: i32) -> String {
    let Some(f) = image.functions.get(function) else {
        return format!("<function {function}>");
    };
    let name = named(image.string_or_empty(f.name));
    let file = image.string_or_empty(f.file);
    if f.is_builtin() {
        return format!("{name} (builtin)");
    }
    let offset = statement - f.first_statement;
    format!("{name} ({file}) @ +{offset}")
}

/// Per-function statement counts, busiest first.
///
/// The null function and functions that never ran are omitted.
#[must_use]
pub fn profile_report(image: &BytecodeImage, counters: &[u32]) -> Vec<String> {
    let mut rows: Vec<(u32, &str)> = counters
        .iter()
        .enumerate()
        .skip(1)
        .filter(|&(_, &count)| count > 0)
        .map(|(index, &count)| {
            let name = image
                .functions
                .get(index)
                .map_or("", |f| image.string_or_empty(f.name));
            (count, named(name))
        })
        .collect();
    rows.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(b.1)));
    rows.iter()
        .map(|(count, name)| format!("{count:9} {name}"))
        .collect()
}

fn named(name: &str) -> &str {
    if name.is_empty() { "<anonymous>" } else { name }
}
