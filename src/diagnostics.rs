use ariadne::{Label, Report, ReportKind, Source};
use pseudoc::{CompileError, SourceLocation};

/// Print a compile error using `ariadne`, pointing at the offending token.
pub fn report_compile_error(source: &str, filename: &str, err: &CompileError) {
    let start = char_offset(source, err.loc);
    let report = Report::build(ReportKind::Error, filename, start)
        .with_message(err.kind.to_string())
        .with_label(Label::new((filename, start..start + 1)).with_message(err.msg.clone()))
        .finish();
    let _ = report.eprint((filename, Source::from(source)));
}

// ariadne counts characters, not bytes.
fn char_offset(source: &str, loc: SourceLocation) -> usize {
    let before: usize = source
        .split('\n')
        .take(loc.line.saturating_sub(1))
        .map(|line| line.chars().count() + 1)
        .sum();
    (before + loc.column.saturating_sub(1)).min(source.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_count_previous_lines() {
        let src = "{\n  x = 1;\n}";
        assert_eq!(char_offset(src, SourceLocation::new(1, 1)), 0);
        assert_eq!(char_offset(src, SourceLocation::new(2, 3)), 4);
        assert_eq!(char_offset(src, SourceLocation::new(3, 1)), 11);
    }

    #[test]
    fn offsets_are_clamped_to_the_source() {
        assert_eq!(char_offset("{ }", SourceLocation::new(1, 9)), 3);
        assert_eq!(char_offset("", SourceLocation::new(1, 1)), 0);
    }
}
