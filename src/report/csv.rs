//! CSV report, one row per file

use crate::analyzer::FileReport;
use std::io::{self, Write};

const HEADER: &str = "path,name,verdict,ai_score,confidence,measured,faults,top_signals,error";

/// Signals listed in the `top_signals` column.
const TOP_SIGNALS: usize = 3;

pub fn write<W: Write>(writer: &mut W, reports: &[FileReport]) -> io::Result<()> {
    writeln!(writer, "{}", HEADER)?;

    for r in reports {
        let row = match &r.result {
            Some(result) => {
                let top: Vec<&str> = result
                    .top_ai_signals(TOP_SIGNALS)
                    .iter()
                    .map(|s| s.id.as_str())
                    .collect();
                format!(
                    "{},{},{},{:.1},{:.1},{},{},{},",
                    escape(&r.file_path),
                    escape(&r.file_name),
                    result.verdict,
                    result.ai_score,
                    result.confidence,
                    result.metadata.measured_signals,
                    result.faults.len(),
                    escape(&top.join(";")),
                )
            }
            None => format!(
                "{},{},ERROR,,,,,,{}",
                escape(&r.file_path),
                escape(&r.file_name),
                escape(r.error.as_deref().unwrap_or("unknown error")),
            ),
        };
        writeln!(writer, "{}", row)?;
    }

    Ok(())
}

/// Quote a field if it contains a delimiter, quote or newline.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Verdict;
    use crate::report::fixtures::report;

    fn render(reports: &[FileReport]) -> Vec<String> {
        let mut out = Vec::new();
        write(&mut out, reports).unwrap();
        String::from_utf8(out).unwrap().lines().map(String::from).collect()
    }

    #[test]
    fn test_header_and_rows() {
        let lines = render(&[report(Some(Verdict::Ai), "gen.png"), report(None, "bad.png")]);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "/photos/gen.png,gen.png,AI,71.0,42.5,3,0,noise_level;glcm_energy,");
        assert_eq!(lines[2], "/photos/bad.png,bad.png,ERROR,,,,,,decode error: unsupported");
    }

    #[test]
    fn test_column_count_is_stable() {
        let columns = HEADER.split(',').count();
        for line in render(&[report(Some(Verdict::Real), "a.jpg"), report(None, "b.jpg")]) {
            assert_eq!(line.split(',').count(), columns, "{}", line);
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain.jpg"), "plain.jpg");
        assert_eq!(escape("a,b.jpg"), "\"a,b.jpg\"");
        assert_eq!(escape("say \"hi\".png"), "\"say \"\"hi\"\".png\"");
    }
}
