//! Evaluation reports: per-field CSV and a plain-text summary.

use std::io::Write;

use serde::Serialize;

use crate::evaluate::Evaluation;

const RULE_WIDTH: usize = 80;
const RANKED_SHOWN: usize = 10;

#[derive(Serialize)]
struct CsvRow<'a> {
    field_name: &'a str,
    accuracy: String,
    correct_docs: usize,
    total_docs: usize,
    mean_score: String,
    json_ref: &'a str,
    matcher: &'a str,
}

/// One row per field, in field-name order. The header is written even when
/// there are no fields.
pub fn write_csv<W: Write>(eval: &Evaluation, out: W) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);

    writer.write_record([
        "field_name",
        "accuracy",
        "correct_docs",
        "total_docs",
        "mean_score",
        "json_ref",
        "matcher",
    ])?;
    for stats in eval.fields.values() {
        writer.serialize(CsvRow {
            field_name: &stats.field_name,
            accuracy: format!("{:.4}", stats.accuracy()),
            correct_docs: stats.correct,
            total_docs: stats.total,
            mean_score: format!("{:.4}", stats.mean_score()),
            json_ref: &stats.json_ref,
            matcher: &stats.matcher,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Human-readable summary. `generated` is printed verbatim as the
/// timestamp line.
pub fn summary_text(eval: &Evaluation, generated: &str) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut lines = vec![
        heavy.clone(),
        "FIELD EXTRACTION EVALUATION SUMMARY".to_string(),
        heavy.clone(),
        format!("Generated: {generated}"),
        String::new(),
        "OVERALL STATISTICS".to_string(),
        light.clone(),
    ];

    let accuracy = eval.overall_accuracy();
    let stats = eval.score_stats();
    for (label, value) in [
        ("Documents processed:", eval.processed.to_string()),
        ("Documents skipped:", eval.skipped.to_string()),
        ("Fields evaluated:", eval.fields.len().to_string()),
        ("Field evaluations:", eval.total_evaluations().to_string()),
        ("Correct:", eval.total_correct().to_string()),
        (
            "Overall accuracy:",
            format!("{accuracy:.4} ({:.2}%)", accuracy * 100.0),
        ),
        (
            "Score mean / median:",
            format!("{:.4} / {:.4}", stats.mean, stats.median),
        ),
        (
            "Perfect/good/moderate/poor:",
            format!(
                "{}/{}/{}/{}",
                stats.distribution.perfect,
                stats.distribution.good,
                stats.distribution.moderate,
                stats.distribution.poor
            ),
        ),
    ] {
        lines.push(format!("{label:<28}{value}"));
    }
    lines.push(String::new());

    let ranked = eval.ranked_fields();
    let bottom_start = ranked.len().saturating_sub(RANKED_SHOWN);
    for (title, slice) in [
        ("TOP 10 BEST PERFORMING FIELDS", &ranked[..ranked.len().min(RANKED_SHOWN)]),
        ("BOTTOM 10 WORST PERFORMING FIELDS", &ranked[bottom_start..]),
    ] {
        lines.push(title.to_string());
        lines.push(light.clone());
        lines.push(format!("{:<40} {:>10} {:>15}", "Field", "Accuracy", "Correct/Total"));
        lines.push(light.clone());
        for f in slice {
            lines.push(format!(
                "{:<40} {:>10.4} {:>15}",
                f.field_name,
                f.accuracy(),
                format!("{}/{}", f.correct, f.total)
            ));
        }
        lines.push(String::new());
    }

    if !eval.skipped_documents.is_empty() {
        lines.push("SKIPPED DOCUMENTS (no prediction)".to_string());
        lines.push(light);
        lines.extend(eval.skipped_documents.iter().cloned());
        lines.push(String::new());
    }

    lines.push(heavy);
    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::FieldStats;
    use std::collections::BTreeMap;

    fn stats(name: &str, scores: &[f64]) -> FieldStats {
        FieldStats {
            field_name: name.into(),
            json_ref: format!("STATIC::General::{name}"),
            matcher: "string".into(),
            total: scores.len(),
            correct: scores.iter().filter(|s| **s >= 0.95).count(),
            scores: scores.to_vec(),
        }
    }

    fn evaluation() -> Evaluation {
        let fields: BTreeMap<String, FieldStats> = [
            ("tenant", stats("tenant", &[1.0, 1.0])),
            ("rent", stats("rent", &[1.0, 0.0])),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Evaluation {
            processed: 2,
            skipped: 1,
            skipped_documents: vec!["lease-3".into()],
            fields,
            documents: BTreeMap::new(),
        }
    }

    #[test]
    fn csv_rows_in_name_order() {
        let mut buf = Vec::new();
        write_csv(&evaluation(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "field_name,accuracy,correct_docs,total_docs,mean_score,json_ref,matcher\n\
             rent,0.5000,1,2,0.5000,STATIC::General::rent,string\n\
             tenant,1.0000,2,2,1.0000,STATIC::General::tenant,string\n"
        );
    }

    #[test]
    fn csv_header_without_fields() {
        let eval = Evaluation {
            fields: BTreeMap::new(),
            ..evaluation()
        };
        let mut buf = Vec::new();
        write_csv(&eval, &mut buf).unwrap();
        assert_eq!(buf.iter().filter(|b| **b == b'\n').count(), 1);
    }

    #[test]
    fn summary_sections() {
        let text = summary_text(&evaluation(), "2026-01-01 00:00:00");
        assert!(text.contains("Generated: 2026-01-01 00:00:00"));
        assert!(text.contains("Overall accuracy:           0.7500 (75.00%)"));
        assert!(text.contains("Documents skipped:          1"));
        assert!(text.contains("SKIPPED DOCUMENTS (no prediction)\n"));

        let top = text.find("TOP 10").unwrap();
        let bottom = text.find("BOTTOM 10").unwrap();
        let tenant = text[top..bottom].find("tenant").unwrap();
        let rent = text[top..bottom].find("rent ").unwrap();
        assert!(tenant < rent, "best field first");
    }
}
