use std::collections::BTreeMap;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use colmatch_learn::{
    AdaptiveWeights, CalibrationStats, FeedbackStats, PatternRule, TokenMapping, TrainingRecord,
};
use colmatch_model::{Correction, FeedbackEntry, MatchType, SimilarityResult};

pub fn print_matches(results: &[SimilarityResult], explain: bool) {
    if results.is_empty() {
        println!("No column pairs scored above the cut-off.");
        return;
    }
    let mut table = Table::new();
    let mut header = vec![
        header_cell("Left"),
        header_cell("Right"),
        header_cell("Confidence"),
        header_cell("Type"),
        header_cell("Name"),
        header_cell("Data"),
        header_cell("Pattern"),
        header_cell("Rationale"),
    ];
    if explain {
        header.push(header_cell("Adjustments"));
    }
    table.set_header(header);
    apply_table_style(&mut table);
    for index in 2..=6 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for result in results {
        let mut row = vec![
            Cell::new(&result.left_column),
            Cell::new(&result.right_column),
            confidence_cell(result.confidence),
            match_type_cell(result.match_type),
            score_cell(result.name_similarity),
            score_cell(result.data_similarity),
            match result.pattern_match.as_deref() {
                Some(pattern) => Cell::new(pattern),
                None => dim_cell("-"),
            },
            Cell::new(&result.rationale),
        ];
        if explain {
            let adjustments = result.explain_adjustments();
            row.push(if adjustments.is_empty() {
                dim_cell("-")
            } else {
                Cell::new(adjustments)
            });
        }
        table.add_row(row);
    }
    println!("{table}");
}

pub fn print_feedback_stats(
    stats: &FeedbackStats,
    recent: &[FeedbackEntry],
    corrections: &BTreeMap<String, Correction>,
) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Metric"), header_cell("Value")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![Cell::new("Total feedback"), Cell::new(stats.total_feedback)]);
    table.add_row(vec![
        Cell::new("Correct"),
        count_cell(stats.correct_matches, Color::Green),
    ]);
    table.add_row(vec![
        Cell::new("Incorrect"),
        count_cell(stats.incorrect_matches, Color::Red),
    ]);
    table.add_row(vec![
        Cell::new("Accuracy"),
        Cell::new(format!("{:.1}%", stats.accuracy)),
    ]);
    table.add_row(vec![
        Cell::new("Corrections"),
        Cell::new(stats.total_corrections),
    ]);
    println!("{table}");

    if !recent.is_empty() {
        let mut table = Table::new();
        table.set_header(vec![
            header_cell("When"),
            header_cell("Left"),
            header_cell("Right"),
            header_cell("Verdict"),
            header_cell("Correct match"),
            header_cell("Note"),
        ]);
        apply_table_style(&mut table);
        align_column(&mut table, 3, CellAlignment::Center);
        for entry in recent {
            table.add_row(vec![
                dim_cell(entry.timestamp.format("%Y-%m-%d %H:%M:%S")),
                Cell::new(&entry.left_column),
                Cell::new(&entry.right_column),
                verdict_cell(entry.is_correct),
                optional_cell(entry.correct_match.as_deref()),
                optional_cell(entry.user_note.as_deref()),
            ]);
        }
        println!("{table}");
    }

    if !corrections.is_empty() {
        let mut table = Table::new();
        table.set_header(vec![
            header_cell("Rejected pair"),
            header_cell("Correct"),
            header_cell("Count"),
        ]);
        apply_table_style(&mut table);
        align_column(&mut table, 2, CellAlignment::Right);
        for (key, correction) in corrections {
            table.add_row(vec![
                Cell::new(key.replace('|', " <-> ")),
                Cell::new(&correction.correct),
                Cell::new(correction.count),
            ]);
        }
        println!("{table}");
    }
}

pub fn print_weights(weights: &AdaptiveWeights, learning_rate: f64, history: &[TrainingRecord]) {
    println!("Learning rate: {learning_rate}");
    let mut table = Table::new();
    table.set_header(vec![header_cell("Signal"), header_cell("Weight")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for (signal, weight) in [
        ("name", weights.name),
        ("data", weights.data),
        ("pattern", weights.pattern),
        ("llm", weights.llm),
    ] {
        table.add_row(vec![Cell::new(signal), Cell::new(format!("{weight:.4}"))]);
    }
    println!("{table}");

    if history.is_empty() {
        println!("No training steps recorded yet.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("When"),
        header_cell("Batch"),
        header_cell("Loss"),
        header_cell("Name"),
        header_cell("Data"),
        header_cell("Pattern"),
        header_cell("LLM"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=6 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for record in history {
        table.add_row(vec![
            dim_cell(record.timestamp.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(record.batch_size),
            Cell::new(format!("{:.4}", record.loss)),
            Cell::new(format!("{:.4}", record.weights.name)),
            Cell::new(format!("{:.4}", record.weights.data)),
            Cell::new(format!("{:.4}", record.weights.pattern)),
            Cell::new(format!("{:.4}", record.weights.llm)),
        ]);
    }
    println!("{table}");
}

pub fn print_patterns(rules: &[PatternRule], mappings: &[TokenMapping]) {
    if rules.is_empty() && mappings.is_empty() {
        println!("No patterns learned yet.");
        return;
    }
    if !rules.is_empty() {
        let mut table = Table::new();
        table.set_header(vec![
            header_cell("Left pattern"),
            header_cell("Right pattern"),
            header_cell("Confidence"),
            header_cell("Success"),
            header_cell("Fail"),
        ]);
        apply_table_style(&mut table);
        for index in 2..=4 {
            align_column(&mut table, index, CellAlignment::Right);
        }
        for rule in rules {
            table.add_row(vec![
                Cell::new(&rule.pattern1),
                Cell::new(&rule.pattern2),
                score_cell(rule.confidence),
                count_cell(rule.success_count as usize, Color::Green),
                count_cell(rule.fail_count as usize, Color::Red),
            ]);
        }
        println!("{table}");
    }
    if !mappings.is_empty() {
        let mut table = Table::new();
        table.set_header(vec![
            header_cell("Left token"),
            header_cell("Right token"),
            header_cell("Score"),
            header_cell("Seen"),
        ]);
        apply_table_style(&mut table);
        align_column(&mut table, 2, CellAlignment::Right);
        align_column(&mut table, 3, CellAlignment::Right);
        for mapping in mappings {
            table.add_row(vec![
                Cell::new(&mapping.token1),
                Cell::new(&mapping.token2),
                score_cell(mapping.score),
                Cell::new(mapping.occurrences),
            ]);
        }
        println!("{table}");
    }
}

pub fn print_calibration(stats: &CalibrationStats) {
    println!(
        "Samples: {}  Correct: {}  Accuracy: {:.1}%",
        stats.total_samples, stats.total_correct, stats.overall_accuracy
    );
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Range"),
        header_cell("Samples"),
        header_cell("Correct"),
        header_cell("Expected"),
        header_cell("Actual"),
        header_cell("Factor"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=5 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for bucket in &stats.buckets {
        let range = format!("{:.0}-{:.0}", bucket.range_min, bucket.range_max);
        if bucket.total_count == 0 {
            table.add_row(vec![
                dim_cell(range),
                dim_cell(0),
                dim_cell(0),
                dim_cell(format!("{:.2}", bucket.expected_accuracy())),
                dim_cell(format!("{:.2}", bucket.actual_accuracy)),
                dim_cell(format!("{:.3}", bucket.calibration_factor)),
            ]);
            continue;
        }
        table.add_row(vec![
            Cell::new(range),
            Cell::new(bucket.total_count),
            Cell::new(bucket.correct_count),
            Cell::new(format!("{:.2}", bucket.expected_accuracy())),
            Cell::new(format!("{:.2}", bucket.actual_accuracy)),
            factor_cell(bucket.calibration_factor),
        ]);
    }
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn optional_cell(value: Option<&str>) -> Cell {
    match value {
        Some(value) => Cell::new(value),
        None => dim_cell("-"),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(0)
    }
}

fn score_cell(score: f64) -> Cell {
    Cell::new(format!("{score:.2}"))
}

fn confidence_cell(confidence: f64) -> Cell {
    let color = if confidence >= 80.0 {
        Color::Green
    } else if confidence >= 50.0 {
        Color::Yellow
    } else {
        Color::Red
    };
    Cell::new(format!("{confidence:.1}"))
        .fg(color)
        .add_attribute(Attribute::Bold)
}

fn match_type_cell(match_type: MatchType) -> Cell {
    match match_type {
        MatchType::Weak => dim_cell(match_type.as_str()),
        _ => Cell::new(match_type.as_str()),
    }
}

fn verdict_cell(is_correct: bool) -> Cell {
    if is_correct {
        Cell::new("✓").fg(Color::Green)
    } else {
        Cell::new("✗").fg(Color::Red)
    }
}

fn factor_cell(factor: f64) -> Cell {
    let cell = Cell::new(format!("{factor:.3}"));
    if (factor - 1.0).abs() < 0.05 {
        cell
    } else {
        cell.fg(Color::Yellow)
    }
}
