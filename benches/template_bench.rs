//! Quick benchmark for template interpolation and CSV import

use skillflow::ast::Payload;
use skillflow::binding::interpolate;
use skillflow::csv::parse_csv;
use std::time::Instant;

fn main() {
    // Scope with a few globals and step outputs
    let scope: Payload = [
        ("jobTitle", "Product Manager"),
        ("companyName", "Amazon"),
        ("interviewNotes", "Roadmap questions, metrics deep dive"),
        ("research", "Company research results here"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    // Templates of varying complexity
    let templates = vec![
        "Simple text with no templates",
        "Role: {{jobTitle}}",
        "{{jobTitle}} at {{companyName}}",
        "Notes: {{interviewNotes}} / missing: {{nothing}}",
        "{{research}} {{jobTitle}} {{companyName}} {{interviewNotes}} mixed content",
    ];

    println!("Template Interpolation Performance Test");
    println!("=======================================\n");

    // Warm up the regex
    for template in &templates {
        let _ = interpolate(template, &scope);
    }

    for template in &templates {
        let iterations = 100_000;
        let start = Instant::now();

        for _ in 0..iterations {
            let _ = interpolate(template, &scope);
        }

        let elapsed = start.elapsed();
        let per_op = elapsed / iterations;

        println!("Template: {:60}", format!("\"{}\"", template));
        println!("  Time for {} iterations: {:?}", iterations, elapsed);
        println!("  Per operation: {:?}\n", per_op);
    }

    println!("CSV Import Performance");
    println!("======================\n");

    let mut csv = String::from("Title,Company,Notes\n");
    for i in 0..10_000 {
        csv.push_str(&format!("Engineer {},\"Acme, Inc.\",\"said \"\"hi\"\"\"\n", i));
    }

    let start = Instant::now();
    let table = parse_csv(&csv);
    let elapsed = start.elapsed();

    println!("  Rows parsed: {}", table.rows.len());
    println!("  Time: {:?}", elapsed);
}
