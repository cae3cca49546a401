//! arbor-json benchmarking suite
//!
//! Shared document fixtures for the criterion benches.

pub use arbor_json::{Parser, ValuePool};

pub const SMALL_JSON: &str = r#"{"id": "I1", "name": "Ada Lovelace", "living": false}"#;

pub const MEDIUM_JSON: &str = r#"{
  "individual": {
    "id": "I1",
    "name": {"given": "Ada", "surname": "Lovelace"},
    "birth": {"date": "1815-12-10", "place": "London"},
    "death": {"date": "1852-11-27", "place": "Marylebone"},
    "notes": "Mathematician écrivain, \"first programmer\"",
    "families": ["F1", "F2"],
    "sources": [
      {"id": "S1", "page": 12, "quality": 3},
      {"id": "S2", "page": 40.5, "quality": 2}
    ]
  }
}"#;

/// A family tree with `count` individuals
pub fn generate_tree(count: usize) -> String {
    let individuals: Vec<String> = (0..count)
        .map(|i| {
            format!(
                r#"{{
            "id": "I{i}",
            "name": {{"given": "Person {i}", "surname": "Family {}"}},
            "birth": {{"year": {}, "place": "Town {}"}},
            "living": {},
            "parents": ["I{}", "I{}"],
            "weight": {:.2}
        }}"#,
                i % 50,
                1700 + i % 300,
                i % 17,
                i % 3 == 0,
                i / 2,
                i / 2 + 1,
                i as f64 * 0.75
            )
        })
        .collect();
    format!(
        r#"{{"individuals": [{}], "count": {count}, "meta": {{"version": "1.0"}}}}"#,
        individuals.join(",")
    )
}

/// Nested arrays `depth` levels deep
pub fn generate_nested(depth: usize) -> String {
    format!("{}1{}", "[".repeat(depth), "]".repeat(depth))
}
